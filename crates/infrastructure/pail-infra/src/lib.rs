pub mod hashing;
pub mod net;

// Re-exports for convenience
pub use hashing::{hash_bytes, hash_file, hash_reader, HashError};
pub use net::default_http_client;
