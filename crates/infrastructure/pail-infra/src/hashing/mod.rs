use camino::Utf8Path;
use md5::Context;
use pail_core::Md5Digest;
use std::fs::File;
use std::io::{BufReader, Read};

/// Read size for streaming hashes. Files are never loaded whole.
const HASH_BUF_SIZE: usize = 128 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream a reader through MD5 and return the lowercase hex digest, the
/// same format the object store reports as an etag.
pub fn hash_reader<R: Read>(mut reader: R) -> Result<Md5Digest, HashError> {
    let mut hasher = Context::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn hash_file(fs_path: &Utf8Path) -> Result<Md5Digest, HashError> {
    let file = File::open(fs_path)?;
    hash_reader(BufReader::new(file))
}

pub fn hash_bytes(bytes: &[u8]) -> Md5Digest {
    let mut hasher = Context::new();
    hasher.consume(bytes);
    format!("{:x}", hasher.finalize())
}
