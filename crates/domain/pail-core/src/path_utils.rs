pub struct PailPath;

impl PailPath {
    /// Standardize a relative path to the wire format used for snapshot
    /// keys, report output and store object keys: forward slashes, no
    /// leading `./`.
    pub fn normalize(path: &str) -> String {
        let p = path.replace('\\', "/");
        p.strip_prefix("./").unwrap_or(&p).to_string()
    }

    /// Canonical comparison key. Path comparison is case- and
    /// slash-style-insensitive; joining on this key is what stops
    /// `Docs/A.txt` vs `docs/a.txt` from ping-ponging between sides.
    pub fn canonicalize(path: &str) -> String {
        Self::normalize(path).to_lowercase()
    }

    /// Reject traversal or absolute paths coming from an untrusted
    /// listing before they are joined onto a local root.
    pub fn verify_safe(rel_path: &str) -> bool {
        let p = std::path::Path::new(rel_path);
        !p.is_absolute()
            && !p
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
    }
}
