use std::{fs, io, path::Path};

use sha2::{digest::Output, Digest, Sha256};

/// Streams `path` through SHA-256 without reading it into memory.
pub(crate) fn sha256_file(path: &Path) -> io::Result<Output<Sha256>> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_digest_matches_in_memory_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");
        fs::write(&path, b"[]").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), Sha256::digest(b"[]"));
        assert_ne!(sha256_file(&path).unwrap(), Sha256::digest(b"[ ]"));
    }

    #[test]
    fn empty_file_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            format!("{:x}", sha256_file(&path).unwrap()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
