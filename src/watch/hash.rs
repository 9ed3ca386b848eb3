// src/watch/hash.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

/// Compute the blake3 hash of a single file, hex encoded.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_contents_hash_equal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "same")?;
        std::fs::write(&b, "same")?;
        assert_eq!(compute_file_hash(&a)?, compute_file_hash(&b)?);

        std::fs::write(&b, "different")?;
        assert_ne!(compute_file_hash(&a)?, compute_file_hash(&b)?);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(compute_file_hash(Path::new("/definitely/not/here.txt")).is_err());
    }
}
