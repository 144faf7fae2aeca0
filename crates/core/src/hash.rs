//! SHA-256 content hashing for photo artifacts.
//!
//! The digest is computed over exactly the bytes the client sent, not the
//! re-fetched Shopify resource, so the hash submitted to the NFS backend
//! reflects what was uploaded even if the CDN transcodes the image later.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of the given bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_deterministic() {
        let photo = b"\xff\xd8\xff\xe0fake-jpeg-bytes";
        assert_eq!(sha256_hex(photo), sha256_hex(photo));
    }

    #[test]
    fn test_different_bytes_different_digest() {
        assert_ne!(sha256_hex(b"photo-1"), sha256_hex(b"photo-2"));
        // Single-bit difference
        assert_ne!(sha256_hex(&[0b0000_0000]), sha256_hex(&[0b0000_0001]));
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        let digest = sha256_hex(b"anything");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
