/// Password-gate credential hashing.
///
/// Gates store a SHA-256 hex digest of the secret, never the plaintext.
/// Verification compares digests in constant time so a mismatch reveals
/// nothing about how much of the digest agreed.
use sha2::{Digest, Sha256};

/// Hash a plaintext secret into the stored form: 64 lowercase hex chars.
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Compare a submitted secret against a stored hash.
///
/// The digest comparison runs over every byte regardless of where the
/// first difference occurs. A stored hash of the wrong length can never
/// match.
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let computed = hash_secret(secret);
    let stored = stored_hash.to_ascii_lowercase();
    if stored.len() != computed.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in computed.bytes().zip(stored.bytes()) {
        diff |= a ^ b;
    }
    diff == 0
}
