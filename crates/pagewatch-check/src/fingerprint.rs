use sha2::{Digest, Sha256};

/// SHA-256 of the exact extracted text, as 64 lowercase hex characters.
///
/// Whitespace-sensitive: any byte difference yields a different fingerprint.
#[must_use]
pub fn fingerprint(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
