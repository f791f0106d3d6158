//! Password digests for the Users table.
//!
//! The store only ever sees a salt and a lowercase hex SHA-256 digest of
//! `salt || password`; comparison happens on the digest.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Fresh random salt, 32 hex characters.
pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt).eq_ignore_ascii_case(expected_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        let digest = hash_password("secret", "");
        assert_eq!(digest, "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b");
    }

    #[test]
    fn salt_changes_the_digest() {
        let salt = generate_salt();
        assert_eq!(salt.len(), 32);
        assert_ne!(hash_password("secret", &salt), hash_password("secret", ""));
        assert!(verify_password("secret", &salt, &hash_password("secret", &salt)));
        assert!(!verify_password("Secret", &salt, &hash_password("secret", &salt)));
    }
}
