use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// The password could not be hashed.
#[derive(Debug, thiserror::Error)]
#[error("error hashing password: {0}")]
pub struct HashError(argon2::password_hash::Error);

/// Hashes `password` with a fresh random salt and returns the PHC encoded
/// hash, safe to store as text.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(HashError)
}

/// Checks `password` against an encoded hash. A hash that cannot be decoded
/// never matches.
pub fn verify_password(password: &str, encoded_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(encoded_hash) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!("error decoding password hash: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
