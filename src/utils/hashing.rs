use bcrypt::{BcryptError, DEFAULT_COST, hash, verify};

/// Hash a secret (password or OTP) with bcrypt.
pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, BcryptError> {
    verify(password, hashed)
}
