/// Password hashing
///
/// Passwords are hashed with Argon2id (19 MiB, 2 passes, 1 lane) and stored
/// as PHC strings, so the parameters travel with each hash and can be raised
/// later without invalidating existing accounts.
///
/// ```
/// use twix_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("tw1x-rocks")?;
/// assert!(verify_password("tw1x-rocks", &hash)?);
/// assert!(!verify_password("tw1x-sucks", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Shortest password accepted on registration or change
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(19 * 1024, 2, 1, Some(32))
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Returns `Ok(false)` for a wrong password and `Err` only for a corrupt hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Minimum rule: eight characters with at least one letter and one digit
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }

    if !password.chars().any(char::is_alphabetic) {
        return Err("Password must contain at least one letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = hash_password("correct horse 1").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_same_password_gets_fresh_salt() {
        let a = hash_password("same-pass-1").unwrap();
        let b = hash_password("same-pass-1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-pass-1", &a).unwrap());
        assert!(verify_password("same-pass-1", &b).unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let hash = hash_password("right-pass-1").unwrap();
        assert!(!verify_password("wrong-pass-1", &hash).unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_strength_rules() {
        assert!(validate_password_strength("abcdefg1").is_ok());
        assert!(validate_password_strength("pässwörd9").is_ok());
        assert!(validate_password_strength("short1").is_err());
        assert!(validate_password_strength("12345678").is_err());
        assert!(validate_password_strength("lettersonly").is_err());
    }
}
