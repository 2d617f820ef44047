//! Account password hashing with Argon2id.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use postboard_core::ports::{AuthError, PasswordService};

/// Hashes signup passwords and checks login attempts.
///
/// Stored hashes are PHC strings, so the parameters used at signup travel
/// with each account and older hashes keep verifying after `params` change.
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// A wrong password is `Ok(false)`. So is a stored value that is not a
    /// PHC hash (accounts created without a password).
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let stored = match PasswordHash::new(hash) {
            Ok(stored) => stored,
            Err(e) => {
                if !hash.is_empty() {
                    tracing::warn!(error = %e, "Stored password hash is malformed");
                }
                return Ok(false);
            }
        };

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &stored)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimum-cost parameters keep the tests fast.
    fn service() -> Argon2PasswordService {
        Argon2PasswordService::with_params(Params::new(8, 1, 1, None).unwrap())
    }

    #[test]
    fn test_signup_password_verifies_at_login() {
        let passwords = service();

        let hash = passwords.hash("AiVFCdkMW3YvHYC").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(passwords.verify("AiVFCdkMW3YvHYC", &hash).unwrap());
        assert!(!passwords.verify("aivfcdkmw3yvhyc", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let passwords = service();
        assert_ne!(
            passwords.hash("AiVFCdkMW3YvHYC").unwrap(),
            passwords.hash("AiVFCdkMW3YvHYC").unwrap()
        );
    }

    #[test]
    fn test_hash_from_other_params_still_verifies() {
        let hash = service().hash("AiVFCdkMW3YvHYC").unwrap();
        assert!(Argon2PasswordService::new().verify("AiVFCdkMW3YvHYC", &hash).unwrap());
    }

    #[test]
    fn test_account_without_hash_never_verifies() {
        let passwords = service();
        assert!(!passwords.verify("anything", "").unwrap());
        assert!(!passwords.verify("anything", "not-a-phc-string").unwrap());
    }
}
