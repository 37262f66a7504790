/// Password Hashing and Verification
///
/// bcrypt with a cost factor fixed at startup. The salt lives inside the
/// hash string, so nothing else needs to be stored.

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{AppError, AuthError, ValidationError};

/// bcrypt only reads the first 72 bytes of its input
const MAX_PASSWORD_LENGTH: usize = 72;

const DUMMY_PASSWORD: &str = "chirpy-dummy-password";

/// Hashes and verifies passwords
///
/// Clones share the dummy hash used for unknown identities, which is built
/// at this hasher's own cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: Arc<OnceLock<Option<String>>>,
    #[cfg(test)]
    verifications: Arc<AtomicUsize>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy_hash: Arc::new(OnceLock::new()),
            #[cfg(test)]
            verifications: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Build the dummy hash now instead of on the first unknown login
    pub fn warm_up(&self) {
        self.dummy_hash();
    }

    fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash
            .get_or_init(|| hash(DUMMY_PASSWORD, self.cost).ok())
            .as_deref()
    }

    fn bcrypt_verify(&self, password: &[u8], hashed_password: &str) -> Result<bool, BcryptError> {
        #[cfg(test)]
        self.verifications.fetch_add(1, Ordering::SeqCst);
        verify(password, hashed_password)
    }

    #[cfg(test)]
    pub(crate) fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    /// Hash a password
    ///
    /// # Errors
    /// - Validation error if the password is empty or longer than bcrypt can read
    /// - Hashing error if bcrypt fails (bad cost, RNG failure)
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(
                ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH).into(),
            );
        }

        hash(password, self.cost).map_err(|e| AppError::Hashing(e.to_string()))
    }

    /// Verify a password against a stored hash
    ///
    /// Every way of not matching is `CredentialMismatch`, including an empty
    /// password and a stored hash bcrypt cannot parse. Passwords rejected
    /// without looking at the hash still pay for one bcrypt verification.
    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<(), AppError> {
        if password.is_empty() || password.len() > MAX_PASSWORD_LENGTH {
            self.verify_dummy(password);
            return Err(AuthError::CredentialMismatch.into());
        }

        match self.bcrypt_verify(password.as_bytes(), hashed_password) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::CredentialMismatch.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                Err(AuthError::CredentialMismatch.into())
            }
        }
    }

    /// Burn the same amount of work as a real verification.
    ///
    /// Called when the identity is unknown so the response time of a login
    /// does not reveal whether the account exists.
    pub fn verify_dummy(&self, password: &str) {
        let readable = &password.as_bytes()[..password.len().min(MAX_PASSWORD_LENGTH)];
        if let Some(dummy) = self.dummy_hash() {
            let _ = self.bcrypt_verify(readable, dummy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_hash_password() {
        let password = "password";
        let hash = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
        // Cost is embedded in the hash
        assert!(hash.starts_with("$2b$04$"));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let first = hasher().hash("password").unwrap();
        let second = hasher().hash("password").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_password() {
        let hash = hasher().hash("password").unwrap();
        assert!(hasher().verify("password", &hash).is_ok());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hasher().hash("password").unwrap();
        let result = hasher().verify("wrong password", &hash);

        assert!(matches!(result, Err(AppError::Auth(AuthError::CredentialMismatch))));
    }

    #[test]
    fn test_password_does_not_match_other_hash() {
        let hash2 = hasher().hash("password2").unwrap();
        let result = hasher().verify("password", &hash2);

        assert!(matches!(result, Err(AppError::Auth(AuthError::CredentialMismatch))));
    }

    #[test]
    fn test_empty_password_never_verifies() {
        let hash = hasher().hash("password").unwrap();
        let result = hasher().verify("", &hash);

        assert!(matches!(result, Err(AppError::Auth(AuthError::CredentialMismatch))));
    }

    #[test]
    fn test_invalid_hash_is_mismatch() {
        let result = hasher().verify("password", "hashbrown");
        assert!(matches!(result, Err(AppError::Auth(AuthError::CredentialMismatch))));
    }

    #[test]
    fn test_empty_password_cannot_be_hashed() {
        let result = hasher().hash("");
        assert!(matches!(result, Err(AppError::Validation(ValidationError::EmptyField(_)))));
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        let result = hasher().hash(&long_password);

        assert!(matches!(result, Err(AppError::Validation(ValidationError::TooLong(_, 72)))));
    }

    #[test]
    fn test_long_password_sharing_prefix_does_not_verify() {
        let prefix = "b".repeat(MAX_PASSWORD_LENGTH);
        let hash = hasher().hash(&prefix).unwrap();
        let longer = format!("{}extra", prefix);

        assert!(hasher().verify(&longer, &hash).is_err());
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_COST);
    }

    #[test]
    fn test_rejected_passwords_still_cost_one_verification() {
        let hasher = hasher();
        let hash = hasher.hash("password").unwrap();
        let baseline = hasher.verifications();

        let too_long = "a".repeat(MAX_PASSWORD_LENGTH + 1);

        for password in ["", too_long.as_str(), "wrong"] {
            let before = hasher.verifications();
            assert!(hasher.verify(password, &hash).is_err());
            assert_eq!(hasher.verifications() - before, 1, "password length {}", password.len());
        }
        assert_eq!(hasher.verifications() - baseline, 3);
    }

    #[test]
    fn test_dummy_hash_uses_own_cost() {
        let cheap = PasswordHasher::new(4);
        let dearer = PasswordHasher::new(5);
        cheap.warm_up();
        dearer.warm_up();

        assert!(cheap.dummy_hash().unwrap().starts_with("$2b$04$"));
        assert!(dearer.dummy_hash().unwrap().starts_with("$2b$05$"));
    }

    #[test]
    fn test_clones_share_dummy_hash() {
        let hasher = hasher();
        let clone = hasher.clone();
        hasher.warm_up();

        assert_eq!(hasher.dummy_hash(), clone.dummy_hash());
    }

    #[test]
    fn test_invalid_cost_is_hashing_failure() {
        let result = PasswordHasher::new(2).hash("password");
        assert!(matches!(result, Err(AppError::Hashing(_))));
    }
}
