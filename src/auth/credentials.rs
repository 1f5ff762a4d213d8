use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::debug;

use crate::db::{UserRecord, UserStore};
use crate::error::{AppError, AuthError};
use crate::Result;

/// Adaptive password hashing. Comparison must be constant time.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordScheme: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// `false` for a wrong password or an unparseable stored hash.
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool;
}

/// Argon2id with a fresh random salt per hash, stored as a PHC string.
#[derive(Default)]
pub struct Argon2Scheme {
    argon2: Argon2<'static>,
}

impl Argon2Scheme {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                debug!("Stored password hash is not a valid PHC string: {}", e);
                false
            }
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks an email/password pair against the user store.
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    scheme: Arc<dyn PasswordScheme>,
    // verified against when the account does not exist
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn UserStore>, scheme: Arc<dyn PasswordScheme>) -> Result<Self> {
        let dummy_hash = scheme.hash("stable-auth-dummy-password")?;
        Ok(Self {
            store,
            scheme,
            dummy_hash,
        })
    }

    /// Returns the matching active user.
    ///
    /// Fails with `InvalidCredentials` for an unknown email or a wrong
    /// password, and with `AccountInactive` only once the password matched.
    /// Store failures come back as `AppError::DatabaseError`.
    pub async fn verify(&self, email: &str, password: &str) -> Result<UserRecord> {
        let email = normalize_email(email);

        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let _ = self.scheme.verify(password, &self.dummy_hash);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.scheme.verify(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        Ok(user)
    }
}
