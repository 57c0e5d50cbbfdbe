//! # Authentication Boundary
//!
//! The session talks to identity management through [`AuthProvider`]. The
//! provider owns credentials; the profile store only ever sees the UID and
//! email it hands back.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Authentication Boundary                            │
//! │                                                                         │
//! │  Accounts::register(email, password, first, last)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AuthProvider::register ──► AuthIdentity { uid, email }                │
//! │       │                        (signed in)                              │
//! │       ▼                                                                 │
//! │  users.add_user(User { id: uid, ... }) ── mirrored profile             │
//! │                                                                         │
//! │  StockUpdater flush ──► users.get_user_by_id(uid) ──► author email     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`LocalAuthProvider`] keeps accounts in process with argon2 password
//! hashes. Password reset mails are recorded in an outbox instead of sent.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use rebonnte_core::generate_id;
use rebonnte_core::validation::{validate_email, validate_password};

// =============================================================================
// Types
// =============================================================================

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: String,
    pub email: String,
}

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("An account already exists for this email")]
    EmailAlreadyInUse,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("No account found for {0}")]
    UnknownAccount(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Identity management used by the session.
///
/// Every operation reports failure through its `Result`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn register(&self, email: &str, password: &str) -> AuthResult<AuthIdentity>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthIdentity>;

    async fn sign_out(&self) -> AuthResult<()>;

    /// Deletes the account of a signed-in identity.
    async fn delete_account(&self, identity: &AuthIdentity) -> AuthResult<()>;

    async fn send_password_reset(&self, email: &str) -> AuthResult<()>;

    async fn current_user(&self) -> Option<AuthIdentity>;
}

// =============================================================================
// Local Provider
// =============================================================================

#[derive(Debug, Clone)]
struct LocalAccount {
    uid: String,
    email: String,
    password_hash: String,
}

impl LocalAccount {
    fn identity(&self) -> AuthIdentity {
        AuthIdentity {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

/// In-process [`AuthProvider`].
///
/// Accounts are keyed by lowercased email. Nothing is persisted.
#[derive(Debug, Default)]
pub struct LocalAuthProvider {
    accounts: RwLock<HashMap<String, LocalAccount>>,
    current: RwLock<Option<AuthIdentity>>,
    reset_outbox: Mutex<Vec<String>>,
}

impl LocalAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails that a password reset was requested for, oldest first.
    pub async fn sent_password_resets(&self) -> Vec<String> {
        self.reset_outbox.lock().await.clone()
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> AuthResult<()> {
    validate_email(email).map_err(|e| AuthError::InvalidEmail(e.to_string()))
}

fn hash_password(password: &str) -> AuthResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn register(&self, email: &str, password: &str) -> AuthResult<AuthIdentity> {
        check_email(email)?;
        validate_password(password).map_err(|_| AuthError::WeakPassword {
            min: rebonnte_core::MIN_PASSWORD_LENGTH,
        })?;

        let key = account_key(email);
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let account = LocalAccount {
            uid: generate_id(),
            email: email.trim().to_string(),
            password_hash: hash_password(password)?,
        };
        let identity = account.identity();
        accounts.insert(key, account);
        drop(accounts);

        info!(uid = %identity.uid, "Account registered");
        *self.current.write().await = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthIdentity> {
        let identity = {
            let accounts = self.accounts.read().await;
            match accounts.get(&account_key(email)) {
                Some(account) if verify_password(password, &account.password_hash) => {
                    account.identity()
                }
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        debug!(uid = %identity.uid, "Signed in");
        *self.current.write().await = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(identity) = self.current.write().await.take() {
            debug!(uid = %identity.uid, "Signed out");
        }
        Ok(())
    }

    async fn delete_account(&self, identity: &AuthIdentity) -> AuthResult<()> {
        let mut current = self.current.write().await;
        if current.as_ref() != Some(identity) {
            return Err(AuthError::NotSignedIn);
        }

        let mut accounts = self.accounts.write().await;
        if accounts.remove(&account_key(&identity.email)).is_none() {
            return Err(AuthError::UnknownAccount(identity.email.clone()));
        }

        *current = None;
        info!(uid = %identity.uid, "Account deleted");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        check_email(email)?;

        if !self.accounts.read().await.contains_key(&account_key(email)) {
            return Err(AuthError::UnknownAccount(email.to_string()));
        }

        self.reset_outbox.lock().await.push(email.trim().to_string());
        info!("Password reset requested");
        Ok(())
    }

    async fn current_user(&self) -> Option<AuthIdentity> {
        self.current.read().await.clone()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_signs_in() {
        let auth = LocalAuthProvider::new();
        let identity = auth.register("pharma@rebonnte.fr", "secret").await.unwrap();

        assert_eq!(identity.email, "pharma@rebonnte.fr");
        assert!(!identity.uid.is_empty());
        assert_eq!(auth.current_user().await, Some(identity));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let auth = LocalAuthProvider::new();

        assert!(matches!(
            auth.register("not-an-email", "secret").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert_eq!(
            auth.register("pharma@rebonnte.fr", "12345").await,
            Err(AuthError::WeakPassword { min: 6 })
        );

        auth.register("pharma@rebonnte.fr", "secret").await.unwrap();
        assert_eq!(
            auth.register("Pharma@Rebonnte.fr", "another").await,
            Err(AuthError::EmailAlreadyInUse)
        );
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let auth = LocalAuthProvider::new();
        let registered = auth.register("pharma@rebonnte.fr", "secret").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current_user().await.is_none());

        assert_eq!(
            auth.sign_in("pharma@rebonnte.fr", "wrong!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in("nobody@rebonnte.fr", "secret").await,
            Err(AuthError::InvalidCredentials)
        );

        let identity = auth.sign_in("PHARMA@rebonnte.fr", "secret").await.unwrap();
        assert_eq!(identity, registered);
    }

    #[tokio::test]
    async fn test_delete_account_requires_sign_in() {
        let auth = LocalAuthProvider::new();
        let identity = auth.register("pharma@rebonnte.fr", "secret").await.unwrap();
        auth.sign_out().await.unwrap();

        assert_eq!(
            auth.delete_account(&identity).await,
            Err(AuthError::NotSignedIn)
        );

        auth.sign_in("pharma@rebonnte.fr", "secret").await.unwrap();
        auth.delete_account(&identity).await.unwrap();
        assert!(auth.current_user().await.is_none());
        assert_eq!(
            auth.sign_in("pharma@rebonnte.fr", "secret").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_password_reset_outbox() {
        let auth = LocalAuthProvider::new();
        auth.register("pharma@rebonnte.fr", "secret").await.unwrap();

        auth.send_password_reset("pharma@rebonnte.fr").await.unwrap();
        assert!(matches!(
            auth.send_password_reset("nobody@rebonnte.fr").await,
            Err(AuthError::UnknownAccount(_))
        ));
        assert!(matches!(
            auth.send_password_reset("").await,
            Err(AuthError::InvalidEmail(_))
        ));

        assert_eq!(auth.sent_password_resets().await, vec!["pharma@rebonnte.fr"]);
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("Secret", &hash));
        assert!(!verify_password("secret", "not-a-hash"));
    }
}
