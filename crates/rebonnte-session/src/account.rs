//! # Account Flows
//!
//! Registration, sign-in and account removal over an [`AuthProvider`], with
//! a user profile mirrored into the document store.
//!
//! The profile is a convenience copy. A failed mirror write is logged and
//! the auth operation still succeeds; the stock updater then credits
//! movements to "Unknown" for that user.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{AuthError, AuthIdentity, AuthProvider};
use crate::error::SessionResult;
use rebonnte_core::{capitalize_first_letter, User};
use rebonnte_db::Database;

/// Account operations for one session.
#[derive(Clone)]
pub struct Accounts {
    auth: Arc<dyn AuthProvider>,
    db: Database,
}

impl std::fmt::Debug for Accounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accounts").finish_non_exhaustive()
    }
}

impl Accounts {
    pub fn new(auth: Arc<dyn AuthProvider>, db: Database) -> Self {
        Accounts { auth, db }
    }

    /// Creates the identity, signs it in and mirrors its profile.
    ///
    /// First and last names are stored capitalized ("jEAN" becomes "Jean").
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        firstname: &str,
        lastname: &str,
    ) -> SessionResult<AuthIdentity> {
        let identity = self.auth.register(email, password).await?;

        let profile = User::new(
            identity.uid.clone(),
            identity.email.clone(),
            capitalize_first_letter(firstname),
            capitalize_first_letter(lastname),
        );
        if self.db.users().add_user(&profile).await.is_none() {
            warn!(uid = %identity.uid, "Profile not mirrored after registration");
        }

        Ok(identity)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SessionResult<AuthIdentity> {
        Ok(self.auth.sign_in(email, password).await?)
    }

    pub async fn sign_out(&self) -> SessionResult<()> {
        Ok(self.auth.sign_out().await?)
    }

    pub async fn send_password_reset(&self, email: &str) -> SessionResult<()> {
        Ok(self.auth.send_password_reset(email).await?)
    }

    pub async fn current_user(&self) -> Option<AuthIdentity> {
        self.auth.current_user().await
    }

    /// Profile of the signed-in user, if mirrored.
    pub async fn current_profile(&self) -> Option<User> {
        let identity = self.auth.current_user().await?;
        self.db.users().get_user_by_id(&identity.uid).await
    }

    /// Deletes the signed-in identity, then its mirrored profile.
    pub async fn delete_account(&self) -> SessionResult<()> {
        let identity = self
            .auth
            .current_user()
            .await
            .ok_or(AuthError::NotSignedIn)?;

        self.auth.delete_account(&identity).await?;

        if !self.db.users().delete_user(&identity.uid).await {
            warn!(uid = %identity.uid, "Profile left behind after account deletion");
        }

        info!(uid = %identity.uid, "Account closed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
