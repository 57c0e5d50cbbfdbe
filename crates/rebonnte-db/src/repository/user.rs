//! # User Repository
//!
//! Profiles mirrored from authentication identities. The profile id is the
//! identity's UID, so registering the same identity twice overwrites.

use tracing::{info, warn};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::settle;
use crate::subscription::Collection;
use rebonnte_core::User;

/// Repository for user profiles.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(db: Database) -> Self {
        UserRepository { db }
    }

    /// Writes a profile under its id.
    ///
    /// ## Returns
    /// * `Some(id)` - Profile written
    /// * `None` - Empty id, or the write failed
    pub async fn add_user(&self, user: &User) -> Option<String> {
        if user.id.is_empty() {
            warn!(email = %user.email, "Refusing to store a profile without an id");
            return None;
        }

        settle(
            "add_user",
            self.upsert(user).await.map(|_| Some(user.id.clone())),
            None,
        )
    }

    /// Deletes a profile. Deleting an absent profile succeeds.
    pub async fn delete_user(&self, user_id: &str) -> bool {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;

        match result {
            Ok(_) => {
                info!(user_id = %user_id, "User profile deleted");
                self.db.notify(Collection::Users);
                true
            }
            Err(e) => settle("delete_user", Err(e.into()), false),
        }
    }

    /// Gets a profile by id.
    pub async fn get_user_by_id(&self, user_id: &str) -> Option<User> {
        settle("get_user_by_id", self.find_user(user_id).await, None)
    }

    async fn upsert(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, firstname, lastname, email)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                firstname = excluded.firstname,
                lastname = excluded.lastname,
                email = excluded.email
            "#,
        )
        .bind(&user.id)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .execute(self.db.pool())
        .await?;

        info!(user_id = %user.id, "User profile saved");
        self.db.notify(Collection::Users);
        Ok(())
    }

    pub async fn find_user(&self, user_id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, firstname, lastname, email FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_and_get_user() {
        let db = test_db().await;
        let user = User::new("uid-1", "pharma@rebonnte.fr", "Jean", "Dupont");

        assert_eq!(db.users().add_user(&user).await, Some("uid-1".to_string()));
        assert_eq!(db.users().get_user_by_id("uid-1").await, Some(user));
        assert!(db.users().get_user_by_id("uid-2").await.is_none());
    }

    #[tokio::test]
    async fn test_add_user_overwrites_by_id() {
        let db = test_db().await;
        db.users()
            .add_user(&User::new("uid-1", "old@rebonnte.fr", "Jean", "Dupont"))
            .await;
        db.users()
            .add_user(&User::new("uid-1", "new@rebonnte.fr", "Jean", "Dupont"))
            .await;

        let stored = db.users().get_user_by_id("uid-1").await.unwrap();
        assert_eq!(stored.email, "new@rebonnte.fr");
    }

    #[tokio::test]
    async fn test_add_user_requires_id() {
        let db = test_db().await;
        let user = User::new("", "pharma@rebonnte.fr", "Jean", "Dupont");
        assert_eq!(db.users().add_user(&user).await, None);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = test_db().await;
        db.users()
            .add_user(&User::new("uid-1", "pharma@rebonnte.fr", "Jean", "Dupont"))
            .await;

        assert!(db.users().delete_user("uid-1").await);
        assert!(db.users().get_user_by_id("uid-1").await.is_none());
        assert!(db.users().delete_user("uid-1").await);
    }
}
