//! # User Repository
//!
//! Database operations for user accounts.
//!
//! Email is the natural key (unique, stored lowercase via `User::new`);
//! each user optionally owns one cart.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tienda_core::User;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, age, password_hash, cart_id, role, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new user.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - Email already registered
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, age, password_hash,
                               cart_id, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.age)
        .bind(&user.password_hash)
        .bind(&user.cart_id)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by email (case-insensitive on the stored lowercase form).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Associates a cart with a user.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - User doesn't exist
    /// * `DbError::ForeignKeyViolation` - Cart doesn't exist
    pub async fn attach_cart(&self, user_id: &str, cart_id: &str) -> DbResult<()> {
        debug!(user_id = %user_id, cart_id = %cart_id, "Attaching cart to user");

        let result = sqlx::query("UPDATE users SET cart_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(user_id)
            .bind(cart_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", user_id));
        }

        Ok(())
    }

    /// Counts all users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tienda_core::UserRole;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.users();

        let user = User::new("Ana@Example.com", "hash123").unwrap();
        repo.insert(&user).await.unwrap();

        let found = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found.email, "ana@example.com");
        assert_eq!(found.role, UserRole::User);

        // Lookup normalizes case the same way insertion did
        let by_email = repo.get_by_email("ANA@example.COM").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = test_db().await;
        let repo = db.users();

        repo.insert(&User::new("dup@example.com", "h1").unwrap()).await.unwrap();
        let err = repo
            .insert(&User::new("dup@example.com", "h2").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_attach_cart() {
        let db = test_db().await;

        let user = User::new("cart@example.com", "h").unwrap();
        db.users().insert(&user).await.unwrap();
        let cart = db.carts().create().await.unwrap();

        db.users().attach_cart(&user.id, &cart.id).await.unwrap();

        let found = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found.cart_id.as_deref(), Some(cart.id.as_str()));

        let err = db.users().attach_cart("missing", &cart.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
