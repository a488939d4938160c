//! # Cart Repository
//!
//! Database operations for carts and their line items.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → Cart { items: [] }                                  │
//! │                                                                         │
//! │  2. FILL                                                               │
//! │     └── add_product() → upsert line (existing line: quantity += n)     │
//! │     └── set_quantity() / remove_product() / clear()                    │
//! │                                                                         │
//! │  3. PURCHASE (tienda-checkout)                                         │
//! │     └── get_by_id() → reconcile against stock                          │
//! │     └── replace_items() → keep only the failed remainder               │
//! │                                                                         │
//! │  Line order is stable: `position` records insertion order and the      │
//! │  purchase pipeline walks lines in that order.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tienda_core::{validation, Cart, CartLine};

/// Internal row shape for the carts table.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Creates a new empty cart.
    pub async fn create(&self) -> DbResult<Cart> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, "Creating cart");

        sqlx::query("INSERT INTO carts (id, created_at, updated_at) VALUES (?1, ?2, ?3)")
            .bind(&id)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Cart {
            id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a cart with its line items in stored order.
    ///
    /// ## Returns
    /// * `Ok(Some(Cart))` - Cart found (items possibly empty)
    /// * `Ok(None)` - Cart not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, created_at, updated_at FROM carts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.load_items(&row.id).await?;

        Ok(Some(Cart {
            id: row.id,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Adds a product to a cart (upsert).
    ///
    /// A new line is appended at the end; an existing line for the same
    /// product has its quantity increased instead.
    ///
    /// ## Errors
    /// * `DbError::Validation` - Quantity is below 1
    /// * `DbError::NotFound` - Cart doesn't exist
    pub async fn add_product(&self, cart_id: &str, product_id: &str, quantity: i64) -> DbResult<Cart> {
        debug!(cart_id = %cart_id, product_id = %product_id, quantity = %quantity, "Adding product to cart");

        validation::validate_quantity(quantity)?;
        self.require_cart(cart_id).await?;

        let now = Utc::now();
        let item_id = Uuid::new_v4().to_string();

        // Upsert: new lines get the next position; existing lines keep
        // their position and accumulate quantity.
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, position, added_at)
            VALUES (
                ?1, ?2, ?3, ?4,
                COALESCE((SELECT MAX(position) + 1 FROM cart_items WHERE cart_id = ?2), 0),
                ?5
            )
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(&item_id)
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.touch(cart_id, now).await?;
        self.reload(cart_id).await
    }

    /// Removes a product's line from a cart.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Cart doesn't exist, or the product has no line
    pub async fn remove_product(&self, cart_id: &str, product_id: &str) -> DbResult<Cart> {
        debug!(cart_id = %cart_id, product_id = %product_id, "Removing product from cart");

        self.require_cart(cart_id).await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1 AND product_id = ?2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }

        self.touch(cart_id, Utc::now()).await?;
        self.reload(cart_id).await
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Errors
    /// * `DbError::Validation` - Quantity is below 1
    /// * `DbError::NotFound` - Cart doesn't exist, or the product has no line
    pub async fn set_quantity(&self, cart_id: &str, product_id: &str, quantity: i64) -> DbResult<Cart> {
        debug!(cart_id = %cart_id, product_id = %product_id, quantity = %quantity, "Setting line quantity");

        validation::validate_quantity(quantity)?;
        self.require_cart(cart_id).await?;

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ?3 WHERE cart_id = ?1 AND product_id = ?2",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart line", product_id));
        }

        self.touch(cart_id, Utc::now()).await?;
        self.reload(cart_id).await
    }

    /// Replaces a cart's line items wholesale.
    ///
    /// This is the purchase pipeline's cart rewrite: after processing, the
    /// cart holds exactly the lines passed here (the unfulfilled remainder),
    /// in the given order. An empty slice empties the cart.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Cart doesn't exist
    pub async fn replace_items(&self, cart_id: &str, items: &[CartLine]) -> DbResult<Cart> {
        debug!(cart_id = %cart_id, count = items.len(), "Replacing cart items");

        self.require_cart(cart_id).await?;

        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        for (position, line) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, product_id, quantity, position, added_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(cart_id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(position as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.reload(cart_id).await
    }

    /// Empties a cart.
    pub async fn clear(&self, cart_id: &str) -> DbResult<Cart> {
        self.replace_items(cart_id, &[]).await
    }

    /// Deletes a cart (line items cascade).
    pub async fn delete(&self, cart_id: &str) -> DbResult<()> {
        debug!(cart_id = %cart_id, "Deleting cart");

        let result = sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", cart_id));
        }

        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_items(&self, cart_id: &str) -> DbResult<Vec<CartLine>> {
        let items = sqlx::query_as::<_, CartLine>(
            "SELECT product_id, quantity FROM cart_items WHERE cart_id = ?1 ORDER BY position",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn require_cart(&self, cart_id: &str) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM carts WHERE id = ?1")
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("Cart", cart_id)),
        }
    }

    async fn touch(&self, cart_id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reload(&self, cart_id: &str) -> DbResult<Cart> {
        self.get_by_id(cart_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", cart_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
