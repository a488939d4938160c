//! # Product Repository
//!
//! Database operations for the product catalog, including the stock ledger
//! primitives used by purchase processing.
//!
//! ## Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Oversell Protection                                     │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (races under concurrent purchases)          │
//! │     SELECT stock ... ; UPDATE products SET stock = <computed>          │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional decrement                                 │
//! │     UPDATE products SET stock = stock - N                              │
//! │     WHERE id = ? AND stock >= N                                        │
//! │                                                                         │
//! │  Zero rows affected means the guard fired: either the product is gone  │
//! │  or a concurrent purchase depleted the stock. A follow-up read         │
//! │  classifies which. Two runs racing for the last unit: exactly one      │
//! │  UPDATE matches, the other gets InsufficientStock.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tienda_core::{Product, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use serde::{Deserialize, Serialize};

// =============================================================================
// Paged Listing Types
// =============================================================================

/// Sort direction for the paged product listing (by unit price).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSort {
    Asc,
    Desc,
}

/// Query options for the paged product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Items per page; clamped to `1..=MAX_PAGE_SIZE`, default `DEFAULT_PAGE_SIZE`.
    pub limit: Option<u32>,
    /// 1-based page number; default 1.
    pub page: Option<u32>,
    /// Optional price sort.
    pub sort: Option<PriceSort>,
    /// Optional category filter.
    pub category: Option<String>,
}

/// One page of products plus paging metadata.
///
/// Link URL construction is the transport layer's job; this struct only
/// carries the numbers it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: u32,
    pub total_pages: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

const PRODUCT_COLUMNS: &str =
    "id, code, title, description, price_cents, stock, category, status, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("uuid-here").await?;
/// let updated = repo.reduce_stock("uuid-here", 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products, paged, with optional category filter and price
    /// sort.
    ///
    /// ## Arguments
    /// * `query` - limit/page/sort/category options; see [`ProductQuery`]
    pub async fn list(&self, query: &ProductQuery) -> DbResult<ProductPage> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let offset = (page as i64 - 1) * limit as i64;

        debug!(limit, page, category = ?query.category, "Listing products");

        // Count first so total_pages is consistent with the filter.
        let mut count_sql = String::from("SELECT COUNT(*) FROM products WHERE status = 1");
        if query.category.is_some() {
            count_sql.push_str(" AND category = ?1");
        }
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(category) = &query.category {
            count_query = count_query.bind(category);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE status = 1");
        if query.category.is_some() {
            // Keep every placeholder positional: sqlx's SQLite driver mis-binds
            // statements that mix `?N` with bare `?`.
            sql.push_str(" AND category = ?");
        }
        match query.sort {
            Some(PriceSort::Asc) => sql.push_str(" ORDER BY price_cents ASC"),
            Some(PriceSort::Desc) => sql.push_str(" ORDER BY price_cents DESC"),
            None => sql.push_str(" ORDER BY title"),
        }
        sql.push_str(" LIMIT ? OFFSET ?");

        let mut list_query = sqlx::query_as::<_, Product>(&sql);
        if let Some(category) = &query.category {
            list_query = list_query.bind(category);
        }
        let products = list_query
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total_pages = ((total as u64).div_ceil(limit as u64)).max(1) as u32;
        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;

        Ok(ProductPage {
            products,
            total,
            page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        })
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, title, description,
                price_cents, stock, category, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates an existing product's catalog fields.
    ///
    /// Stock is deliberately NOT updated here; stock moves only through
    /// [`Self::reduce_stock`] and [`Self::restock`].
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                title = ?3,
                description = ?4,
                price_cents = ?5,
                category = ?6,
                status = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(product.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product.
    ///
    /// Cart lines referencing it are left in place; purchase processing
    /// treats them as failed lines.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Stock Ledger
    // =========================================================================

    /// Checks whether current stock covers the requested quantity.
    ///
    /// Read-only: calling this any number of times never changes the outcome
    /// of a later [`Self::reduce_stock`]. It is an advisory check; the
    /// conditional decrement remains the authority under concurrency.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Product doesn't exist
    pub async fn has_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match stock {
            Some(stock) => Ok(stock >= quantity),
            None => Err(DbError::not_found("Product", id)),
        }
    }

    /// Atomically decrements stock by `quantity` and returns the updated
    /// product.
    ///
    /// The conditional `WHERE stock >= ?` guard makes the check-then-decrement
    /// a single critical section per product: concurrent purchases cannot
    /// oversell. There is no rollback primitive; compensation (if any) is the
    /// caller's responsibility.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Product doesn't exist
    /// * `DbError::InsufficientStock` - Requested quantity exceeds current stock
    pub async fn reduce_stock(&self, id: &str, quantity: i64) -> DbResult<Product> {
        if quantity < 1 {
            return Err(DbError::Internal(format!(
                "reduce_stock requires quantity >= 1, got {quantity}"
            )));
        }

        debug!(id = %id, quantity = %quantity, "Reducing stock");

        let now = Utc::now();

        let sql = format!(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(quantity)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(product) => Ok(product),
            // Guard fired: classify by re-reading. The product either
            // vanished or lacks stock (possibly depleted concurrently since
            // any earlier has_stock check).
            None => match self.get_by_id(id).await? {
                Some(product) => Err(DbError::insufficient_stock(id, product.stock, quantity)),
                None => Err(DbError::not_found("Product", id)),
            },
        }
    }

    /// Adds `quantity` units back to stock (restocking, never part of the
    /// purchase pipeline).
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Restocking");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE status = 1")
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
    use tienda_core::NewProduct;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(code: &str, price_cents: i64, stock: i64, category: &str) -> Product {
        Product::new(NewProduct {
            code: code.to_string(),
            title: format!("Product {code}"),
            description: None,
            price_cents,
            stock,
            category: category.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let p = product("CAFE-001", 1050, 20, "almacen");
        repo.insert(&p).await.unwrap();

        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(found.code, "CAFE-001");
        assert_eq!(found.stock, 20);

        let by_code = repo.get_by_code("CAFE-001").await.unwrap().unwrap();
        assert_eq!(by_code.id, p.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_code_fails() {
        let db = test_db().await;
        let repo = db.products();

        repo.insert(&product("DUP-1", 100, 1, "a")).await.unwrap();
        let err = repo.insert(&product("DUP-1", 200, 2, "b")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_has_stock() {
        let db = test_db().await;
        let repo = db.products();

        let p = product("YERBA-1", 500, 3, "almacen");
        repo.insert(&p).await.unwrap();

        assert!(repo.has_stock(&p.id, 3).await.unwrap());
        assert!(!repo.has_stock(&p.id, 4).await.unwrap());

        // Read-only: repeated checks never change the answer.
        for _ in 0..5 {
            assert!(repo.has_stock(&p.id, 3).await.unwrap());
        }
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock, 3);

        let err = repo.has_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reduce_stock_success() {
        let db = test_db().await;
        let repo = db.products();

        let p = product("AZUCAR-1", 300, 5, "almacen");
        repo.insert(&p).await.unwrap();

        let updated = repo.reduce_stock(&p.id, 2).await.unwrap();
        assert_eq!(updated.stock, 3);
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_reduce_stock_insufficient() {
        let db = test_db().await;
        let repo = db.products();

        let p = product("SAL-1", 200, 1, "almacen");
        repo.insert(&p).await.unwrap();

        let err = repo.reduce_stock(&p.id, 2).await.unwrap_err();
        match err {
            DbError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Stock untouched by the failed attempt.
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_reduce_stock_missing_product() {
        let db = test_db().await;
        let err = db.products().reduce_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_restock() {
        let db = test_db().await;
        let repo = db.products();

        let p = product("HARINA-1", 250, 0, "almacen");
        repo.insert(&p).await.unwrap();

        repo.restock(&p.id, 10).await.unwrap();
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_list_pagination_and_filter() {
        let db = test_db().await;
        let repo = db.products();

        for i in 0..7i64 {
            let category = if i < 4 { "bebidas" } else { "almacen" };
            repo.insert(&product(&format!("P-{i}"), 100 + i, 10, category))
                .await
                .unwrap();
        }

        let page = repo
            .list(&ProductQuery {
                limit: Some(3),
                page: Some(1),
                sort: Some(PriceSort::Asc),
                category: Some("bebidas".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.products.len(), 3);
        assert!(!page.has_prev_page);
        assert!(page.has_next_page);
        assert_eq!(page.next_page, Some(2));
        // ascending price order
        assert!(page.products[0].price_cents <= page.products[1].price_cents);

        let page2 = repo
            .list(&ProductQuery {
                limit: Some(3),
                page: Some(2),
                sort: None,
                category: Some("bebidas".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(page2.products.len(), 1);
        assert!(page2.has_prev_page);
        assert!(!page2.has_next_page);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let repo = db.products();

        let mut p = product("LECHE-1", 400, 8, "lacteos");
        repo.insert(&p).await.unwrap();

        p.title = "Leche entera 1L".to_string();
        p.price_cents = 450;
        repo.update(&p).await.unwrap();

        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Leche entera 1L");
        assert_eq!(found.price_cents, 450);
        // update never touches stock
        assert_eq!(found.stock, 8);

        repo.delete(&p.id).await.unwrap();
        assert!(repo.get_by_id(&p.id).await.unwrap().is_none());

        let err = repo.delete(&p.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
