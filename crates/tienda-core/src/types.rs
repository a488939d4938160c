//! # Domain Types
//!
//! Core domain types for the tienda backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │     Ticket      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  items          │   │  code (business)│       │
//! │  │  title          │   │   [CartLine]    │   │  amount_cents   │       │
//! │  │  price_cents    │   │                 │   │  purchaser      │       │
//! │  │  stock          │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    CartLine     │   │      User       │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  product_id     │   │  email (unique) │                             │
//! │  │  quantity ≥ 1   │   │  role user/admin│                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Products and tickets carry both:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `code`: human-readable business identifier, unique per table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::money::Money;
use crate::validation;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier, unique across the catalog.
    pub code: String,

    /// Display title.
    pub title: String,

    /// Optional long description.
    pub description: Option<String>,

    /// Unit price in cents (always positive).
    pub price_cents: i64,

    /// Units currently available. Never negative; only the stock ledger's
    /// conditional decrement mutates this during purchase processing.
    pub stock: i64,

    /// Catalog category (used by the paged listing filter).
    pub category: String,

    /// Whether the product is visible in the catalog.
    pub status: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds a validated product with a fresh id and timestamps.
    ///
    /// ## Errors
    /// Returns a [`crate::ValidationError`] (wrapped in `CoreError`) when the
    /// title is empty, the code is malformed, the price is not positive, or
    /// the stock is negative.
    pub fn new(input: NewProduct) -> CoreResult<Product> {
        validation::validate_title(&input.title)?;
        validation::validate_product_code(&input.code)?;
        validation::validate_price_cents(input.price_cents)?;
        validation::validate_stock(input.stock)?;

        let now = Utc::now();
        Ok(Product {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            category: input.category,
            status: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether current stock covers the requested quantity.
    ///
    /// Read-only convenience mirror of the stock ledger's availability check;
    /// reservation still goes through the conditional decrement.
    #[inline]
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Input for creating a product. Validated by [`Product::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub category: String,
}

// =============================================================================
// Cart
// =============================================================================

/// A line item in a cart: a product reference with a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product reference (UUID of the product).
    pub product_id: String,

    /// Requested quantity, always >= 1. Failed lines keep their original
    /// requested quantity after purchase processing; there are no
    /// zero-quantity leftovers.
    pub quantity: i64,
}

impl CartLine {
    /// Creates a line after validating the quantity.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> CoreResult<CartLine> {
        validation::validate_quantity(quantity)?;
        Ok(CartLine {
            product_id: product_id.into(),
            quantity,
        })
    }
}

/// A shopping cart: an ordered collection of line items.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product again
///   increases the existing line's quantity)
/// - Stored order is preserved; purchase processing walks lines in order
/// - After purchase processing the items are rewritten wholesale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Line items in stored order.
    pub items: Vec<CartLine>,

    /// When the cart was created.
    pub created_at: DateTime<Utc>,

    /// When the cart contents last changed.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Checks if the cart has no line items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units requested across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|line| line.quantity).sum()
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// An immutable record of a completed (possibly partial) purchase.
///
/// Created by the purchase issuer only when at least one line item was
/// fulfilled; never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable purchase code, unique across tickets.
    pub code: String,

    /// Total charged amount in cents: Σ unit_price × quantity over the
    /// items fulfilled at processing time.
    pub amount_cents: i64,

    /// Email of the purchasing user.
    pub purchaser: String,

    /// When the purchase was processed.
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Returns the charged amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// User
// =============================================================================

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// A user account.
///
/// `password_hash` is stored opaque; hashing and verification are handled by
/// the authentication layer, not this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The user's active cart, if one has been created.
    pub cart_id: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a validated user with a fresh id and timestamps.
    pub fn new(email: &str, password_hash: &str) -> CoreResult<User> {
        validation::validate_email(email)?;

        let now = Utc::now();
        Ok(User {
            id: Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            first_name: None,
            last_name: None,
            age: None,
            password_hash: password_hash.to_string(),
            cart_id: None,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        })
    }

    /// Checks if this user has the admin role.
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};

    fn sample_input() -> NewProduct {
        NewProduct {
            code: "CAFE-001".to_string(),
            title: "Café molido 500g".to_string(),
            description: None,
            price_cents: 1050,
            stock: 20,
            category: "almacen".to_string(),
        }
    }

    #[test]
    fn test_product_new_valid() {
        let product = Product::new(sample_input()).unwrap();
        assert_eq!(product.code, "CAFE-001");
        assert!(product.status);
        assert_eq!(product.price(), Money::from_cents(1050));
        assert!(product.can_fulfill(20));
        assert!(!product.can_fulfill(21));
    }

    #[test]
    fn test_product_new_rejects_bad_price() {
        let mut input = sample_input();
        input.price_cents = 0;
        let err = Product::new(input).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_product_new_rejects_negative_stock() {
        let mut input = sample_input();
        input.stock = -1;
        assert!(Product::new(input).is_err());
    }

    #[test]
    fn test_cart_line_quantity_must_be_at_least_one() {
        assert!(CartLine::new("p-1", 1).is_ok());
        assert!(CartLine::new("p-1", 0).is_err());
        assert!(CartLine::new("p-1", -3).is_err());
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart {
            id: "c-1".to_string(),
            items: vec![
                CartLine { product_id: "a".to_string(), quantity: 2 },
                CartLine { product_id: "b".to_string(), quantity: 3 },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!cart.is_empty());
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_user_new_normalizes_email() {
        let user = User::new(" Ana@Example.COM ", "hash").unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_user_new_rejects_bad_email() {
        assert!(User::new("not-an-email", "hash").is_err());
    }
}
