//! # Purchase Error Types
//!
//! Errors the purchase pipeline can surface to its caller.
//!
//! Per-item stock problems are NOT errors here: the pipeline swallows them
//! into `products_failed` and keeps going. Only conditions that abort the
//! whole purchase reach this enum.

use thiserror::Error;
use tienda_db::DbError;

/// Errors that abort a purchase.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The cart does not exist or has no line items.
    #[error("Cart {cart_id} is empty or does not exist")]
    EmptyCart { cart_id: String },

    /// Storage failure outside the per-item reconciliation loop
    /// (loading the cart, issuing the ticket, rewriting the cart).
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl PurchaseError {
    /// Helper to create an EmptyCart error.
    pub fn empty_cart(cart_id: impl Into<String>) -> Self {
        PurchaseError::EmptyCart {
            cart_id: cart_id.into(),
        }
    }
}

/// Result type alias for purchase operations.
pub type PurchaseResult<T> = Result<T, PurchaseError>;
