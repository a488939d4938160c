//! # Checkout Arithmetic
//!
//! The pure half of purchase processing: snapshot types for reconciled line
//! items, charged-amount totalling, and the remainder computation used to
//! rewrite the cart.
//!
//! ## Where This Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Purchase Processing Split                             │
//! │                                                                         │
//! │  tienda-checkout (I/O)                tienda-core (THIS MODULE)        │
//! │  ──────────────────────               ─────────────────────────        │
//! │  load cart                                                             │
//! │  per-line stock reservation   ──────► FulfilledItem snapshots          │
//! │  issue ticket                 ──────► purchase_total()                 │
//! │  rewrite cart                 ──────► remaining_lines()                │
//! │                                                                         │
//! │  Everything here is deterministic and tested without a database.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::CartLine;

// =============================================================================
// Fulfilled Item
// =============================================================================

/// A cart line whose stock reservation succeeded during one reconciliation
/// run.
///
/// ## Snapshot Pattern
/// The unit price is captured from the product at the moment the stock was
/// decremented. Later price changes never affect the charged amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilledItem {
    /// Product the reservation was made against.
    pub product_id: String,

    /// Units reserved (the line's full requested quantity).
    pub quantity: i64,

    /// Unit price in cents at reservation time (frozen).
    pub unit_price_cents: i64,
}

impl FulfilledItem {
    /// Line total: unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents) * self.quantity
    }
}

// =============================================================================
// Reconciliation Result
// =============================================================================

/// Outcome of walking a cart against the stock ledger: which lines were
/// reserved and which were not.
///
/// A line lands in `failed` when stock was insufficient, the product was
/// missing, or an unexpected storage error hit that single line. One line's
/// failure never reverses another's success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Lines whose stock was decremented, with frozen prices.
    pub fulfilled: Vec<FulfilledItem>,

    /// Product ids of lines that could not be reserved, in cart order.
    pub failed: Vec<String>,
}

impl Reconciliation {
    /// True when at least one line was reserved (a ticket will be issued).
    #[inline]
    pub fn any_fulfilled(&self) -> bool {
        !self.fulfilled.is_empty()
    }

    /// Total charged amount over the fulfilled lines.
    #[inline]
    pub fn total(&self) -> Money {
        purchase_total(&self.fulfilled)
    }
}

// =============================================================================
// Pure Functions
// =============================================================================

/// Computes the charged amount: Σ unit_price × quantity over fulfilled items.
///
/// ## Example
/// ```rust
/// use tienda_core::checkout::{purchase_total, FulfilledItem};
/// use tienda_core::Money;
///
/// let items = vec![
///     FulfilledItem { product_id: "a".into(), quantity: 2, unit_price_cents: 1000 },
///     FulfilledItem { product_id: "b".into(), quantity: 1, unit_price_cents: 550 },
/// ];
/// assert_eq!(purchase_total(&items), Money::from_cents(2550));
/// ```
pub fn purchase_total(items: &[FulfilledItem]) -> Money {
    items.iter().map(FulfilledItem::line_total).sum()
}

/// Computes the cart remainder after purchase processing: the original lines
/// whose product id appears in the failed set, at their original requested
/// quantities.
///
/// An empty failed set yields an empty remainder (the cart is fully
/// cleared); fulfilled lines are dropped entirely rather than kept at zero
/// quantity.
pub fn remaining_lines(original: &[CartLine], failed: &[String]) -> Vec<CartLine> {
    original
        .iter()
        .filter(|line| failed.iter().any(|id| *id == line.product_id))
        .cloned()
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
