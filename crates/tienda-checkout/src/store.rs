//! # Storage Traits
//!
//! The purchase pipeline talks to storage through three narrow traits rather
//! than the concrete repositories. The traits carry exactly the operations
//! the pipeline needs, which keeps the service testable against in-memory
//! fakes and leaves room for a different backend later.
//!
//! The SQLite implementations delegate straight to the `tienda-db`
//! repositories.

use tienda_core::{Cart, CartLine, Money, Product, Ticket};
use tienda_db::{CartRepository, DbResult, ProductRepository, TicketRepository};

/// Product lookups and the stock ledger.
#[allow(async_fn_in_trait)]
pub trait ProductStore {
    /// Gets a product by ID.
    async fn get_product(&self, id: &str) -> DbResult<Option<Product>>;

    /// Advisory availability check. Never mutates stock.
    async fn has_stock(&self, id: &str, quantity: i64) -> DbResult<bool>;

    /// Atomically reserves `quantity` units, failing if stock is short.
    /// Returns the product as it stands after the decrement.
    async fn reduce_stock(&self, id: &str, quantity: i64) -> DbResult<Product>;
}

/// Cart loading and the post-purchase rewrite.
#[allow(async_fn_in_trait)]
pub trait CartStore {
    /// Gets a cart with its lines in stored order.
    async fn get_cart(&self, id: &str) -> DbResult<Option<Cart>>;

    /// Replaces the cart's lines wholesale (empty slice empties the cart).
    async fn replace_items(&self, cart_id: &str, items: &[CartLine]) -> DbResult<Cart>;
}

/// Ticket issuance.
#[allow(async_fn_in_trait)]
pub trait TicketStore {
    /// Creates an immutable ticket for a completed purchase.
    async fn create_ticket(&self, amount: Money, purchaser: &str) -> DbResult<Ticket>;
}

// =============================================================================
// SQLite implementations
// =============================================================================

impl ProductStore for ProductRepository {
    async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        self.get_by_id(id).await
    }

    async fn has_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        ProductRepository::has_stock(self, id, quantity).await
    }

    async fn reduce_stock(&self, id: &str, quantity: i64) -> DbResult<Product> {
        ProductRepository::reduce_stock(self, id, quantity).await
    }
}

impl CartStore for CartRepository {
    async fn get_cart(&self, id: &str) -> DbResult<Option<Cart>> {
        self.get_by_id(id).await
    }

    async fn replace_items(&self, cart_id: &str, items: &[CartLine]) -> DbResult<Cart> {
        CartRepository::replace_items(self, cart_id, items).await
    }
}

impl TicketStore for TicketRepository {
    async fn create_ticket(&self, amount: Money, purchaser: &str) -> DbResult<Ticket> {
        self.create(amount, purchaser).await
    }
}
