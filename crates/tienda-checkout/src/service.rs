//! # Purchase Service
//!
//! Orchestrates the purchase pipeline.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      process_purchase(cart_id, purchaser)               │
//! │                                                                         │
//! │  1. LOAD        get_cart() ── missing or empty ──► Err(EmptyCart)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. RECONCILE   per line, in cart order:                               │
//! │                   has_stock?  ──no──►  failed                          │
//! │                   reduce_stock ──err──► failed (swallowed, continue)   │
//! │                   ok ──► fulfilled at the current unit price           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. ISSUE       ≥1 fulfilled line ──► create_ticket(total, purchaser)  │
//! │                 0 fulfilled lines ──► no ticket                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. REWRITE     cart := failed lines at their original quantities      │
//! │                 (nothing failed ──► empty cart)                        │
//! │                                                                         │
//! │  Result: PurchaseOutcome { ticket, products_failed }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Partial success
//! A line that cannot be fulfilled never aborts the purchase. Stock shortage,
//! a product deleted since it was carted, even a storage error on that one
//! line: the line lands in `products_failed` and the loop moves on. Only
//! failures outside the loop (loading the cart, issuing the ticket, rewriting
//! the cart) abort with an error.
//!
//! ## Reservation
//! `reduce_stock` is the single authority on reservation. The `has_stock`
//! call before it is advisory, skipping the write for lines that obviously
//! cannot be fulfilled; two concurrent purchases may both pass it, and the
//! conditional decrement then admits at most what stock covers.

use tracing::{debug, info, warn};

use tienda_core::{purchase_total, remaining_lines, FulfilledItem, Reconciliation, Ticket};
use tienda_db::Database;

use crate::error::{PurchaseError, PurchaseResult};
use crate::store::{CartStore, ProductStore, TicketStore};

/// Result of processing a purchase.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// The issued ticket, or `None` when no line could be fulfilled.
    pub ticket: Option<Ticket>,
    /// IDs of the products that could not be fulfilled, in cart order.
    pub products_failed: Vec<String>,
}

impl PurchaseOutcome {
    /// True when every line was fulfilled.
    pub fn is_complete(&self) -> bool {
        self.ticket.is_some() && self.products_failed.is_empty()
    }
}

/// The purchase pipeline, generic over its storage backends.
#[derive(Debug, Clone)]
pub struct PurchaseService<P, C, T> {
    products: P,
    carts: C,
    tickets: T,
}

/// PurchaseService wired to the SQLite repositories.
pub type SqlitePurchaseService = PurchaseService<
    tienda_db::ProductRepository,
    tienda_db::CartRepository,
    tienda_db::TicketRepository,
>;

impl SqlitePurchaseService {
    /// Builds the service from a database handle.
    pub fn from_database(db: &Database) -> Self {
        PurchaseService::new(db.products(), db.carts(), db.tickets())
    }
}

impl<P, C, T> PurchaseService<P, C, T>
where
    P: ProductStore,
    C: CartStore,
    T: TicketStore,
{
    /// Creates a new PurchaseService over the given stores.
    pub fn new(products: P, carts: C, tickets: T) -> Self {
        PurchaseService {
            products,
            carts,
            tickets,
        }
    }

    /// Runs the full pipeline for one cart.
    ///
    /// ## Errors
    /// * `PurchaseError::EmptyCart` - Cart missing or has no lines
    /// * `PurchaseError::Storage` - Failure outside the per-line loop
    pub async fn process_purchase(
        &self,
        cart_id: &str,
        purchaser: &str,
    ) -> PurchaseResult<PurchaseOutcome> {
        let cart = self
            .carts
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| PurchaseError::empty_cart(cart_id))?;

        if cart.is_empty() {
            return Err(PurchaseError::empty_cart(cart_id));
        }

        debug!(cart_id = %cart_id, lines = cart.items.len(), "Processing purchase");

        let reconciliation = self.reconcile(&cart.items).await;

        let ticket = self.issue_ticket(&reconciliation, purchaser).await?;

        let remainder = remaining_lines(&cart.items, &reconciliation.failed);
        self.carts.replace_items(cart_id, &remainder).await?;

        if let Some(ref t) = ticket {
            info!(
                cart_id = %cart_id,
                ticket_code = %t.code,
                amount = %t.amount(),
                failed = reconciliation.failed.len(),
                "Purchase complete"
            );
        } else {
            info!(
                cart_id = %cart_id,
                failed = reconciliation.failed.len(),
                "Purchase produced no ticket"
            );
        }

        Ok(PurchaseOutcome {
            ticket,
            products_failed: reconciliation.failed,
        })
    }

    /// Walks the cart lines in order, reserving stock where possible.
    ///
    /// Per-line failures of any kind are swallowed into the failed set;
    /// this method itself never fails.
    async fn reconcile(&self, lines: &[tienda_core::CartLine]) -> Reconciliation {
        let mut reconciliation = Reconciliation::default();

        for line in lines {
            match self.products.has_stock(&line.product_id, line.quantity).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(product_id = %line.product_id, quantity = line.quantity, "Insufficient stock");
                    reconciliation.failed.push(line.product_id.clone());
                    continue;
                }
                Err(e) => {
                    warn!(product_id = %line.product_id, error = %e, "Stock check failed");
                    reconciliation.failed.push(line.product_id.clone());
                    continue;
                }
            }

            // The check above can go stale under concurrency; the decrement
            // is the authority and may still refuse.
            match self.products.reduce_stock(&line.product_id, line.quantity).await {
                Ok(product) => {
                    reconciliation.fulfilled.push(FulfilledItem {
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                        unit_price_cents: product.price_cents,
                    });
                }
                Err(e) => {
                    warn!(product_id = %line.product_id, error = %e, "Stock reservation failed");
                    reconciliation.failed.push(line.product_id.clone());
                }
            }
        }

        reconciliation
    }

    /// Issues a ticket when at least one line was fulfilled.
    async fn issue_ticket(
        &self,
        reconciliation: &Reconciliation,
        purchaser: &str,
    ) -> PurchaseResult<Option<Ticket>> {
        if !reconciliation.any_fulfilled() {
            return Ok(None);
        }

        let total = purchase_total(&reconciliation.fulfilled);
        let ticket = self.tickets.create_ticket(total, purchaser).await?;

        Ok(Some(ticket))
    }
}

// =============================================================================
// Unit Tests (in-memory fakes)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tienda_core::{Cart, CartLine, Money, Product};
    use tienda_db::{DbError, DbResult};

    /// In-memory product store. Product IDs listed in `broken` error out of
    /// every call, standing in for a storage fault on that row.
    #[derive(Default)]
    struct FakeProducts {
        stock: Mutex<HashMap<String, (i64, i64)>>, // id -> (stock, price_cents)
        broken: Vec<String>,
    }

    impl FakeProducts {
        fn with(products: &[(&str, i64, i64)]) -> Self {
            let stock = products
                .iter()
                .map(|(id, stock, price)| (id.to_string(), (*stock, *price)))
                .collect();
            FakeProducts {
                stock: Mutex::new(stock),
                broken: Vec::new(),
            }
        }

        fn make_product(id: &str, stock: i64, price_cents: i64) -> Product {
            use tienda_core::NewProduct;
            let mut p = Product::new(NewProduct {
                code: format!("FAKE-{id}"),
                title: format!("Fake {id}"),
                description: None,
                price_cents,
                stock,
                category: "test".to_string(),
            })
            .unwrap();
            p.id = id.to_string();
            p
        }
    }

    impl ProductStore for FakeProducts {
        async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
            let stock = self.stock.lock().unwrap();
            Ok(stock.get(id).map(|(s, p)| Self::make_product(id, *s, *p)))
        }

        async fn has_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
            if self.broken.iter().any(|b| b == id) {
                return Err(DbError::Internal("disk on fire".to_string()));
            }
            let stock = self.stock.lock().unwrap();
            match stock.get(id) {
                Some((s, _)) => Ok(*s >= quantity),
                None => Err(DbError::not_found("Product", id)),
            }
        }

        async fn reduce_stock(&self, id: &str, quantity: i64) -> DbResult<Product> {
            let mut stock = self.stock.lock().unwrap();
            match stock.get_mut(id) {
                Some((s, p)) if *s >= quantity => {
                    *s -= quantity;
                    Ok(Self::make_product(id, *s, *p))
                }
                Some((s, _)) => Err(DbError::insufficient_stock(id, *s, quantity)),
                None => Err(DbError::not_found("Product", id)),
            }
        }
    }

    #[derive(Default)]
    struct FakeCarts {
        carts: Mutex<HashMap<String, Cart>>,
    }

    impl FakeCarts {
        fn with_cart(id: &str, lines: &[(&str, i64)]) -> Self {
            let now = chrono::Utc::now();
            let cart = Cart {
                id: id.to_string(),
                items: lines
                    .iter()
                    .map(|(pid, qty)| CartLine {
                        product_id: pid.to_string(),
                        quantity: *qty,
                    })
                    .collect(),
                created_at: now,
                updated_at: now,
            };
            let carts = Mutex::new(HashMap::from([(id.to_string(), cart)]));
            FakeCarts { carts }
        }

        fn items(&self, id: &str) -> Vec<CartLine> {
            self.carts.lock().unwrap().get(id).unwrap().items.clone()
        }
    }

    impl CartStore for FakeCarts {
        async fn get_cart(&self, id: &str) -> DbResult<Option<Cart>> {
            Ok(self.carts.lock().unwrap().get(id).cloned())
        }

        async fn replace_items(&self, cart_id: &str, items: &[CartLine]) -> DbResult<Cart> {
            let mut carts = self.carts.lock().unwrap();
            let cart = carts
                .get_mut(cart_id)
                .ok_or_else(|| DbError::not_found("Cart", cart_id))?;
            cart.items = items.to_vec();
            Ok(cart.clone())
        }
    }

    #[derive(Default)]
    struct FakeTickets {
        fail: bool,
        issued: Mutex<Vec<(i64, String)>>,
    }

    impl TicketStore for FakeTickets {
        async fn create_ticket(&self, amount: Money, purchaser: &str) -> DbResult<Ticket> {
            if self.fail {
                return Err(DbError::Internal("ticket table gone".to_string()));
            }
            self.issued
                .lock()
                .unwrap()
                .push((amount.cents(), purchaser.to_string()));
            Ok(Ticket {
                id: "t-1".to_string(),
                code: "TCK-TEST".to_string(),
                amount_cents: amount.cents(),
                purchaser: purchaser.to_string(),
                created_at: chrono::Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn test_all_lines_fulfilled() {
        let service = PurchaseService::new(
            FakeProducts::with(&[("a", 10, 1000), ("b", 5, 500)]),
            FakeCarts::with_cart("c-1", &[("a", 2), ("b", 3)]),
            FakeTickets::default(),
        );

        let outcome = service.process_purchase("c-1", "ana@example.com").await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.ticket.as_ref().unwrap().amount_cents, 2 * 1000 + 3 * 500);
        assert!(outcome.products_failed.is_empty());
        assert!(service.carts.items("c-1").is_empty());
    }

    #[tokio::test]
    async fn test_partial_fulfillment() {
        let service = PurchaseService::new(
            FakeProducts::with(&[("a", 5, 1000), ("b", 1, 500)]),
            FakeCarts::with_cart("c-1", &[("a", 2), ("b", 3)]),
            FakeTickets::default(),
        );

        let outcome = service.process_purchase("c-1", "ana@example.com").await.unwrap();
        assert_eq!(outcome.ticket.as_ref().unwrap().amount_cents, 2000);
        assert_eq!(outcome.products_failed, vec!["b".to_string()]);

        // Failed line stays at its original quantity
        assert_eq!(
            service.carts.items("c-1"),
            vec![CartLine { product_id: "b".to_string(), quantity: 3 }]
        );
    }

    #[tokio::test]
    async fn test_nothing_fulfilled_no_ticket() {
        let service = PurchaseService::new(
            FakeProducts::with(&[("a", 0, 1000)]),
            FakeCarts::with_cart("c-1", &[("a", 1), ("gone", 2)]),
            FakeTickets::default(),
        );

        let outcome = service.process_purchase("c-1", "ana@example.com").await.unwrap();
        assert!(outcome.ticket.is_none());
        assert_eq!(outcome.products_failed, vec!["a".to_string(), "gone".to_string()]);

        // Cart keeps every line, in order
        let items = service.carts.items("c-1");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, "a");
        assert_eq!(items[1].product_id, "gone");

        assert!(service.tickets.issued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_fault_on_one_line_is_swallowed() {
        let mut products = FakeProducts::with(&[("a", 10, 1000), ("b", 10, 500)]);
        products.broken = vec!["b".to_string()];

        let service = PurchaseService::new(
            products,
            FakeCarts::with_cart("c-1", &[("a", 1), ("b", 1)]),
            FakeTickets::default(),
        );

        let outcome = service.process_purchase("c-1", "ana@example.com").await.unwrap();
        assert_eq!(outcome.ticket.as_ref().unwrap().amount_cents, 1000);
        assert_eq!(outcome.products_failed, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty_cart() {
        let service = PurchaseService::new(
            FakeProducts::default(),
            FakeCarts::default(),
            FakeTickets::default(),
        );

        let err = service.process_purchase("missing", "ana@example.com").await.unwrap_err();
        assert!(matches!(err, PurchaseError::EmptyCart { .. }));
    }

    #[tokio::test]
    async fn test_cart_with_no_lines_is_rejected() {
        let service = PurchaseService::new(
            FakeProducts::default(),
            FakeCarts::with_cart("c-1", &[]),
            FakeTickets::default(),
        );

        let err = service.process_purchase("c-1", "ana@example.com").await.unwrap_err();
        assert!(matches!(err, PurchaseError::EmptyCart { .. }));
    }

    #[tokio::test]
    async fn test_ticket_store_failure_propagates() {
        let service = PurchaseService::new(
            FakeProducts::with(&[("a", 10, 1000)]),
            FakeCarts::with_cart("c-1", &[("a", 1)]),
            FakeTickets { fail: true, ..Default::default() },
        );

        let err = service.process_purchase("c-1", "ana@example.com").await.unwrap_err();
        assert!(matches!(err, PurchaseError::Storage(_)));

        // No rollback primitive: the reservation made before the ticket
        // insert failed stays in place, and the cart is left unrewritten.
        let stock = service.products.stock.lock().unwrap();
        assert_eq!(stock.get("a").unwrap().0, 9);
        drop(stock);
        assert_eq!(service.carts.items("c-1").len(), 1);
    }

    #[tokio::test]
    async fn test_ticket_amount_uses_price_at_purchase_time() {
        let service = PurchaseService::new(
            FakeProducts::with(&[("a", 10, 12345)]),
            FakeCarts::with_cart("c-1", &[("a", 2)]),
            FakeTickets::default(),
        );

        let outcome = service.process_purchase("c-1", "ana@example.com").await.unwrap();
        assert_eq!(outcome.ticket.unwrap().amount_cents, 24690);
    }
}
