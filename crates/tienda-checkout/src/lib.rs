//! # tienda-checkout: Purchase Pipeline for the tienda backend
//!
//! Runs a cart through the purchase flow against the stock ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        tienda Purchase Flow                             │
//! │                                                                         │
//! │  Caller (API handler, CLI, ...)                                        │
//! │       │                                                                 │
//! │       │  service.process_purchase(cart_id, purchaser)                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tienda-checkout (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   PurchaseService<P, C, T>                                      │   │
//! │  │   ├── reconcile: reserve stock per line, swallow line failures │   │
//! │  │   ├── issue:     ticket iff ≥1 line fulfilled                  │   │
//! │  │   └── rewrite:   cart := unfulfilled remainder                 │   │
//! │  │                                                                 │   │
//! │  │   ProductStore / CartStore / TicketStore traits                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  tienda-core (pure math)            tienda-db (SQLite)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tienda_checkout::SqlitePurchaseService;
//! use tienda_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//! let service = SqlitePurchaseService::from_database(&db);
//!
//! let outcome = service.process_purchase(&cart_id, "ana@example.com").await?;
//! match outcome.ticket {
//!     Some(ticket) => println!("charged {}", ticket.amount()),
//!     None => println!("nothing could be fulfilled"),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod service;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{PurchaseError, PurchaseResult};
pub use service::{PurchaseOutcome, PurchaseService, SqlitePurchaseService};
pub use store::{CartStore, ProductStore, TicketStore};
