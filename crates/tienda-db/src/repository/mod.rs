//! # Repository Module
//!
//! Database repository implementations for the tienda backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Service / Handler                                                     │
//! │       │                                                                 │
//! │       │  db.products().reduce_stock(id, 2)                             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── list(&self, query)                                                │
//! │  ├── has_stock(&self, id, quantity)                                    │
//! │  └── reduce_stock(&self, id, quantity)                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (mock the repository)                                  │
//! │  • SQL is isolated in one place                                        │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog CRUD, paged listing, stock ledger
//! - [`CartRepository`] - Cart and line-item operations
//! - [`TicketRepository`] - Immutable purchase tickets
//! - [`UserRepository`] - User accounts

pub mod cart;
pub mod product;
pub mod ticket;
pub mod user;

pub use cart::CartRepository;
pub use product::ProductRepository;
pub use ticket::TicketRepository;
pub use user::UserRepository;
