//! Integration tests for the purchase pipeline against real SQLite storage.
//!
//! Each test runs on a fresh in-memory database with migrations applied.

use tienda_checkout::{PurchaseError, SqlitePurchaseService};
use tienda_core::{CartLine, NewProduct, Product};
use tienda_db::{Database, DbConfig};

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn insert_product(db: &Database, code: &str, price_cents: i64, stock: i64) -> Product {
    let product = Product::new(NewProduct {
        code: code.to_string(),
        title: format!("Product {code}"),
        description: None,
        price_cents,
        stock,
        category: "test".to_string(),
    })
    .unwrap();
    db.products().insert(&product).await.unwrap();
    product
}

async fn cart_with(db: &Database, lines: &[(&str, i64)]) -> String {
    let cart = db.carts().create().await.unwrap();
    for (product_id, quantity) in lines {
        db.carts()
            .add_product(&cart.id, product_id, *quantity)
            .await
            .unwrap();
    }
    cart.id
}

#[tokio::test]
async fn full_purchase_issues_ticket_and_clears_cart() {
    let db = test_db().await;
    let a = insert_product(&db, "A-1", 1000, 5).await;
    let b = insert_product(&db, "B-1", 500, 5).await;
    let cart_id = cart_with(&db, &[(&a.id, 2), (&b.id, 1)]).await;

    let service = SqlitePurchaseService::from_database(&db);
    let outcome = service.process_purchase(&cart_id, "ana@example.com").await.unwrap();

    let ticket = outcome.ticket.expect("ticket should be issued");
    assert_eq!(ticket.amount_cents, 2500);
    assert_eq!(ticket.purchaser, "ana@example.com");
    assert!(outcome.products_failed.is_empty());

    // Cart fully cleared, stock decremented
    let cart = db.carts().get_by_id(&cart_id).await.unwrap().unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 3);
    assert_eq!(db.products().get_by_id(&b.id).await.unwrap().unwrap().stock, 4);

    // Ticket is persisted and findable
    let found = db.tickets().get_by_code(&ticket.code).await.unwrap().unwrap();
    assert_eq!(found.amount_cents, 2500);
}

#[tokio::test]
async fn partial_purchase_keeps_failed_line_at_original_quantity() {
    let db = test_db().await;
    let a = insert_product(&db, "A-1", 1000, 5).await;
    let b = insert_product(&db, "B-1", 500, 1).await;
    let cart_id = cart_with(&db, &[(&a.id, 2), (&b.id, 3)]).await;

    let service = SqlitePurchaseService::from_database(&db);
    let outcome = service.process_purchase(&cart_id, "ana@example.com").await.unwrap();

    // Only A was charged
    assert_eq!(outcome.ticket.unwrap().amount_cents, 2000);
    assert_eq!(outcome.products_failed, vec![b.id.clone()]);

    // B stays in the cart at quantity 3, its stock untouched
    let cart = db.carts().get_by_id(&cart_id).await.unwrap().unwrap();
    assert_eq!(cart.items, vec![CartLine { product_id: b.id.clone(), quantity: 3 }]);
    assert_eq!(db.products().get_by_id(&b.id).await.unwrap().unwrap().stock, 1);
    assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 3);
}

#[tokio::test]
async fn no_ticket_when_nothing_can_be_fulfilled() {
    let db = test_db().await;
    let a = insert_product(&db, "A-1", 1000, 0).await;
    let cart_id = cart_with(&db, &[(&a.id, 1)]).await;

    let service = SqlitePurchaseService::from_database(&db);
    let outcome = service.process_purchase(&cart_id, "ana@example.com").await.unwrap();

    assert!(outcome.ticket.is_none());
    assert_eq!(outcome.products_failed, vec![a.id.clone()]);

    // Cart unchanged, no ticket row written
    let cart = db.carts().get_by_id(&cart_id).await.unwrap().unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(db.tickets().count().await.unwrap(), 0);
}

#[tokio::test]
async fn deleted_product_line_fails_without_aborting() {
    let db = test_db().await;
    let a = insert_product(&db, "A-1", 1000, 5).await;
    let ghost = insert_product(&db, "GHOST-1", 700, 5).await;
    let cart_id = cart_with(&db, &[(&a.id, 1), (&ghost.id, 1)]).await;

    // Product removed from the catalog while still carted
    db.products().delete(&ghost.id).await.unwrap();

    let service = SqlitePurchaseService::from_database(&db);
    let outcome = service.process_purchase(&cart_id, "ana@example.com").await.unwrap();

    assert_eq!(outcome.ticket.unwrap().amount_cents, 1000);
    assert_eq!(outcome.products_failed, vec![ghost.id.clone()]);

    let cart = db.carts().get_by_id(&cart_id).await.unwrap().unwrap();
    assert_eq!(cart.items, vec![CartLine { product_id: ghost.id.clone(), quantity: 1 }]);
}

#[tokio::test]
async fn empty_and_missing_carts_are_rejected() {
    let db = test_db().await;
    let service = SqlitePurchaseService::from_database(&db);

    let cart = db.carts().create().await.unwrap();
    let err = service.process_purchase(&cart.id, "ana@example.com").await.unwrap_err();
    assert!(matches!(err, PurchaseError::EmptyCart { .. }));

    let err = service.process_purchase("missing", "ana@example.com").await.unwrap_err();
    assert!(matches!(err, PurchaseError::EmptyCart { .. }));
}

#[tokio::test]
async fn ticket_charges_price_at_purchase_time() {
    let db = test_db().await;
    let mut a = insert_product(&db, "A-1", 1000, 5).await;
    let cart_id = cart_with(&db, &[(&a.id, 2)]).await;

    // Price changes after carting; the ticket uses the current price
    a.price_cents = 1500;
    db.products().update(&a).await.unwrap();

    let service = SqlitePurchaseService::from_database(&db);
    let outcome = service.process_purchase(&cart_id, "ana@example.com").await.unwrap();

    assert_eq!(outcome.ticket.unwrap().amount_cents, 3000);
}

#[tokio::test]
async fn concurrent_purchases_never_oversell() {
    let db = test_db().await;
    let a = insert_product(&db, "A-1", 1000, 1).await;

    let cart_1 = cart_with(&db, &[(&a.id, 1)]).await;
    let cart_2 = cart_with(&db, &[(&a.id, 1)]).await;

    let service_1 = SqlitePurchaseService::from_database(&db);
    let service_2 = SqlitePurchaseService::from_database(&db);

    let purchaser = "race@example.com";
    let (r1, r2) = tokio::join!(
        service_1.process_purchase(&cart_1, purchaser),
        service_2.process_purchase(&cart_2, purchaser),
    );
    let (o1, o2) = (r1.unwrap(), r2.unwrap());

    // Exactly one purchase wins the single unit
    let tickets = [o1.ticket.is_some(), o2.ticket.is_some()];
    assert_eq!(tickets.iter().filter(|t| **t).count(), 1);

    // Stock never goes negative
    assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 0);
    assert_eq!(db.tickets().count().await.unwrap(), 1);
}
