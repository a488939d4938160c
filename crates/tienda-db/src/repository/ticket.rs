//! # Ticket Repository
//!
//! Database operations for purchase tickets.
//!
//! A ticket is an immutable receipt: once written it is never updated or
//! deleted. The repository owns id, code, and timestamp generation so a
//! ticket cannot be created with caller-supplied identity.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tienda_core::{Money, Ticket};

const TICKET_COLUMNS: &str = "id, code, amount_cents, purchaser, created_at";

/// Repository for ticket database operations.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    /// Creates a ticket for a completed purchase.
    ///
    /// Generates the id, the human-readable code, and the timestamp.
    pub async fn create(&self, amount: Money, purchaser: &str) -> DbResult<Ticket> {
        let id = Uuid::new_v4().to_string();
        let code = generate_ticket_code();
        let now = Utc::now();

        debug!(code = %code, amount = %amount, purchaser = %purchaser, "Creating ticket");

        sqlx::query(
            r#"
            INSERT INTO tickets (id, code, amount_cents, purchaser, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(&code)
        .bind(amount.cents())
        .bind(purchaser)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Ticket {
            id,
            code,
            amount_cents: amount.cents(),
            purchaser: purchaser.to_string(),
            created_at: now,
        })
    }

    /// Gets a ticket by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");

        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Gets a ticket by its human-readable code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE code = ?1");

        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Lists tickets, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC LIMIT ?1"
        );

        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Lists a purchaser's tickets, newest first.
    pub async fn get_by_purchaser(&self, purchaser: &str) -> DbResult<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE purchaser = ?1 ORDER BY created_at DESC"
        );

        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .bind(purchaser)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Counts all tickets.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a ticket code like `TCK-20260829-1A2B3C4D`.
///
/// The date prefix keeps codes roughly sortable for humans; the uuid
/// fragment makes them unique.
fn generate_ticket_code() -> String {
    let date = Utc::now().format("%Y%m%d");
    let fragment = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TCK-{date}-{fragment}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.tickets();

        let ticket = repo
            .create(Money::from_cents(2500), "ana@example.com")
            .await
            .unwrap();
        assert_eq!(ticket.amount_cents, 2500);
        assert_eq!(ticket.purchaser, "ana@example.com");
        assert!(ticket.code.starts_with("TCK-"));

        let found = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(found.code, ticket.code);

        let by_code = repo.get_by_code(&ticket.code).await.unwrap().unwrap();
        assert_eq!(by_code.id, ticket.id);
    }

    #[tokio::test]
    async fn test_get_by_purchaser() {
        let db = test_db().await;
        let repo = db.tickets();

        repo.create(Money::from_cents(100), "a@example.com").await.unwrap();
        repo.create(Money::from_cents(200), "b@example.com").await.unwrap();
        repo.create(Money::from_cents(300), "a@example.com").await.unwrap();

        let tickets = repo.get_by_purchaser("a@example.com").await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.purchaser == "a@example.com"));

        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_codes_are_unique() {
        let codes: Vec<String> = (0..50).map(|_| generate_ticket_code()).collect();
        let mut deduped = codes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }
}
