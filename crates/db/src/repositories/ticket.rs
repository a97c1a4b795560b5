use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use clerky_core::domain::ticket::{SupportTicket, TicketId, TicketPriority, TicketStatus};

use super::{RepositoryError, TicketRepository};
use crate::DbPool;

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TicketRepository for SqlTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<SupportTicket>, RepositoryError> {
        let row = sqlx::query(
            "SELECT ticket_id, customer_email, issue, priority, status, created_at
             FROM tickets
             WHERE ticket_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ticket_from_row).transpose()
    }

    async fn save(&self, ticket: SupportTicket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tickets (ticket_id, customer_email, issue, priority, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(ticket_id) DO UPDATE SET
                customer_email = excluded.customer_email,
                issue = excluded.issue,
                priority = excluded.priority,
                status = excluded.status,
                created_at = excluded.created_at",
        )
        .bind(&ticket.id.0)
        .bind(&ticket.customer_email)
        .bind(&ticket.issue)
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<SupportTicket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT ticket_id, customer_email, issue, priority, status, created_at
             FROM tickets
             WHERE status = 'open'
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ticket_from_row).collect()
    }
}

fn ticket_from_row(row: SqliteRow) -> Result<SupportTicket, RepositoryError> {
    let priority_raw = row.try_get::<String, _>("priority")?;
    let priority = TicketPriority::parse(&priority_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown ticket priority `{priority_raw}`"))
    })?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = TicketStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown ticket status `{status_raw}`")))?;

    Ok(SupportTicket {
        id: TicketId(row.try_get("ticket_id")?),
        customer_email: row.try_get("customer_email")?,
        issue: row.try_get("issue")?,
        priority,
        status,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    match DateTime::parse_from_rfc3339(&value) {
        Ok(timestamp) => Ok(timestamp.with_timezone(&Utc)),
        Err(error) => Err(RepositoryError::Decode(format!(
            "column `{column}` holds a non-rfc3339 timestamp `{value}`: {error}"
        ))),
    }
}
