use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};

use clerky_core::domain::order::{Order, OrderId, OrderStatus};

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, status, order_date, total_amount_cents
             FROM orders
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(order_from_row).transpose()
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders (id, status, order_date, total_amount_cents)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                order_date = excluded.order_date,
                total_amount_cents = excluded.total_amount_cents",
        )
        .bind(&order.id.0)
        .bind(order.status.as_str())
        .bind(order.order_date.format("%Y-%m-%d").to_string())
        .bind(order.total_amount_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn order_from_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;

    Ok(Order {
        id: OrderId(row.try_get("id")?),
        status,
        order_date: parse_date("order_date", row.try_get("order_date")?)?,
        total_amount_cents: row.try_get("total_amount_cents")?,
    })
}

pub(crate) fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}
