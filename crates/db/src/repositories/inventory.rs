use sqlx::{sqlite::SqliteRow, Row};

use clerky_core::domain::product::{InventoryItem, ProductId};

use super::order::parse_date;
use super::{InventoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InventoryRepository for SqlInventoryRepository {
    async fn find_by_product_id(
        &self,
        id: &ProductId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let row = sqlx::query(
            "SELECT product_id, name, quantity, next_restock_date
             FROM inventory
             WHERE product_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(item_from_row).transpose()
    }

    async fn save(&self, item: InventoryItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO inventory (product_id, name, quantity, next_restock_date)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                quantity = excluded.quantity,
                next_restock_date = excluded.next_restock_date",
        )
        .bind(&item.product_id.0)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.next_restock_date.map(|date| date.format("%Y-%m-%d").to_string()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn item_from_row(row: SqliteRow) -> Result<InventoryItem, RepositoryError> {
    let next_restock_date = row
        .try_get::<Option<String>, _>("next_restock_date")?
        .map(|value| parse_date("next_restock_date", value))
        .transpose()?;

    Ok(InventoryItem {
        product_id: ProductId(row.try_get("product_id")?),
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        next_restock_date,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use clerky_core::domain::product::{InventoryItem, ProductId};

    use super::SqlInventoryRepository;
    use crate::repositories::InventoryRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn sql_inventory_repo_round_trip() {
        let pool = setup().await;
        let repo = SqlInventoryRepository::new(pool);
        let item = InventoryItem {
            product_id: ProductId("ABC-100".to_string()),
            name: "Standing Desk".to_string(),
            quantity: 0,
            next_restock_date: NaiveDate::from_ymd_opt(2024, 2, 1),
        };

        repo.save(item.clone()).await.expect("save item");
        let found = repo.find_by_product_id(&item.product_id).await.expect("find item");

        assert_eq!(found, Some(item));
    }

    #[tokio::test]
    async fn restock_date_is_optional() {
        let pool = setup().await;
        let repo = SqlInventoryRepository::new(pool);
        let item = InventoryItem {
            product_id: ProductId("XYZ".to_string()),
            name: "Wireless Headphones".to_string(),
            quantity: 12,
            next_restock_date: None,
        };

        repo.save(item.clone()).await.expect("save item");
        let found =
            repo.find_by_product_id(&item.product_id).await.expect("find item").expect("present");

        assert_eq!(found.next_restock_date, None);
        assert!(found.in_stock());
    }

    #[tokio::test]
    async fn missing_product_reads_back_as_none() {
        let pool = setup().await;
        let repo = SqlInventoryRepository::new(pool);

        let found =
            repo.find_by_product_id(&ProductId("NOPE".to_string())).await.expect("lookup");
        assert_eq!(found, None);
    }
}
