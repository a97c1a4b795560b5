use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo rows behind the `clerky seed` command.
const SEED_ORDERS: &[SeedOrderContract] = &[
    SeedOrderContract {
        order_id: "12345",
        status: "shipped",
        order_date: "2024-01-10",
        total_amount_cents: 8999,
        description: "Shipped order referenced by the sample queries",
    },
    SeedOrderContract {
        order_id: "67890",
        status: "processing",
        order_date: "2024-01-14",
        total_amount_cents: 29999,
        description: "Order still in fulfilment",
    },
    SeedOrderContract {
        order_id: "24680",
        status: "delivered",
        order_date: "2023-12-18",
        total_amount_cents: 4550,
        description: "Delivered order outside the return window",
    },
];

const SEED_INVENTORY: &[SeedInventoryContract] = &[
    SeedInventoryContract {
        product_id: "PROD-XYZ",
        name: "Wireless Headphones",
        quantity: 15,
        next_restock_date: None,
        description: "In-stock product",
    },
    SeedInventoryContract {
        product_id: "PROD-ABC",
        name: "Standing Desk",
        quantity: 0,
        next_restock_date: Some("2024-02-01"),
        description: "Out of stock with a restock date",
    },
    SeedInventoryContract {
        product_id: "PROD-DEF",
        name: "USB-C Dock",
        quantity: 3,
        next_restock_date: None,
        description: "Low-stock product",
    },
];

/// Demo seed dataset for the support desk.
///
/// Deterministic fixtures covering the three lookup tools: orders across the
/// lifecycle, inventory both in and out of stock. Tickets are intentionally
/// absent so escalation tests always start from an empty ticket store.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo seed dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let orders_seeded = SEED_ORDERS
            .iter()
            .map(|order| SeedRowInfo { id: order.order_id, description: order.description })
            .collect::<Vec<_>>();
        let inventory_seeded = SEED_INVENTORY
            .iter()
            .map(|item| SeedRowInfo { id: item.product_id, description: item.description })
            .collect::<Vec<_>>();

        Ok(SeedResult { orders_seeded, inventory_seeded })
    }

    /// Check every contract row against the database, one labelled probe each.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for order in SEED_ORDERS {
            let row_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?1 AND status = ?2 AND order_date = ?3 AND total_amount_cents = ?4)",
            )
            .bind(order.order_id)
            .bind(order.status)
            .bind(order.order_date)
            .bind(order.total_amount_cents)
            .fetch_one(pool)
            .await?;
            checks.push((order.label(), row_ok == 1));
        }

        for item in SEED_INVENTORY {
            let row_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM inventory WHERE product_id = ?1 AND name = ?2 AND quantity = ?3 AND next_restock_date IS ?4)",
            )
            .bind(item.product_id)
            .bind(item.name)
            .bind(item.quantity)
            .bind(item.next_restock_date)
            .fetch_one(pool)
            .await?;
            checks.push((item.label(), row_ok == 1));
        }

        // Seeding never writes tickets, but the escalation store must exist.
        let tickets_table: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = 'tickets'",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("tickets-table", tickets_table == 1));

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows again, leaving other data untouched.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let order_ids = SEED_ORDERS.iter().map(|order| order.order_id).collect::<Vec<_>>();
        let product_ids = SEED_INVENTORY.iter().map(|item| item.product_id).collect::<Vec<_>>();
        let quoted_orders = sql_id_list(&order_ids);
        let quoted_products = sql_id_list(&product_ids);

        sqlx::query(&format!("DELETE FROM orders WHERE id IN {quoted_orders}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM inventory WHERE product_id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedOrderContract {
    order_id: &'static str,
    status: &'static str,
    order_date: &'static str,
    total_amount_cents: i64,
    description: &'static str,
}

impl SeedOrderContract {
    fn label(&self) -> &'static str {
        match self.order_id {
            "12345" => "order-12345",
            "67890" => "order-67890",
            _ => "order-24680",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedInventoryContract {
    product_id: &'static str,
    name: &'static str,
    quantity: i64,
    next_restock_date: Option<&'static str>,
    description: &'static str,
}

impl SeedInventoryContract {
    fn label(&self) -> &'static str {
        match self.product_id {
            "PROD-XYZ" => "inventory-prod-xyz",
            "PROD-ABC" => "inventory-prod-abc",
            _ => "inventory-prod-def",
        }
    }
}

fn sql_id_list(ids: &[&str]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
    format!("({})", quoted.join(", "))
}

#[derive(Debug)]
pub struct SeedResult {
    pub orders_seeded: Vec<SeedRowInfo>,
    pub inventory_seeded: Vec<SeedRowInfo>,
}

#[derive(Debug)]
pub struct SeedRowInfo {
    pub id: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    /// Labels of the checks that found no matching row.
    pub fn missing(&self) -> Vec<&'static str> {
        self.checks.iter().filter_map(|(check, present)| (!present).then_some(*check)).collect()
    }
}

#[cfg(test)]
mod tests {
    use clerky_core::domain::order::{OrderId, OrderStatus};
    use clerky_core::domain::product::ProductId;

    use super::*;
    use crate::repositories::{
        InventoryRepository, OrderRepository, SqlInventoryRepository, SqlOrderRepository,
    };
    use crate::{connect_with_settings, migrations};

    /// Fresh private in-memory database per test, so parallel tests never
    /// observe each other's rows.
    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("open test database");
        migrations::run_pending(&pool).await.expect("apply migrations");
        pool
    }

    #[test]
    fn bundled_sql_covers_every_contract_row() {
        for order in SEED_ORDERS {
            assert!(DemoSeedDataset::SQL.contains(order.order_id));
        }
        for item in SEED_INVENTORY {
            assert!(DemoSeedDataset::SQL.contains(item.product_id));
        }
    }

    #[test]
    fn missing_names_only_failed_checks() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![
                ("order-12345", true),
                ("inventory-prod-abc", false),
                ("tickets-table", false),
            ],
        };

        assert_eq!(verification.missing(), vec!["inventory-prod-abc", "tickets-table"]);
    }

    #[tokio::test]
    async fn seeding_twice_verifies_identically() {
        let pool = migrated_pool().await;

        let first = DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        let initial = DemoSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(initial.all_present, "every contract row exists after the first load");
        assert_eq!(first.orders_seeded.len(), 3);
        assert_eq!(first.inventory_seeded.len(), 3);

        let second = DemoSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let repeat = DemoSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(repeat.all_present);
        assert_eq!(second.orders_seeded.len(), 3);
        assert_eq!(initial.checks, repeat.checks, "reloading leaves the verification unchanged");
    }

    #[tokio::test]
    async fn seeded_rows_decode_through_repositories() {
        let pool = migrated_pool().await;
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");

        let orders = SqlOrderRepository::new(pool.clone());
        let shipped = orders
            .find_by_id(&OrderId("12345".to_string()))
            .await
            .expect("find seeded order")
            .expect("order 12345 is seeded");
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.total_amount_cents, 8999);
        assert_eq!(shipped.total_amount_display(), "$89.99");

        let inventory = SqlInventoryRepository::new(pool.clone());
        let desk = inventory
            .find_by_product_id(&ProductId("PROD-ABC".to_string()))
            .await
            .expect("find seeded item")
            .expect("PROD-ABC is seeded");
        assert!(!desk.in_stock());
        assert_eq!(
            desk.next_restock_date.map(|date| date.to_string()),
            Some("2024-02-01".to_string())
        );
    }

    #[tokio::test]
    async fn clean_removes_seeded_rows() {
        let pool = migrated_pool().await;
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");

        DemoSeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let order_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM orders")
            .fetch_one(&pool)
            .await
            .expect("count orders");
        let item_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM inventory")
            .fetch_one(&pool)
            .await
            .expect("count inventory");
        assert_eq!(order_count, 0);
        assert_eq!(item_count, 0);
    }
}
