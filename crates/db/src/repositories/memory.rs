use std::collections::HashMap;

use tokio::sync::RwLock;

use clerky_core::domain::order::{Order, OrderId};
use clerky_core::domain::product::{InventoryItem, ProductId};
use clerky_core::domain::ticket::{SupportTicket, TicketId, TicketStatus};

use super::{InventoryRepository, OrderRepository, RepositoryError, TicketRepository};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInventoryRepository {
    items: RwLock<HashMap<String, InventoryItem>>,
}

#[async_trait::async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn find_by_product_id(
        &self,
        id: &ProductId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned())
    }

    async fn save(&self, item: InventoryItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.product_id.0.clone(), item);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<String, SupportTicket>>,
}

#[async_trait::async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<SupportTicket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.get(&id.0).cloned())
    }

    async fn save(&self, ticket: SupportTicket) -> Result<(), RepositoryError> {
        let mut tickets = self.tickets.write().await;
        tickets.insert(ticket.id.0.clone(), ticket);
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<SupportTicket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        let mut open: Vec<SupportTicket> = tickets
            .values()
            .filter(|ticket| ticket.status == TicketStatus::Open)
            .cloned()
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use clerky_core::domain::order::{Order, OrderId, OrderStatus};
    use clerky_core::domain::product::{InventoryItem, ProductId};
    use clerky_core::domain::ticket::{SupportTicket, TicketId, TicketPriority, TicketStatus};

    use crate::repositories::{
        InMemoryInventoryRepository, InMemoryOrderRepository, InMemoryTicketRepository,
        InventoryRepository, OrderRepository, TicketRepository,
    };

    #[tokio::test]
    async fn in_memory_order_repo_round_trip() {
        let repo = InMemoryOrderRepository::default();
        let order = Order {
            id: OrderId("12345".to_string()),
            status: OrderStatus::Shipped,
            order_date: NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date"),
            total_amount_cents: 8999,
        };

        repo.save(order.clone()).await.expect("save order");
        let found = repo.find_by_id(&order.id).await.expect("find order");

        assert_eq!(found, Some(order));
    }

    #[tokio::test]
    async fn in_memory_inventory_repo_round_trip() {
        let repo = InMemoryInventoryRepository::default();
        let item = InventoryItem {
            product_id: ProductId("XYZ".to_string()),
            name: "Wireless Headphones".to_string(),
            quantity: 12,
            next_restock_date: None,
        };

        repo.save(item.clone()).await.expect("save item");
        let found = repo.find_by_product_id(&item.product_id).await.expect("find item");

        assert_eq!(found, Some(item));
    }

    #[tokio::test]
    async fn in_memory_ticket_repo_filters_open_tickets() {
        let repo = InMemoryTicketRepository::default();
        let open = SupportTicket::open(
            TicketId("TKT-20240115103045".to_string()),
            "jane@example.com",
            "damaged item",
            TicketPriority::High,
            Utc::now(),
        );
        let mut closed = SupportTicket::open(
            TicketId("TKT-20240115103046".to_string()),
            "sam@example.com",
            "resolved already",
            TicketPriority::Low,
            Utc::now(),
        );
        closed.transition_to(TicketStatus::Closed).expect("open -> closed");

        repo.save(open.clone()).await.expect("save open");
        repo.save(closed).await.expect("save closed");

        let listed = repo.list_open().await.expect("list open");
        assert_eq!(listed, vec![open]);
    }
}
