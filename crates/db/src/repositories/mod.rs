use async_trait::async_trait;
use thiserror::Error;

use clerky_core::domain::order::{Order, OrderId};
use clerky_core::domain::product::{InventoryItem, ProductId};
use clerky_core::domain::ticket::{SupportTicket, TicketId};

pub mod inventory;
pub mod memory;
pub mod order;
pub mod ticket;

pub use inventory::SqlInventoryRepository;
pub use memory::{InMemoryInventoryRepository, InMemoryOrderRepository, InMemoryTicketRepository};
pub use order::SqlOrderRepository;
pub use ticket::SqlTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("row did not decode: {0}")]
    Decode(String),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn find_by_product_id(
        &self,
        id: &ProductId,
    ) -> Result<Option<InventoryItem>, RepositoryError>;
    async fn save(&self, item: InventoryItem) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<SupportTicket>, RepositoryError>;
    async fn save(&self, ticket: SupportTicket) -> Result<(), RepositoryError>;
    async fn list_open(&self) -> Result<Vec<SupportTicket>, RepositoryError>;
}
