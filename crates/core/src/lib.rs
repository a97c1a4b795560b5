pub mod config;
pub mod domain;
pub mod errors;
pub mod metrics;

pub use domain::order::{Order, OrderId, OrderStatus};
pub use domain::product::{InventoryItem, ProductCategory, ProductId};
pub use domain::query::{CustomerId, CustomerQuery};
pub use domain::ticket::{SupportTicket, TicketId, TicketPriority, TicketStatus};
pub use errors::DomainError;
pub use metrics::{MetricsRecorder, MetricsSnapshot, QueryOutcome};
