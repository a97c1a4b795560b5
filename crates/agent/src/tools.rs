//! The support desk toolbox offered to the model on every delegation.
//!
//! Tools answer with JSON payloads in both directions: a hit carries
//! `"found": true` plus the record fields, a business miss carries an
//! `"error"` message the model is expected to relay in its own words. `Err`
//! from [`Tool::execute`] is reserved for infrastructure failure (the store
//! is unreachable) and aborts the whole delegation.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use clerky_core::{OrderId, ProductCategory, ProductId, SupportTicket, TicketId, TicketPriority};
use clerky_db::repositories::{InventoryRepository, OrderRepository, TicketRepository};

pub const INVALID_PRIORITY_ERROR: &str =
    "priority must be one of: low, medium, high, urgent";

/// One model-invocable capability: a name and JSON schema for the tools
/// array, and an executor over a parsed argument object.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<Value>;
}

/// Tools keyed by name. Iteration order is the map order, so the rendered
/// tools array is stable across runs.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The full support desk: order status, return policy, inventory, and
    /// ticket creation, backed by the given stores.
    pub fn support_desk(
        orders: Arc<dyn OrderRepository>,
        inventory: Arc<dyn InventoryRepository>,
        tickets: Arc<dyn TicketRepository>,
    ) -> Self {
        let mut registry = Self::default();
        registry.register(CheckOrderStatus { orders });
        registry.register(CheckReturnPolicy);
        registry.register(CheckInventory { inventory });
        registry.register(CreateSupportTicket { tickets });
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Renders the chat-completions `tools` array.
    pub fn chat_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    }
                })
            })
            .collect()
    }
}

struct CheckOrderStatus {
    orders: Arc<dyn OrderRepository>,
}

#[async_trait]
impl Tool for CheckOrderStatus {
    fn name(&self) -> &'static str {
        "check_order_status"
    }

    fn description(&self) -> &'static str {
        "Look up the current status, order date, and total of an order by its order ID."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": {
                    "type": "string",
                    "description": "The customer's order number"
                }
            },
            "required": ["order_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let Some(order_id) = input.get("order_id").and_then(Value::as_str) else {
            return Ok(json!({ "error": "order_id is required" }));
        };

        let order = self.orders.find_by_id(&OrderId(order_id.to_string())).await?;
        Ok(match order {
            Some(order) => json!({
                "found": true,
                "order_id": order.id.0,
                "status": order.status.as_str(),
                "order_date": order.order_date.to_string(),
                "total_amount": order.total_amount_display(),
            }),
            None => json!({ "error": "Order not found" }),
        })
    }
}

struct CheckReturnPolicy;

#[async_trait]
impl Tool for CheckReturnPolicy {
    fn name(&self) -> &'static str {
        "check_return_policy"
    }

    fn description(&self) -> &'static str {
        "Get the return policy for a product category such as electronics, clothing, or furniture."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product_type": {
                    "type": "string",
                    "description": "The product category to look up"
                }
            },
            "required": ["product_type"]
        })
    }

    // Unknown categories fall back to the standard policy, so this tool
    // always succeeds.
    async fn execute(&self, input: Value) -> Result<Value> {
        let product_type = input.get("product_type").and_then(Value::as_str).unwrap_or_default();
        Ok(json!({
            "found": true,
            "product_type": product_type,
            "policy": ProductCategory::policy_for(product_type),
        }))
    }
}

struct CheckInventory {
    inventory: Arc<dyn InventoryRepository>,
}

#[async_trait]
impl Tool for CheckInventory {
    fn name(&self) -> &'static str {
        "check_inventory"
    }

    fn description(&self) -> &'static str {
        "Check whether a product is in stock, its quantity, and the next restock date."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product_id": {
                    "type": "string",
                    "description": "The product identifier"
                }
            },
            "required": ["product_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let Some(product_id) = input.get("product_id").and_then(Value::as_str) else {
            return Ok(json!({ "error": "product_id is required" }));
        };

        let item = self.inventory.find_by_product_id(&ProductId(product_id.to_string())).await?;
        Ok(match item {
            Some(item) => json!({
                "found": true,
                "product_id": item.product_id.0,
                "name": item.name,
                "in_stock": item.in_stock(),
                "quantity": item.quantity,
                "next_restock": item.next_restock_date.map(|date| date.to_string()),
            }),
            None => json!({ "error": "Product not found" }),
        })
    }
}

struct CreateSupportTicket {
    tickets: Arc<dyn TicketRepository>,
}

#[async_trait]
impl Tool for CreateSupportTicket {
    fn name(&self) -> &'static str {
        "create_support_ticket"
    }

    fn description(&self) -> &'static str {
        "Create a support ticket so a human can follow up on an issue the agent cannot resolve."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_email": {
                    "type": "string",
                    "description": "Email address to reach the customer"
                },
                "issue": {
                    "type": "string",
                    "description": "Short description of the problem"
                },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high", "urgent"],
                    "description": "Ticket priority, defaults to medium"
                }
            },
            "required": ["customer_email", "issue"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let Some(customer_email) = input.get("customer_email").and_then(Value::as_str) else {
            return Ok(json!({ "error": "customer_email is required" }));
        };
        let Some(issue) = input.get("issue").and_then(Value::as_str) else {
            return Ok(json!({ "error": "issue is required" }));
        };

        let priority_value = input.get("priority").and_then(Value::as_str).unwrap_or("medium");
        let Some(priority) = TicketPriority::parse(priority_value) else {
            return Ok(json!({ "error": INVALID_PRIORITY_ERROR }));
        };

        let now = Utc::now();
        let ticket =
            SupportTicket::open(TicketId::generate(now), customer_email, issue, priority, now);
        let ticket_id = ticket.id.clone();
        self.tickets.save(ticket).await?;

        Ok(json!({
            "found": true,
            "ticket_id": ticket_id.0,
            "confirmation": format!(
                "Support ticket {} created. Our team will respond within 24 hours.",
                ticket_id.0
            ),
        }))
    }
}
