use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// An order as exposed to the order-status lookup. Amounts are integer
/// cents; rendering to a dollar string happens only at the tool edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub total_amount_cents: i64,
}

impl Order {
    pub fn total_amount_display(&self) -> String {
        format_cents(self.total_amount_cents)
    }
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_cents, Order, OrderId, OrderStatus};

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("backordered"), None);
    }

    #[test]
    fn parse_tolerates_case_and_whitespace() {
        assert_eq!(OrderStatus::parse("  Shipped "), Some(OrderStatus::Shipped));
    }

    #[test]
    fn totals_render_as_dollars() {
        let order = Order {
            id: OrderId("12345".to_string()),
            status: OrderStatus::Shipped,
            order_date: NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date"),
            total_amount_cents: 8999,
        };
        assert_eq!(order.total_amount_display(), "$89.99");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-1250), "-$12.50");
    }
}
