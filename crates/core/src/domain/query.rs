use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest query prefix carried into log records.
pub const QUERY_PREVIEW_CHARS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A customer query as received at the support boundary. Immutable after
/// construction; the submission timestamp is fixed at receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerQuery {
    pub text: String,
    pub customer_id: Option<CustomerId>,
    pub received_at: DateTime<Utc>,
}

impl CustomerQuery {
    pub fn new(text: impl Into<String>, customer_id: Option<CustomerId>) -> Self {
        Self { text: text.into(), customer_id, received_at: Utc::now() }
    }

    /// First [`QUERY_PREVIEW_CHARS`] characters of the query, for log lines
    /// that must stay bounded. Truncation respects char boundaries.
    pub fn preview(&self) -> &str {
        match self.text.char_indices().nth(QUERY_PREVIEW_CHARS) {
            Some((offset, _)) => &self.text[..offset],
            None => &self.text,
        }
    }

    pub fn customer_id_str(&self) -> Option<&str> {
        self.customer_id.as_ref().map(CustomerId::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomerId, CustomerQuery, QUERY_PREVIEW_CHARS};

    #[test]
    fn short_queries_preview_whole_text() {
        let query = CustomerQuery::new("Where is my order?", None);
        assert_eq!(query.preview(), "Where is my order?");
    }

    #[test]
    fn long_queries_preview_first_hundred_chars() {
        let query = CustomerQuery::new("x".repeat(500), None);
        assert_eq!(query.preview().chars().count(), QUERY_PREVIEW_CHARS);
    }

    #[test]
    fn preview_respects_multibyte_char_boundaries() {
        let query = CustomerQuery::new("é".repeat(150), None);
        let preview = query.preview();
        assert_eq!(preview.chars().count(), QUERY_PREVIEW_CHARS);
        assert!(query.text.is_char_boundary(preview.len()));
    }

    #[test]
    fn carries_optional_customer_identifier() {
        let query =
            CustomerQuery::new("refund status", Some(CustomerId("CUST_001".to_string())));
        assert_eq!(query.customer_id_str(), Some("CUST_001"));
    }
}
