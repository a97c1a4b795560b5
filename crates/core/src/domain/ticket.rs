use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    /// Builds a ticket identifier from the given instant, format
    /// `TKT-YYYYMMDDHHMMSS`. Second resolution; two escalations inside the
    /// same second produce the same identifier and the store treats the
    /// write as an upsert.
    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(format!("TKT-{}", at.format("%Y%m%d%H%M%S")))
    }

    pub fn generate_now() -> Self {
        Self::generate(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// An escalation artifact. Tickets always enter the lifecycle at `Open`;
/// persistence belongs to the ticket store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: TicketId,
    pub customer_email: String,
    pub issue: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn open(
        id: TicketId,
        customer_email: impl Into<String>,
        issue: impl Into<String>,
        priority: TicketPriority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_email: customer_email.into(),
            issue: issue.into(),
            priority,
            status: TicketStatus::Open,
            created_at,
        }
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self.status, next),
            (TicketStatus::Open, TicketStatus::InProgress)
                | (TicketStatus::Open, TicketStatus::Resolved)
                | (TicketStatus::Open, TicketStatus::Closed)
                | (TicketStatus::InProgress, TicketStatus::Resolved)
                | (TicketStatus::InProgress, TicketStatus::Closed)
                | (TicketStatus::Resolved, TicketStatus::Closed)
                | (TicketStatus::Resolved, TicketStatus::Open)
                | (TicketStatus::Closed, TicketStatus::Open)
        )
    }

    pub fn transition_to(&mut self, next: TicketStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidTicketTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::errors::DomainError;

    use super::{SupportTicket, TicketId, TicketPriority, TicketStatus};

    fn ticket(status: TicketStatus) -> SupportTicket {
        let mut ticket = SupportTicket::open(
            TicketId("TKT-20240115103045".to_string()),
            "jane@example.com",
            "damaged item in order 12345",
            TicketPriority::High,
            Utc::now(),
        );
        ticket.status = status;
        ticket
    }

    #[test]
    fn id_is_timestamp_derived_with_tkt_prefix() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).single().expect("valid instant");
        assert_eq!(TicketId::generate(at).as_str(), "TKT-20240115103045");
    }

    #[test]
    fn ids_generated_in_the_same_second_collide() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).single().expect("valid instant");
        assert_eq!(TicketId::generate(at), TicketId::generate(at));
    }

    #[test]
    fn priority_round_trips_through_text() {
        for priority in [
            TicketPriority::Low,
            TicketPriority::Medium,
            TicketPriority::High,
            TicketPriority::Urgent,
        ] {
            assert_eq!(TicketPriority::parse(priority.as_str()), Some(priority));
        }
        assert_eq!(TicketPriority::parse("asap"), None);
    }

    #[test]
    fn tickets_start_open() {
        assert_eq!(ticket(TicketStatus::Open).status, TicketStatus::Open);
    }

    #[test]
    fn allows_valid_lifecycle_transition() {
        let mut ticket = ticket(TicketStatus::Open);
        ticket.transition_to(TicketStatus::InProgress).expect("open -> in_progress");
        ticket.transition_to(TicketStatus::Resolved).expect("in_progress -> resolved");
        assert_eq!(ticket.status, TicketStatus::Resolved);
    }

    #[test]
    fn blocks_invalid_lifecycle_transition() {
        let mut ticket = ticket(TicketStatus::Closed);
        let error =
            ticket.transition_to(TicketStatus::Resolved).expect_err("closed -> resolved fails");
        assert!(matches!(error, DomainError::InvalidTicketTransition { .. }));
    }

    #[test]
    fn closed_tickets_can_be_reopened() {
        let mut ticket = ticket(TicketStatus::Closed);
        ticket.transition_to(TicketStatus::Open).expect("closed -> open");
        assert_eq!(ticket.status, TicketStatus::Open);
    }
}
