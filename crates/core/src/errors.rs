use thiserror::Error;

use crate::domain::ticket::TicketStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid ticket transition from {from:?} to {to:?}")]
    InvalidTicketTransition { from: TicketStatus, to: TicketStatus },
}
