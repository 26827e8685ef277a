use thiserror::Error;

pub mod event;
pub mod review;
pub mod ticket;
pub mod user;
pub mod venue;

pub use event::{Event, EventStatus, VenueRequest, VenueRequestStatus};
pub use review::Review;
pub use ticket::{EventSnapshot, Ticket, TicketPricing, TicketStatus};
pub use user::{Role, User};
pub use venue::Venue;

/// A stored status or role string that does not name a known variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
