//! Booking domain rules: event validation, the venue-request workflow and review
//! aggregation. Nothing in here performs I/O.

pub mod reviews;
pub mod validator;
pub mod workflow;

pub use validator::{book, check_booking, EventDraft, EventRequest, EVENT_DURATION_DAYS};
pub use workflow::{decide_venue_request, Decision};
