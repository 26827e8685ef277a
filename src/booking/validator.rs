//! Booking rules gating event creation.
//!
//! [`book`] is the only constructor for a new pending [`Event`]: every path that
//! creates an event goes through the same availability, capacity and budget
//! checks.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Event, EventStatus, Venue, VenueRequest};
use crate::utils::error::AppError;

/// Events are booked for a single day.
pub const EVENT_DURATION_DAYS: i64 = 1;

/// Event creation payload as received; every field is optional so that missing
/// ones can be reported together.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub venue: Option<Uuid>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<String>,
    pub expected_attendees: Option<i32>,
    pub budget: Option<Decimal>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    /// Note to the venue owner attached to the venue request.
    pub message: Option<String>,
}

/// An event request with every required field present.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub venue: Uuid,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub expected_attendees: i32,
    pub budget: Decimal,
    pub category: String,
    pub price: Decimal,
    pub message: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl EventRequest {
    /// Checks that every required field is present, naming all that are not.
    pub fn into_draft(self) -> Result<EventDraft, AppError> {
        let title = present(self.title);
        let description = present(self.description);
        let event_time = present(self.event_time);
        let category = present(self.category);

        let mut missing = Vec::new();
        let mut require = |name: &str, ok: bool| {
            if !ok {
                missing.push(name.to_string());
            }
        };
        require("title", title.is_some());
        require("description", description.is_some());
        require("venue", self.venue.is_some());
        require("eventDate", self.event_date.is_some());
        require("eventTime", event_time.is_some());
        require("expectedAttendees", self.expected_attendees.is_some());
        require("budget", self.budget.is_some());
        require("category", category.is_some());
        require("price", self.price.is_some());

        match (
            title,
            description,
            self.venue,
            self.event_date,
            event_time,
            self.expected_attendees,
            self.budget,
            category,
            self.price,
        ) {
            (
                Some(title),
                Some(description),
                Some(venue),
                Some(event_date),
                Some(event_time),
                Some(expected_attendees),
                Some(budget),
                Some(category),
                Some(price),
            ) => {
                if expected_attendees <= 0 {
                    return Err(AppError::ValidationError(
                        "expectedAttendees must be greater than zero".to_string(),
                    ));
                }
                if budget.is_sign_negative() || price.is_sign_negative() {
                    return Err(AppError::ValidationError(
                        "budget and price must not be negative".to_string(),
                    ));
                }
                Ok(EventDraft {
                    title,
                    description,
                    venue,
                    event_date,
                    event_time,
                    expected_attendees,
                    budget,
                    category,
                    price,
                    message: present(self.message),
                })
            }
            _ => Err(AppError::MissingFields(missing)),
        }
    }
}

/// Cost of holding `venue` for the booked duration.
pub fn required_budget(venue: &Venue) -> Decimal {
    venue.price_per_day * Decimal::from(EVENT_DURATION_DAYS)
}

/// Availability, capacity and budget rules, in that order.
pub fn check_booking(draft: &EventDraft, venue: &Venue) -> Result<(), AppError> {
    if !venue.is_available {
        return Err(AppError::VenueUnavailable(format!(
            "Venue '{}' is not available for booking",
            venue.name
        )));
    }

    if draft.expected_attendees > venue.capacity {
        return Err(AppError::CapacityExceeded {
            requested: draft.expected_attendees,
            capacity: venue.capacity,
        });
    }

    let required = required_budget(venue);
    if draft.budget < required {
        return Err(AppError::InsufficientBudget {
            budget: draft.budget,
            required,
        });
    }

    Ok(())
}

/// Validates `draft` against `venue` and produces the pending event.
pub fn book(
    organizer: Uuid,
    draft: EventDraft,
    venue: &Venue,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    if draft.venue != venue.id {
        return Err(AppError::InternalFailure(format!(
            "booking checked against venue {} but draft targets {}",
            venue.id, draft.venue
        )));
    }
    check_booking(&draft, venue)?;

    Ok(Event {
        id: Uuid::new_v4(),
        title: draft.title,
        description: draft.description,
        organizer,
        venue: venue.id,
        event_date: draft.event_date,
        event_time: draft.event_time,
        expected_attendees: draft.expected_attendees,
        budget: draft.budget,
        category: draft.category,
        price: draft.price,
        status: EventStatus::Pending,
        venue_request: VenueRequest::pending(draft.message, now),
        reviews: Vec::new(),
        version: 0,
        created_at: now,
        updated_at: now,
    })
}
