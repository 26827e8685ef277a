//! Venue-request workflow.
//!
//! A venue request moves `pending -> approved` or `pending -> rejected` exactly
//! once. Only the owner of the requested venue may decide it, and the decision is
//! mirrored onto the event status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Event, EventStatus, ParseEnumError, Role, User};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl VenueRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueRequestStatus::Pending => "pending",
            VenueRequestStatus::Approved => "approved",
            VenueRequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VenueRequestStatus::Pending)
    }
}

impl fmt::Display for VenueRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VenueRequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VenueRequestStatus::Pending),
            "approved" => Ok(VenueRequestStatus::Approved),
            "rejected" => Ok(VenueRequestStatus::Rejected),
            other => Err(ParseEnumError::new("venue request status", other)),
        }
    }
}

/// The owner's answer to a venue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    fn request_status(self) -> VenueRequestStatus {
        match self {
            Decision::Approved => VenueRequestStatus::Approved,
            Decision::Rejected => VenueRequestStatus::Rejected,
        }
    }

    fn event_status(self) -> EventStatus {
        match self {
            Decision::Approved => EventStatus::Approved,
            Decision::Rejected => EventStatus::Rejected,
        }
    }
}

/// Approval sub-entity embedded in every event.
///
/// Fields are private so the status can only move through [`VenueRequest::decide`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueRequest {
    status: VenueRequestStatus,
    message: Option<String>,
    response: Option<String>,
    requested_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl VenueRequest {
    pub fn pending(message: Option<String>, requested_at: DateTime<Utc>) -> Self {
        Self {
            status: VenueRequestStatus::Pending,
            message,
            response: None,
            requested_at,
            responded_at: None,
        }
    }

    /// Rebuilds a request from persisted fields.
    pub fn restore(
        status: VenueRequestStatus,
        message: Option<String>,
        response: Option<String>,
        requested_at: DateTime<Utc>,
        responded_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status,
            message,
            response,
            requested_at,
            responded_at,
        }
    }

    pub fn status(&self) -> VenueRequestStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == VenueRequestStatus::Pending
    }

    /// Applies the only permitted transitions, `pending -> approved | rejected`.
    pub fn decide(
        &mut self,
        decision: Decision,
        response: String,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "Venue request has already been {}",
                self.status
            )));
        }

        self.status = decision.request_status();
        self.response = Some(response);
        self.responded_at = Some(now);
        Ok(())
    }
}

/// Runs a venue-request transition on behalf of `actor`.
///
/// On any error the event is left untouched.
pub fn decide_venue_request(
    actor: &User,
    event: &mut Event,
    decision: Decision,
    response: String,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if actor.role != Role::VenueOwner {
        return Err(AppError::Forbidden(
            "Only venue owners can respond to venue requests".to_string(),
        ));
    }
    if !actor.owns_venue(event.venue) {
        return Err(AppError::Forbidden(
            "You do not own the venue requested by this event".to_string(),
        ));
    }

    event.venue_request.decide(decision, response, now)?;
    event.status = decision.event_status();
    event.updated_at = now;
    Ok(())
}
