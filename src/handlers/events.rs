use std::collections::BTreeSet;

use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::booking::reviews::{add_event_review, ReviewRequest};
use crate::booking::{self, decide_venue_request, Decision, EventRequest};
use crate::models::{Event, EventStatus, Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<EventStatus>,
}

#[derive(Debug, Deserialize)]
pub struct VenueRequestDecision {
    pub status: Option<Decision>,
    pub response: Option<String>,
}

async fn load_event(state: &AppState, id: Uuid) -> Result<Event, AppError> {
    state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with id '{id}' was not found")))
}

/// Events visible to `user`. Plain users see every event, or with
/// `only_ticketed` just the ones they hold tickets for.
async fn events_for(
    state: &AppState,
    user: &User,
    only_ticketed: bool,
) -> Result<Vec<Event>, AppError> {
    let events = match user.role {
        Role::Organizer => state.store.list_events_by_organizer(user.id).await?,
        Role::VenueOwner => state.store.list_events_by_venues(&user.venues).await?,
        Role::User if only_ticketed => {
            let ids: BTreeSet<Uuid> = state
                .store
                .list_tickets_by_user(user.id)
                .await?
                .into_iter()
                .map(|t| t.event)
                .collect();
            let ids: Vec<Uuid> = ids.into_iter().collect();
            state.store.list_events_by_ids(&ids).await?
        }
        Role::User => state.store.list_events().await?,
    };
    Ok(events)
}

/// Creates a pending event after the booking rules accept it.
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<EventRequest>,
) -> Result<Response, AppError> {
    let draft = payload.into_draft()?;
    let venue = state
        .store
        .find_venue(draft.venue)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Venue with id '{}' was not found", draft.venue)))?;

    let event = booking::book(user.id, draft, &venue, Utc::now())?;
    state.store.insert_event(&event).await?;

    tracing::info!(
        event_id = %event.id,
        venue_id = %venue.id,
        organizer = %user.id,
        "Event created, venue request pending"
    );
    Ok(created(event, "Event created and venue request sent"))
}

pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let events = events_for(&state, &user, false).await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn my_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let events = events_for(&state, &user, true).await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event = load_event(&state, id).await?;
    Ok(success(event, "Event retrieved successfully"))
}

/// Direct status override by the owner of the event's venue.
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<StatusRequest>,
) -> Result<Response, AppError> {
    let status = payload
        .status
        .ok_or_else(|| AppError::MissingFields(vec!["status".to_string()]))?;

    let mut event = load_event(&state, id).await?;
    if !user.owns_venue(event.venue) {
        return Err(AppError::Forbidden(
            "You do not own the venue of this event".to_string(),
        ));
    }

    event.status = status;
    event.updated_at = Utc::now();
    state.store.update_event(&mut event).await?;

    tracing::info!(event_id = %event.id, status = %status, "Event status updated");
    Ok(success(event, "Event status updated"))
}

pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ReviewRequest>,
) -> Result<Response, AppError> {
    let mut event = load_event(&state, id).await?;
    let review = payload.into_review(user.id, Utc::now())?;

    add_event_review(&mut event, review);
    state.store.update_event(&mut event).await?;

    Ok(created(event, "Review added successfully"))
}

/// Pending venue requests across the caller's venues.
pub async fn venue_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let pending: Vec<Event> = state
        .store
        .list_events_by_venues(&user.venues)
        .await?
        .into_iter()
        .filter(|e| e.venue_request.is_pending())
        .collect();
    Ok(success(pending, "Venue requests retrieved successfully"))
}

pub async fn respond_to_venue_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<VenueRequestDecision>,
) -> Result<Response, AppError> {
    let decision = payload
        .status
        .ok_or_else(|| AppError::MissingFields(vec!["status".to_string()]))?;

    let mut event = load_event(&state, id).await?;
    decide_venue_request(
        &user,
        &mut event,
        decision,
        payload.response.unwrap_or_default(),
        Utc::now(),
    )?;
    state.store.update_event(&mut event).await?;

    tracing::info!(
        event_id = %event.id,
        decision = %event.venue_request.status(),
        owner = %user.id,
        "Venue request decided"
    );
    Ok(success(event, "Venue request updated"))
}
