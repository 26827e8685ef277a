use std::collections::HashMap;

use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::{Event, EventSnapshot, Ticket, TicketPricing, TicketStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Default, Deserialize)]
pub struct EventDetailsRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetailsRequest {
    pub ticket_type: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub event: Option<Uuid>,
    pub quantity: Option<i32>,
    pub total_amount: Option<Decimal>,
    pub event_details: Option<EventDetailsRequest>,
    pub ticket_details: Option<TicketDetailsRequest>,
}

/// A ticket with its event document attached.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketWithEvent {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub event_info: Option<Event>,
}

struct TicketDraft {
    event: Uuid,
    quantity: i32,
    total_amount: Decimal,
    event_details: EventSnapshot,
    ticket_details: TicketPricing,
}

/// Records `name` as missing when `value` is absent or blank.
fn take(value: Option<String>, name: &str, missing: &mut Vec<String>) -> Option<String> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value.is_none() {
        missing.push(name.to_string());
    }
    value
}

impl TicketRequest {
    fn into_draft(self) -> Result<TicketDraft, AppError> {
        let mut missing = Vec::new();
        if self.event.is_none() {
            missing.push("event".to_string());
        }
        if self.quantity.is_none() {
            missing.push("quantity".to_string());
        }
        if self.total_amount.is_none() {
            missing.push("totalAmount".to_string());
        }

        let details = self.event_details.unwrap_or_default();
        let title = take(details.title, "eventDetails.title", &mut missing);
        let date = take(details.date, "eventDetails.date", &mut missing);
        let time = take(details.time, "eventDetails.time", &mut missing);
        let venue = take(details.venue, "eventDetails.venue", &mut missing);

        let pricing = self.ticket_details.unwrap_or_default();
        let ticket_type = take(pricing.ticket_type, "ticketDetails.ticketType", &mut missing);
        if pricing.price.is_none() {
            missing.push("ticketDetails.price".to_string());
        }

        let (
            Some(event),
            Some(quantity),
            Some(total_amount),
            Some(title),
            Some(date),
            Some(time),
            Some(venue),
            Some(ticket_type),
            Some(price),
        ) = (
            self.event,
            self.quantity,
            self.total_amount,
            title,
            date,
            time,
            venue,
            ticket_type,
            pricing.price,
        )
        else {
            return Err(AppError::MissingFields(missing));
        };

        if quantity < 1 {
            return Err(AppError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        if total_amount.is_sign_negative() || price.is_sign_negative() {
            return Err(AppError::ValidationError(
                "amounts must not be negative".to_string(),
            ));
        }

        Ok(TicketDraft {
            event,
            quantity,
            total_amount,
            event_details: EventSnapshot {
                title,
                date,
                time,
                venue,
            },
            ticket_details: TicketPricing { ticket_type, price },
        })
    }
}

pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<TicketRequest>,
) -> Result<Response, AppError> {
    let draft = payload.into_draft()?;
    if state.store.find_event(draft.event).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Event with id '{}' was not found",
            draft.event
        )));
    }

    let id = Uuid::new_v4();
    let ticket = Ticket {
        id,
        user: user.id,
        event: draft.event,
        quantity: draft.quantity,
        total_amount: draft.total_amount,
        event_details: draft.event_details,
        ticket_details: draft.ticket_details,
        qr_code: Ticket::qr_payload(id, draft.event, user.id),
        status: TicketStatus::Active,
        created_at: Utc::now(),
    };
    state.store.insert_ticket(&ticket).await?;

    tracing::info!(ticket_id = %ticket.id, event_id = %ticket.event, user_id = %user.id, "Ticket issued");
    Ok(created(ticket, "Ticket created successfully"))
}

// The id segment is accepted but not used: this lists every ticket.
pub async fn list_tickets(
    State(state): State<AppState>,
    AppPath(_id): AppPath<String>,
) -> Result<Response, AppError> {
    let tickets = state.store.list_tickets().await?;
    Ok(success(tickets, "Tickets retrieved successfully"))
}

pub async fn user_tickets(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let tickets = state.store.list_tickets_by_user(user_id).await?;

    let mut event_ids: Vec<Uuid> = tickets.iter().map(|t| t.event).collect();
    event_ids.sort();
    event_ids.dedup();
    let events: HashMap<Uuid, Event> = state
        .store
        .list_events_by_ids(&event_ids)
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    let joined: Vec<TicketWithEvent> = tickets
        .into_iter()
        .map(|ticket| TicketWithEvent {
            event_info: events.get(&ticket.event).cloned(),
            ticket,
        })
        .collect();

    Ok(success(joined, "Tickets retrieved successfully"))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    if !state.store.delete_ticket(id).await? {
        return Err(AppError::NotFound(format!(
            "Ticket with id '{id}' was not found"
        )));
    }
    tracing::info!(ticket_id = %id, "Ticket deleted");
    Ok(empty_success("Ticket deleted successfully"))
}
