use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{CurrentUser, MaybeUser};
use crate::booking::reviews::{add_venue_review, ReviewRequest};
use crate::models::{Role, User, Venue};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{created, success};

pub const MAX_VENUE_IMAGES: usize = 5;

/// Text fields and image parts collected from a venue multipart form.
#[derive(Debug, Default)]
struct VenueForm {
    name: Option<String>,
    description: Option<String>,
    location: Option<String>,
    capacity: Option<String>,
    price_per_day: Option<String>,
    amenities: Vec<String>,
    images: Vec<(String, Bytes)>,
}

impl VenueForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = VenueForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "images" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        continue;
                    }
                    form.images.push((content_type, bytes));
                    if form.images.len() > MAX_VENUE_IMAGES {
                        return Err(AppError::ValidationError(format!(
                            "A venue can have at most {MAX_VENUE_IMAGES} images"
                        )));
                    }
                }
                "amenities" => {
                    let text = field.text().await?;
                    form.amenities.extend(
                        text.split(',')
                            .map(str::trim)
                            .filter(|a| !a.is_empty())
                            .map(str::to_string),
                    );
                }
                other => {
                    let text = field.text().await?.trim().to_string();
                    let value = (!text.is_empty()).then_some(text);
                    match other {
                        "name" => form.name = value,
                        "description" => form.description = value,
                        "location" => form.location = value,
                        "capacity" => form.capacity = value,
                        "pricePerDay" => form.price_per_day = value,
                        _ => tracing::debug!(field = other, "Ignoring unknown venue form field"),
                    }
                }
            }
        }

        Ok(form)
    }
}

/// Venue fields after presence and range checks; images not yet stored.
struct VenueDraft {
    name: String,
    description: String,
    location: String,
    capacity: i32,
    price_per_day: Decimal,
    amenities: Vec<String>,
    images: Vec<(String, Bytes)>,
}

impl TryFrom<VenueForm> for VenueDraft {
    type Error = AppError;

    fn try_from(form: VenueForm) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("name", &form.name),
            ("description", &form.description),
            ("location", &form.location),
            ("capacity", &form.capacity),
            ("pricePerDay", &form.price_per_day),
        ] {
            if value.is_none() {
                missing.push(field.to_string());
            }
        }

        let (Some(name), Some(description), Some(location), Some(capacity), Some(price)) = (
            form.name,
            form.description,
            form.location,
            form.capacity,
            form.price_per_day,
        ) else {
            return Err(AppError::MissingFields(missing));
        };

        let capacity: i32 = capacity
            .parse()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                AppError::ValidationError("capacity must be a positive whole number".to_string())
            })?;
        let price_per_day: Decimal = price
            .parse()
            .ok()
            .filter(|p: &Decimal| !p.is_sign_negative())
            .ok_or_else(|| {
                AppError::ValidationError("pricePerDay must be a non-negative number".to_string())
            })?;

        Ok(VenueDraft {
            name,
            description,
            location,
            capacity,
            price_per_day,
            amenities: form.amenities,
            images: form.images,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub is_available: Option<bool>,
}

async fn load_venue(state: &AppState, id: Uuid) -> Result<Venue, AppError> {
    state
        .store
        .find_venue(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Venue with id '{id}' was not found")))
}

fn ensure_owner(user: &User, venue: &Venue) -> Result<(), AppError> {
    if user.owns_venue(venue.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You do not own this venue".to_string()))
    }
}

/// Best-effort removal of images saved for a venue that was never written.
async fn discard_images(state: &AppState, urls: &[String]) {
    for url in urls {
        if let Err(e) = state.images.discard(url).await {
            tracing::warn!(url = %url, error = %e, "Failed to discard orphaned venue image");
        }
    }
}

pub async fn create_venue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let draft = VenueDraft::try_from(VenueForm::read(multipart?).await?)?;

    let mut images = Vec::with_capacity(draft.images.len());
    for (content_type, bytes) in draft.images {
        match state.images.save(&content_type, bytes).await {
            Ok(url) => images.push(url),
            Err(e) => {
                discard_images(&state, &images).await;
                return Err(e);
            }
        }
    }

    let now = Utc::now();
    let venue = Venue {
        id: Uuid::new_v4(),
        owner: user.id,
        name: draft.name,
        description: draft.description,
        location: draft.location,
        capacity: draft.capacity,
        price_per_day: draft.price_per_day,
        amenities: draft.amenities,
        images,
        is_available: true,
        rating: 0.0,
        reviews: Vec::new(),
        version: 0,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.store.insert_owned_venue(&venue).await {
        discard_images(&state, &venue.images).await;
        return Err(e.into());
    }
    tracing::info!(venue_id = %venue.id, owner = %user.id, "Venue created");

    Ok(created(venue, "Venue created successfully"))
}

pub async fn list_venues(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, AppError> {
    let venues = match user {
        Some(user) if user.role == Role::VenueOwner => {
            state.store.list_venues_by_owner(user.id).await?
        }
        _ => state.store.list_venues().await?,
    };
    Ok(success(venues, "Venues retrieved successfully"))
}

pub async fn get_venue(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let venue = load_venue(&state, id).await?;
    Ok(success(venue, "Venue retrieved successfully"))
}

impl AvailabilityRequest {
    /// An empty body asks for a toggle; anything else must be a valid request.
    fn parse(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self { is_available: None });
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::ValidationError(format!("Invalid availability body: {e}")))
    }
}

/// Sets `isAvailable` when the body names it, otherwise flips the flag.
pub async fn set_availability(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut venue = load_venue(&state, id).await?;
    ensure_owner(&user, &venue)?;
    let requested = AvailabilityRequest::parse(&body)?.is_available;

    venue.is_available = requested.unwrap_or(!venue.is_available);
    venue.updated_at = Utc::now();
    state.store.update_venue(&mut venue).await?;

    tracing::info!(venue_id = %venue.id, is_available = venue.is_available, "Venue availability changed");
    Ok(success(venue, "Venue availability updated"))
}

pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ReviewRequest>,
) -> Result<Response, AppError> {
    let mut venue = load_venue(&state, id).await?;
    let review = payload.into_review(user.id, Utc::now())?;

    add_venue_review(&mut venue, review);
    state.store.update_venue(&mut venue).await?;

    Ok(created(venue, "Review added successfully"))
}

pub async fn my_venues(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let venues = state.store.list_venues_by_owner(user.id).await?;
    Ok(success(venues, "Venues retrieved successfully"))
}
