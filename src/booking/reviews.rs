use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Event, Review, Venue};
use crate::utils::error::AppError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

impl ReviewRequest {
    pub fn into_review(self, user: Uuid, now: DateTime<Utc>) -> Result<Review, AppError> {
        let comment = self
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut missing = Vec::new();
        if self.rating.is_none() {
            missing.push("rating".to_string());
        }
        if comment.is_none() {
            missing.push("comment".to_string());
        }

        match (self.rating, comment) {
            (Some(rating), Some(comment)) => {
                if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                    return Err(AppError::ValidationError(format!(
                        "rating must be between {MIN_RATING} and {MAX_RATING}"
                    )));
                }
                Ok(Review {
                    user,
                    rating,
                    comment,
                    date: now,
                })
            }
            _ => Err(AppError::MissingFields(missing)),
        }
    }
}

/// Arithmetic mean of the ratings, or `None` for an empty list.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
    Some(sum / reviews.len() as f64)
}

/// Appends `review` and recomputes the venue rating.
pub fn add_venue_review(venue: &mut Venue, review: Review) {
    venue.updated_at = review.date;
    venue.reviews.push(review);
    if let Some(rating) = average_rating(&venue.reviews) {
        venue.rating = rating;
    }
}

pub fn add_event_review(event: &mut Event, review: Review) {
    event.updated_at = review.date;
    event.reviews.push(review);
}
