use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Review;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub capacity: i32,
    pub price_per_day: Decimal,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub is_available: bool,
    /// Mean of `reviews[*].rating`; maintained by the review aggregator.
    pub rating: f64,
    pub reviews: Vec<Review>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
