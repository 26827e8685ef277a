use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub user: Uuid,
    pub rating: u8,
    pub comment: String,
    pub date: DateTime<Utc>,
}
