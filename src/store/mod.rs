//! Document persistence behind a trait, so handlers never see the backend.
//!
//! Users, venues and events carry a `version` counter. `update_*` writes only if
//! the stored version still equals the one that was read, then bumps it;
//! otherwise it fails with [`StoreError::Conflict`] and writes nothing.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, Ticket, User, Venue};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: &'static str, id: Uuid },

    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: Uuid },

    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { entity, .. } => AppError::Conflict(format!(
                "The {entity} was modified by another request; reload and try again"
            )),
            StoreError::Missing { entity, id } => {
                AppError::NotFound(format!("{entity} with id '{id}' was not found"))
            }
            StoreError::Duplicate(what) => AppError::ValidationError(format!("{what} already exists")),
            StoreError::Corrupt(msg) => AppError::InternalFailure(msg),
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is already registered.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Emails are stored lowercased; `email` is matched case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Inserts the venue and appends it to `venue.owner`'s owned-venue list as one
    /// write. Fails with [`StoreError::Missing`] when the owner does not exist, in
    /// which case nothing is written.
    async fn insert_owned_venue(&self, venue: &Venue) -> StoreResult<()>;
    async fn find_venue(&self, id: Uuid) -> StoreResult<Option<Venue>>;
    async fn list_venues(&self) -> StoreResult<Vec<Venue>>;
    async fn list_venues_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Venue>>;
    async fn update_venue(&self, venue: &mut Venue) -> StoreResult<()>;

    async fn insert_event(&self, event: &Event) -> StoreResult<()>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn list_events(&self) -> StoreResult<Vec<Event>>;
    async fn list_events_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>>;
    async fn list_events_by_organizer(&self, organizer: Uuid) -> StoreResult<Vec<Event>>;
    async fn list_events_by_venues(&self, venues: &[Uuid]) -> StoreResult<Vec<Event>>;
    async fn update_event(&self, event: &mut Event) -> StoreResult<()>;

    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<()>;
    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>>;
    async fn list_tickets_by_user(&self, user: Uuid) -> StoreResult<Vec<Ticket>>;
    /// Returns `false` when no ticket had that id.
    async fn delete_ticket(&self, id: Uuid) -> StoreResult<bool>;
}
