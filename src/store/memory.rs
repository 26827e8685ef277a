use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Event, Ticket, User, Venue};
use crate::store::{Store, StoreError, StoreResult};

/// In-process store with the same versioning semantics as Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    venues: HashMap<Uuid, Venue>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
}

trait Document: Clone {
    const ENTITY: &'static str;
    fn id(&self) -> Uuid;
    fn version(&self) -> i64;
    fn bump_version(&mut self);
}

macro_rules! document {
    ($ty:ty, $entity:literal) => {
        impl Document for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> Uuid {
                self.id
            }

            fn version(&self) -> i64 {
                self.version
            }

            fn bump_version(&mut self) {
                self.version += 1;
            }
        }
    };
}

document!(User, "user");
document!(Venue, "venue");
document!(Event, "event");

fn compare_and_swap<T: Document>(map: &mut HashMap<Uuid, T>, doc: &mut T) -> StoreResult<()> {
    let id = doc.id();
    let stored = map.get_mut(&id).ok_or(StoreError::Missing {
        entity: T::ENTITY,
        id,
    })?;

    if stored.version() != doc.version() {
        return Err(StoreError::Conflict {
            entity: T::ENTITY,
            id,
        });
    }

    doc.bump_version();
    *stored = doc.clone();
    Ok(())
}

/// Newest first, matching the Postgres ordering.
fn newest_first<T, F>(items: impl Iterator<Item = T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let email = user.email.to_lowercase();
        if guard.users.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(format!("user with email '{email}'")));
        }
        let mut stored = user.clone();
        stored.email = email;
        guard.users.insert(stored.id, stored);
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        let guard = self.inner.read().await;
        Ok(guard.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_owned_venue(&self, venue: &Venue) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let owner = guard.users.get_mut(&venue.owner).ok_or(StoreError::Missing {
            entity: User::ENTITY,
            id: venue.owner,
        })?;
        owner.venues.push(venue.id);
        owner.version += 1;
        owner.updated_at = Utc::now();

        guard.venues.insert(venue.id, venue.clone());
        Ok(())
    }

    async fn find_venue(&self, id: Uuid) -> StoreResult<Option<Venue>> {
        Ok(self.inner.read().await.venues.get(&id).cloned())
    }

    async fn list_venues(&self) -> StoreResult<Vec<Venue>> {
        let guard = self.inner.read().await;
        Ok(newest_first(guard.venues.values().cloned(), |v: &Venue| v.created_at))
    }

    async fn list_venues_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Venue>> {
        let guard = self.inner.read().await;
        Ok(newest_first(
            guard.venues.values().filter(|v| v.owner == owner).cloned(),
            |v: &Venue| v.created_at,
        ))
    }

    async fn update_venue(&self, venue: &mut Venue) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        compare_and_swap(&mut guard.venues, venue)
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        guard.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.inner.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let guard = self.inner.read().await;
        Ok(newest_first(guard.events.values().cloned(), |e: &Event| e.created_at))
    }

    async fn list_events_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let guard = self.inner.read().await;
        Ok(newest_first(
            guard.events.values().filter(|e| ids.contains(&e.id)).cloned(),
            |e: &Event| e.created_at,
        ))
    }

    async fn list_events_by_organizer(&self, organizer: Uuid) -> StoreResult<Vec<Event>> {
        let guard = self.inner.read().await;
        Ok(newest_first(
            guard
                .events
                .values()
                .filter(|e| e.organizer == organizer)
                .cloned(),
            |e: &Event| e.created_at,
        ))
    }

    async fn list_events_by_venues(&self, venues: &[Uuid]) -> StoreResult<Vec<Event>> {
        let guard = self.inner.read().await;
        Ok(newest_first(
            guard
                .events
                .values()
                .filter(|e| venues.contains(&e.venue))
                .cloned(),
            |e: &Event| e.created_at,
        ))
    }

    async fn update_event(&self, event: &mut Event) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        compare_and_swap(&mut guard.events, event)
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        guard.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let guard = self.inner.read().await;
        Ok(newest_first(guard.tickets.values().cloned(), |t: &Ticket| t.created_at))
    }

    async fn list_tickets_by_user(&self, user: Uuid) -> StoreResult<Vec<Ticket>> {
        let guard = self.inner.read().await;
        Ok(newest_first(
            guard.tickets.values().filter(|t| t.user == user).cloned(),
            |t: &Ticket| t.created_at,
        ))
    }

    async fn delete_ticket(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.tickets.remove(&id).is_some())
    }
}
