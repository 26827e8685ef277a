use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgQueryResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    Event, EventSnapshot, ParseEnumError, Review, Ticket, TicketPricing, User, Venue,
    VenueRequest,
};
use crate::store::{Store, StoreError, StoreResult};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, venues, version, created_at, updated_at";

const VENUE_COLUMNS: &str = "id, owner, name, description, location, capacity, price_per_day, \
     amenities, images, is_available, rating, reviews, version, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, title, description, organizer, venue, event_date, event_time, \
     expected_attendees, budget, category, price, status, venue_request_status, \
     venue_request_message, venue_request_response, venue_requested_at, venue_responded_at, \
     reviews, version, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, user_id, event_id, quantity, total_amount, event_details, \
     ticket_details, qr_code, status, created_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    venues: Vec<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct VenueRow {
    id: Uuid,
    owner: Uuid,
    name: String,
    description: String,
    location: String,
    capacity: i32,
    price_per_day: Decimal,
    amenities: Vec<String>,
    images: Vec<String>,
    is_available: bool,
    rating: f64,
    reviews: Json<Vec<Review>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    organizer: Uuid,
    venue: Uuid,
    event_date: NaiveDate,
    event_time: String,
    expected_attendees: i32,
    budget: Decimal,
    category: String,
    price: Decimal,
    status: String,
    venue_request_status: String,
    venue_request_message: Option<String>,
    venue_request_response: Option<String>,
    venue_requested_at: DateTime<Utc>,
    venue_responded_at: Option<DateTime<Utc>>,
    reviews: Json<Vec<Review>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    user_id: Uuid,
    event_id: Uuid,
    quantity: i32,
    total_amount: Decimal,
    event_details: Json<EventSnapshot>,
    ticket_details: Json<TicketPricing>,
    qr_code: String,
    status: String,
    created_at: DateTime<Utc>,
}

fn corrupt(err: ParseEnumError) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(corrupt)?,
            venues: row.venues,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<VenueRow> for Venue {
    fn from(row: VenueRow) -> Self {
        Venue {
            id: row.id,
            owner: row.owner,
            name: row.name,
            description: row.description,
            location: row.location,
            capacity: row.capacity,
            price_per_day: row.price_per_day,
            amenities: row.amenities,
            images: row.images,
            is_available: row.is_available,
            rating: row.rating,
            reviews: row.reviews.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            organizer: row.organizer,
            venue: row.venue,
            event_date: row.event_date,
            event_time: row.event_time,
            expected_attendees: row.expected_attendees,
            budget: row.budget,
            category: row.category,
            price: row.price,
            status: row.status.parse().map_err(corrupt)?,
            venue_request: VenueRequest::restore(
                row.venue_request_status.parse().map_err(corrupt)?,
                row.venue_request_message,
                row.venue_request_response,
                row.venue_requested_at,
                row.venue_responded_at,
            ),
            reviews: row.reviews.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            user: row.user_id,
            event: row.event_id,
            quantity: row.quantity,
            total_amount: row.total_amount,
            event_details: row.event_details.0,
            ticket_details: row.ticket_details.0,
            qr_code: row.qr_code,
            status: row.status.parse().map_err(corrupt)?,
            created_at: row.created_at,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn map_insert_error(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(what())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }

    /// Turns a zero-row conditional update into `Missing` or `Conflict`.
    async fn check_update(
        &self,
        result: PgQueryResult,
        table: &str,
        entity: &'static str,
        id: Uuid,
    ) -> StoreResult<()> {
        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: bool =
            sqlx::query_scalar(&format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"))
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Err(StoreError::Conflict { entity, id })
        } else {
            Err(StoreError::Missing { entity, id })
        }
    }

    async fn fetch_venues(&self, owner: Option<Uuid>) -> StoreResult<Vec<Venue>> {
        let filter = if owner.is_some() { "WHERE owner = $1" } else { "" };
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues {filter} ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, VenueRow>(&sql);
        if let Some(owner) = owner {
            query = query.bind(owner);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Venue::from).collect())
    }

    /// `condition` may reference the id array as `$1`.
    async fn fetch_events(&self, condition: Option<&str>, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let filter = condition.map(|c| format!("WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events {filter} ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, EventRow>(&sql);
        if condition.is_some() {
            query = query.bind(ids);
        }
        let rows = query.fetch_all(&self.pool).await?;
        collect(rows)
    }

    async fn fetch_tickets(&self, user: Option<Uuid>) -> StoreResult<Vec<Ticket>> {
        let filter = if user.is_some() { "WHERE user_id = $1" } else { "" };
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets {filter} ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, TicketRow>(&sql);
        if let Some(user) = user {
            query = query.bind(user);
        }
        let rows = query.fetch_all(&self.pool).await?;
        collect(rows)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let email = user.email.to_lowercase();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, venues, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.venues)
        .bind(user.version)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, || format!("user with email '{email}'")))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email.to_lowercase())
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert_owned_venue(&self, venue: &Venue) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let appended = sqlx::query(
            "UPDATE users SET venues = array_append(venues, $2), version = version + 1, \
             updated_at = now() WHERE id = $1",
        )
        .bind(venue.owner)
        .bind(venue.id)
        .execute(&mut *tx)
        .await?;

        // Returning early drops `tx`, which rolls it back.
        if appended.rows_affected() == 0 {
            return Err(StoreError::Missing {
                entity: "user",
                id: venue.owner,
            });
        }

        sqlx::query(&format!(
            "INSERT INTO venues ({VENUE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(venue.id)
        .bind(venue.owner)
        .bind(&venue.name)
        .bind(&venue.description)
        .bind(&venue.location)
        .bind(venue.capacity)
        .bind(venue.price_per_day)
        .bind(&venue.amenities)
        .bind(&venue.images)
        .bind(venue.is_available)
        .bind(venue.rating)
        .bind(Json(venue.reviews.clone()))
        .bind(venue.version)
        .bind(venue.created_at)
        .bind(venue.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_venue(&self, id: Uuid) -> StoreResult<Option<Venue>> {
        let row: Option<VenueRow> =
            sqlx::query_as(&format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Venue::from))
    }

    async fn list_venues(&self) -> StoreResult<Vec<Venue>> {
        self.fetch_venues(None).await
    }

    async fn list_venues_by_owner(&self, owner: Uuid) -> StoreResult<Vec<Venue>> {
        self.fetch_venues(Some(owner)).await
    }

    async fn update_venue(&self, venue: &mut Venue) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE venues SET name = $3, description = $4, location = $5, capacity = $6, \
             price_per_day = $7, amenities = $8, images = $9, is_available = $10, rating = $11, \
             reviews = $12, updated_at = $13, version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(venue.id)
        .bind(venue.version)
        .bind(&venue.name)
        .bind(&venue.description)
        .bind(&venue.location)
        .bind(venue.capacity)
        .bind(venue.price_per_day)
        .bind(&venue.amenities)
        .bind(&venue.images)
        .bind(venue.is_available)
        .bind(venue.rating)
        .bind(Json(venue.reviews.clone()))
        .bind(venue.updated_at)
        .execute(&self.pool)
        .await?;

        self.check_update(result, "venues", "venue", venue.id).await?;
        venue.version += 1;
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let request = &event.venue_request;
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
             $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.organizer)
        .bind(event.venue)
        .bind(event.event_date)
        .bind(&event.event_time)
        .bind(event.expected_attendees)
        .bind(event.budget)
        .bind(&event.category)
        .bind(event.price)
        .bind(event.status.as_str())
        .bind(request.status().as_str())
        .bind(request.message())
        .bind(request.response())
        .bind(request.requested_at())
        .bind(request.responded_at())
        .bind(Json(event.reviews.clone()))
        .bind(event.version)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Event::try_from).transpose()
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.fetch_events(None, &[]).await
    }

    async fn list_events_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        self.fetch_events(Some("id = ANY($1)"), ids).await
    }

    async fn list_events_by_organizer(&self, organizer: Uuid) -> StoreResult<Vec<Event>> {
        self.fetch_events(Some("organizer = ANY($1)"), &[organizer])
            .await
    }

    async fn list_events_by_venues(&self, venues: &[Uuid]) -> StoreResult<Vec<Event>> {
        self.fetch_events(Some("venue = ANY($1)"), venues).await
    }

    async fn update_event(&self, event: &mut Event) -> StoreResult<()> {
        let request = &event.venue_request;
        let result = sqlx::query(
            "UPDATE events SET title = $3, description = $4, event_date = $5, event_time = $6, \
             expected_attendees = $7, budget = $8, category = $9, price = $10, status = $11, \
             venue_request_status = $12, venue_request_message = $13, \
             venue_request_response = $14, venue_responded_at = $15, reviews = $16, \
             updated_at = $17, version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(event.id)
        .bind(event.version)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(&event.event_time)
        .bind(event.expected_attendees)
        .bind(event.budget)
        .bind(&event.category)
        .bind(event.price)
        .bind(event.status.as_str())
        .bind(request.status().as_str())
        .bind(request.message())
        .bind(request.response())
        .bind(request.responded_at())
        .bind(Json(event.reviews.clone()))
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        self.check_update(result, "events", "event", event.id).await?;
        event.version += 1;
        Ok(())
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO tickets ({TICKET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(ticket.id)
        .bind(ticket.user)
        .bind(ticket.event)
        .bind(ticket.quantity)
        .bind(ticket.total_amount)
        .bind(Json(ticket.event_details.clone()))
        .bind(Json(ticket.ticket_details.clone()))
        .bind(&ticket.qr_code)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_tickets(&self) -> StoreResult<Vec<Ticket>> {
        self.fetch_tickets(None).await
    }

    async fn list_tickets_by_user(&self, user: Uuid) -> StoreResult<Vec<Ticket>> {
        self.fetch_tickets(Some(user)).await
    }

    async fn delete_ticket(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
