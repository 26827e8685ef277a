use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{optional_auth, require_auth, role_gate, RoleGate};
use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{auth, events, health_check, tickets, venues};
use crate::images::UPLOADS_ROUTE;
use crate::models::Role;
use crate::state::AppState;

const VENUE_OWNERS: RoleGate = RoleGate::allow(&[Role::VenueOwner]);
const ORGANIZERS: RoleGate = RoleGate::allow(&[Role::Organizer]);

/// Room for five images plus form fields.
const MAX_BODY_BYTES: usize = 5 * 5 * 1024 * 1024 + 64 * 1024;

/// API routes with their guards. Layers added later run first, so the
/// authentication layer is always added after the role gate.
pub fn api_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/venues/:id", get(venues::get_venue))
        .route("/events/:id", get(events::get_event))
        .route(
            "/tickets/:id",
            get(tickets::list_tickets).delete(tickets::delete_ticket),
        )
        .route("/tickets/user/:userId", get(tickets::user_tickets));

    let browsing = Router::new()
        .route("/venues", get(venues::list_venues))
        .route_layer(from_fn_with_state(state.verifier.clone(), optional_auth));

    let authenticated = Router::new()
        .route("/profile", get(auth::profile))
        .route("/venues/:id/reviews", post(venues::add_review))
        .route("/events", get(events::list_events))
        .route("/events/:id/reviews", post(events::add_review))
        .route("/tickets", post(tickets::create_ticket))
        .route("/my-events", get(events::my_events))
        .route_layer(from_fn_with_state(state.verifier.clone(), require_auth));

    let venue_owner = Router::new()
        .route("/venues", post(venues::create_venue))
        .route("/venues/:id/availability", put(venues::set_availability))
        .route("/events/:id/status", put(events::update_status))
        .route("/event/venue-requests", get(events::venue_requests))
        .route(
            "/vevent/:id/venue-request",
            patch(events::respond_to_venue_request),
        )
        .route("/my-venues", get(venues::my_venues))
        .route_layer(from_fn_with_state(VENUE_OWNERS, role_gate))
        .route_layer(from_fn_with_state(state.verifier.clone(), require_auth));

    let organizer = Router::new()
        .route("/events", post(events::create_event))
        .route_layer(from_fn_with_state(ORGANIZERS, role_gate))
        .route_layer(from_fn_with_state(state.verifier.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(browsing)
        .merge(authenticated)
        .merge(venue_owner)
        .merge(organizer)
        .with_state(state)
}

/// Full application: API routes, uploaded images and the HTTP layers.
pub fn create_routes(state: AppState, config: &Config) -> Router {
    api_routes(state)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
}
