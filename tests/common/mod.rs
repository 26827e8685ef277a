#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use venuebook_server::auth::TokenService;
use venuebook_server::config::Config;
use venuebook_server::images::MemoryImageStore;
use venuebook_server::routes::create_routes;
use venuebook_server::state::AppState;
use venuebook_server::store::MemoryStore;

pub const JWT_SECRET: &str = "black-box-test-secret";
const BOUNDARY: &str = "venuebook-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub tokens: TokenService,
    pub images: Arc<MemoryImageStore>,
}

pub struct Account {
    pub id: String,
    pub token: String,
}

impl TestApp {
    /// Same router as production, backed by the in-memory stores.
    pub fn spawn() -> Self {
        let config = Config::from_lookup(|name| match name {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        })
        .expect("test config");

        let tokens = TokenService::new(JWT_SECRET, Duration::days(config.token_ttl_days));
        let images = Arc::new(MemoryImageStore::new());
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            images.clone(),
            tokens.clone(),
            config.bcrypt_cost,
        );

        Self {
            router: create_routes(state, &config),
            tokens,
            images,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn register(&self, name: &str, email: &str, role: &str) -> Account {
        let (status, body) = self
            .call(
                Method::POST,
                "/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "secret123",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        Account {
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a venue through the multipart endpoint and returns its id.
    pub async fn create_venue(&self, owner: &Account, capacity: i32, price_per_day: &str) -> String {
        let capacity = capacity.to_string();
        let (status, body) = self
            .send(multipart_request(
                "/venues",
                &owner.token,
                &[
                    ("name", "Harbor Hall"),
                    ("description", "Waterfront hall"),
                    ("location", "Pier 4"),
                    ("capacity", &capacity),
                    ("pricePerDay", price_per_day),
                    ("amenities", "wifi, parking"),
                ],
                &[],
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "venue creation failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

pub fn event_payload(venue: &str, attendees: i64, budget: i64) -> Value {
    json!({
        "title": "Launch party",
        "description": "Product launch",
        "venue": venue,
        "eventDate": "2027-06-01",
        "eventTime": "18:00",
        "expectedAttendees": attendees,
        "budget": budget,
        "category": "party",
        "price": 25,
    })
}

/// Builds a `multipart/form-data` request from text fields and
/// `(filename, content type, bytes)` image parts.
pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    images: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (filename, content_type, bytes) in images {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
