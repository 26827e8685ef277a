mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{event_payload, multipart_request, TestApp};

#[tokio::test]
async fn event_within_capacity_and_budget_is_pending() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 50, 500)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["venueRequest"]["status"], "pending");
    assert_eq!(body["data"]["organizer"], organizer.id.as_str());
    assert_eq!(body["data"]["venue"], venue.as_str());
}

#[tokio::test]
async fn capacity_is_checked_and_nothing_is_persisted() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 150, 1000)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CAPACITY_EXCEEDED");
    assert_eq!(body["error"]["details"]["expectedAttendees"], "150");
    assert_eq!(body["error"]["details"]["capacity"], "100");

    let (status, body) = app
        .call(Method::GET, "/events", Some(&organizer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn budget_must_cover_the_venue_fee() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 50, 300)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_BUDGET");
    assert_eq!(body["error"]["details"]["budget"], "300");
    assert_eq!(body["error"]["details"]["required"], "400");
}

#[tokio::test]
async fn unavailable_and_unknown_venues_are_refused() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    // No body flips the flag.
    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/venues/{venue}/availability"),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isAvailable"], false);

    let (status, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 50, 500)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VENUE_UNAVAILABLE");

    let unknown = uuid::Uuid::new_v4().to_string();
    let (status, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&unknown, 50, 500)),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn missing_event_fields_are_listed() {
    let app = TestApp::spawn();
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(json!({ "title": "Launch", "description": "x", "category": "party", "price": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["error"]["details"]["missingFields"],
        json!(["venue", "eventDate", "eventTime", "expectedAttendees", "budget"])
    );
}

#[tokio::test]
async fn venue_request_is_decided_once_by_the_venue_owner() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let rival = app.register("Rita", "rita@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (_, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 50, 500)),
        )
        .await;
    let event = body["data"]["id"].as_str().unwrap().to_string();
    let decide_uri = format!("/vevent/{event}/venue-request");

    let (_, body) = app
        .call(Method::GET, "/event/venue-requests", Some(&owner.token), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            Method::PATCH,
            &decide_uri,
            Some(&rival.token),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (_, body) = app
        .call(Method::GET, &format!("/events/{event}"), None, None)
        .await;
    assert_eq!(body["data"]["venueRequest"]["status"], "pending");
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = app
        .call(
            Method::PATCH,
            &decide_uri,
            Some(&owner.token),
            Some(json!({ "status": "approved", "response": "See you there" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["venueRequest"]["status"], "approved");
    assert_eq!(body["data"]["venueRequest"]["response"], "See you there");
    assert_eq!(body["data"]["status"], "approved");

    let (status, body) = app
        .call(
            Method::PATCH,
            &decide_uri,
            Some(&owner.token),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (_, body) = app
        .call(Method::GET, "/event/venue-requests", Some(&owner.token), None)
        .await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn availability_is_owner_only() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let rival = app.register("Rita", "rita@example.com", "venue_owner").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/venues/{venue}/availability"),
            Some(&rival.token),
            Some(json!({ "isAvailable": false })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/venues/{venue}/availability"),
            Some(&owner.token),
            Some(json!({ "isAvailable": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isAvailable"], true);
}

#[tokio::test]
async fn malformed_availability_body_leaves_venue_untouched() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let venue = app.create_venue(&owner, 100, "400").await;
    let uri = format!("/venues/{venue}/availability");

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&owner.token),
            Some(json!({ "isAvailable": "no" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method(Method::PUT)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", owner.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = app.call(Method::GET, &format!("/venues/{venue}"), None, None).await;
    assert_eq!(body["data"]["isAvailable"], true);
    assert_eq!(body["data"]["version"], 0);

    // An empty object names nothing, so it toggles.
    let (status, body) = app
        .call(Method::PUT, &uri, Some(&owner.token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isAvailable"], false);
}

#[tokio::test]
async fn event_status_is_overridden_only_by_the_venue_owner() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let rival = app.register("Rita", "rita@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (_, body) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 50, 500)),
        )
        .await;
    let event = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["version"], 0);
    let uri = format!("/events/{event}/status");

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&rival.token),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&owner.token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["missingFields"], json!(["status"]));

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&owner.token),
            Some(json!({ "status": "postponed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&owner.token),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["version"], 1);

    let (_, body) = app.call(Method::GET, &format!("/events/{event}"), None, None).await;
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn venue_listing_is_scoped_for_owners() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let rival = app.register("Rita", "rita@example.com", "venue_owner").await;
    let mine = app.create_venue(&owner, 100, "400").await;
    app.create_venue(&rival, 50, "200").await;

    let (status, body) = app.call(Method::GET, "/venues", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .call(Method::GET, "/venues", Some(&owner.token), None)
        .await;
    let venues = body["data"].as_array().unwrap();
    assert_eq!(venues.len(), 1);
    assert_eq!(venues[0]["id"], mine.as_str());

    let (_, body) = app
        .call(Method::GET, "/my-venues", Some(&owner.token), None)
        .await;
    assert_eq!(body["data"][0]["id"], mine.as_str());

    let (_, body) = app
        .call(Method::GET, "/profile", Some(&owner.token), None)
        .await;
    assert_eq!(body["data"]["venues"], json!([mine]));
}

#[tokio::test]
async fn venue_images_are_stored_and_limited() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let fields = [
        ("name", "Loft"),
        ("description", "Top floor"),
        ("location", "Main St"),
        ("capacity", "40"),
        ("pricePerDay", "150.50"),
    ];
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    let (status, body) = app
        .send(multipart_request(
            "/venues",
            &owner.token,
            &fields,
            &[("a.png", "image/png", png), ("b.png", "image/png", png)],
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0].as_str().unwrap().starts_with("/uploads/"));

    let six = [("x.png", "image/png", png); 6];
    let (status, body) = app
        .send(multipart_request("/venues", &owner.token, &fields, &six))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(multipart_request(
            "/venues",
            &owner.token,
            &[("name", "Loft")],
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"]["missingFields"],
        json!(["description", "location", "capacity", "pricePerDay"])
    );
}

#[tokio::test]
async fn rejected_venue_leaves_no_images_behind() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let fields = [
        ("name", "Loft"),
        ("description", "Top floor"),
        ("location", "Main St"),
        ("capacity", "40"),
        ("pricePerDay", "150.50"),
    ];
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";
    let pdf: &[u8] = b"%PDF";

    // The first image is saved before the second one is refused.
    let (status, body) = app
        .send(multipart_request(
            "/venues",
            &owner.token,
            &fields,
            &[("a.png", "image/png", png), ("b.pdf", "application/pdf", pdf)],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(app.images.count().await, 0);

    let (_, body) = app.call(Method::GET, "/my-venues", Some(&owner.token), None).await;
    assert_eq!(body["data"], json!([]));
    let (_, body) = app.call(Method::GET, "/profile", Some(&owner.token), None).await;
    assert_eq!(body["data"]["venues"], json!([]));
}

#[tokio::test]
async fn venue_reviews_average_into_rating() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let guest = app.register("Gus", "gus@example.com", "user").await;
    let venue = app.create_venue(&owner, 100, "400").await;
    let uri = format!("/venues/{venue}/reviews");

    for rating in [5, 3, 4] {
        let (status, _) = app
            .call(
                Method::POST,
                &uri,
                Some(&guest.token),
                Some(json!({ "rating": rating, "comment": "ok" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app
        .call(Method::GET, &format!("/venues/{venue}"), None, None)
        .await;
    assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["rating"].as_f64(), Some(4.0));

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(&guest.token),
            Some(json!({ "rating": 9, "comment": "too good" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn event_views_depend_on_role() {
    let app = TestApp::spawn();
    let owner = app.register("Vic", "vic@example.com", "venue_owner").await;
    let organizer = app.register("Olga", "olga@example.com", "organizer").await;
    let other = app.register("Otto", "otto@example.com", "organizer").await;
    let venue = app.create_venue(&owner, 100, "400").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/events",
            Some(&organizer.token),
            Some(event_payload(&venue, 50, 500)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app
        .call(Method::GET, "/events", Some(&organizer.token), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .call(Method::GET, "/events", Some(&other.token), None)
        .await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = app
        .call(Method::GET, "/events", Some(&owner.token), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
