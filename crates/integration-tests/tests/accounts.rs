//! Signup and login recording endpoint.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use simply_orders_integration_tests::{TestApp, order_1042};

#[tokio::test]
async fn test_signup_creates_user_with_last_login() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/api/users/login",
            &json!({ "email": "New@Example.com", "firstName": "Jo", "lastName": "Park" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@example.com");
    assert_eq!(body["first_name"], "Jo");
    assert!(body["last_login"].is_string());
    assert!(body["external_customer_id"].is_null());
    assert_eq!(app.store().users().len(), 1);
}

#[tokio::test]
async fn test_login_updates_existing_customer() {
    let app = TestApp::new();
    app.webhook(
        "customer.created",
        &json!({ "id": 77, "email": "a@b.com", "first_name": "Alex" }),
    )
    .await;

    let (status, body) = app
        .post_json("/api/users/login", &json!({ "email": "a@b.com" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Alex");
    assert_eq!(body["external_customer_id"], 77);

    let users = app.store().users();
    assert_eq!(users.len(), 1);
    assert!(users[0].last_login.is_some());
}

#[tokio::test]
async fn test_signed_up_user_sees_guest_orders() {
    let app = TestApp::new();
    app.webhook("order.created", &order_1042()).await;
    app.post_json("/api/users/login", &json!({ "email": "a@b.com" }))
        .await;

    let (status, body) = app.get("/api/orders?email=a@b.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_requires_valid_email() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/api/users/login", &json!({ "email": "nope" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid email is required");
    assert_eq!(app.store().stats().writes, 0);
}
