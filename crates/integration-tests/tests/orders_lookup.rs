//! Order lookup endpoint.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::json;

use simply_orders_integration_tests::{TestApp, order_1042};

#[tokio::test]
async fn test_guest_orders_by_email() {
    let app = TestApp::new();
    app.webhook("order.created", &order_1042()).await;

    let (status, body) = app.get("/api/orders?email=A%40B.com").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].is_null());
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["orders"][0]["order_number"], "1042");
    assert_eq!(body["orders"][0]["items"][0]["total_price"], "259.00");
}

#[tokio::test]
async fn test_user_without_linked_orders_falls_back_to_email() {
    let app = TestApp::new();
    // Registered customer first, then a guest checkout with the same email
    app.webhook(
        "customer.created",
        &json!({ "id": 77, "email": "a@b.com", "first_name": "Alex" }),
    )
    .await;
    app.webhook("order.created", &order_1042()).await;

    let (status, body) = app.get("/api/orders?email=a@b.com").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@b.com");
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_orders_newest_first() {
    let app = TestApp::new();
    let mut older = order_1042();
    older["id"] = json!(5001);
    older["number"] = json!("1001");
    older["date_created_gmt"] = json!("2024-02-01T00:00:00");
    app.webhook("order.created", &older).await;
    app.webhook("order.created", &order_1042()).await;

    let (_, body) = app.get("/api/orders?email=a@b.com").await;

    let numbers: Vec<&str> = body["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["order_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["1042", "1001"]);
}

#[tokio::test]
async fn test_direct_request_without_proxy_headers() {
    let app = TestApp::new();
    app.webhook("order.created", &order_1042()).await;

    // Served with connect info, as the binary does
    let mut request = Request::builder()
        .uri("/api/orders?email=a@b.com")
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo("192.0.2.10:40312".parse::<SocketAddr>().unwrap()));
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    // No proxy header and no peer address at all
    let request = Request::builder()
        .uri("/api/orders?email=a@b.com")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_email() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/orders?email=nope").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid email is required");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}
