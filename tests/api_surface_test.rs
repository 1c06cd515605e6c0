//! Cross-cutting API behavior: health probes, request-id propagation and
//! the shared response envelopes.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn liveness_answers_without_touching_the_database() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], json!("up"));
    assert!(body["version"].is_string());
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn readiness_reports_the_database_round_trip() {
    let app = TestApp::new().await;

    let response = app.get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], json!("ready"));
    assert_eq!(body["checks"]["database"]["status"], json!("up"));
    assert!(body["checks"]["database"]["latency_ms"].is_u64());
}

#[tokio::test]
async fn unknown_routes_return_not_found() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/reports/daily").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/products").await;
    let header = response
        .headers()
        .get("x-request-id")
        .expect("request id header")
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(!header.is_empty());

    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["meta"]["request_id"], json!(header));
    assert!(body["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn client_supplied_request_ids_are_echoed() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            "/api/v1/products",
            None,
            &[("x-request-id", "trace-abc-123")],
        )
        .await;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .expect("request id header"),
        "trace-abc-123"
    );
    let body = response_json(response).await;
    assert_eq!(body["meta"]["request_id"], json!("trace-abc-123"));

    // Error envelopes carry the same id, so a failing call can be traced
    // back from the client's logs alone.
    let response = app
        .request_with_headers(
            Method::GET,
            "/api/v1/products/9999",
            None,
            &[("x-request-id", "trace-abc-124")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], json!("Not Found"));
    assert_eq!(body["message"], json!("Not found: Product #9999 not found"));
    assert_eq!(body["request_id"], json!("trace-abc-124"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn error_envelopes_use_the_canonical_reason() {
    let app = TestApp::new().await;
    let tea = app.seed_product("Green Tea", dec!(30000), 1).await;

    // 400 from a rejected field.
    let response = app
        .post("/api/v1/products", json!({ "name": "", "price": "1000" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], json!("Bad Request"));

    // 409 from a uniqueness clash.
    app.post("/api/v1/categories", json!({ "name": "Drinks" }))
        .await;
    let response = app
        .post("/api/v1/categories", json!({ "name": "Drinks" }))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(response).await["error"], json!("Conflict"));

    // 422 from a stock shortage.
    let response = app
        .post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": tea, "quantity": 5 }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response_json(response).await["error"],
        json!("Unprocessable Entity")
    );
}
