//! Customer book and staff account endpoints.

mod common;

use axum::http::StatusCode;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storeops_api::services::users::verify_password;

#[tokio::test]
async fn customer_crud_roundtrip() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/customers",
            json!({
                "name": "Tran Thi Mai",
                "phone": "0912345678",
                "email": "mai@example.vn",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let customer = response_json(response).await["data"]["customer_id"]
        .as_i64()
        .expect("customer id");

    let body = response_json(app.get(&format!("/api/v1/customers/{}", customer)).await).await;
    assert_eq!(body["data"]["name"], json!("Tran Thi Mai"));
    assert_eq!(body["data"]["phone"], json!("0912345678"));

    // Updates replace the whole contact card; omitted fields clear.
    let response = app
        .put(
            &format!("/api/v1/customers/{}", customer),
            json!({ "name": "Tran Thi Mai", "address": "12 Le Loi, Da Nang" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["address"], json!("12 Le Loi, Da Nang"));
    assert_eq!(body["data"]["phone"], json!(null));

    let response = app.delete(&format!("/api/v1/customers/{}", customer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await["message"],
        json!(format!("Customer #{} deleted.", customer))
    );

    let response = app.get(&format!("/api/v1/customers/{}", customer)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_validation_rejects_bad_contacts() {
    let app = TestApp::new().await;

    let response = app.post("/api/v1/customers", json!({ "name": "" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["message"]
        .as_str()
        .expect("error message")
        .contains("Customer name must be 1-100 characters"));

    let response = app
        .post(
            "/api/v1/customers",
            json!({ "name": "Pham Van Cuong", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["message"]
        .as_str()
        .expect("error message")
        .contains("Invalid email address"));
}

#[tokio::test]
async fn customer_listing_searches_and_sorts() {
    let app = TestApp::new().await;
    app.seed_customer("Tran Thi Mai").await;
    app.seed_customer("Nguyen Van An").await;
    app.seed_customer("Le Van Binh").await;

    let body = response_json(app.get("/api/v1/customers").await).await;
    assert_eq!(body["data"]["total"], json!(3));
    // Default sort is insertion order (by id).
    assert_eq!(body["data"]["items"][0]["name"], json!("Tran Thi Mai"));

    let body = response_json(app.get("/api/v1/customers?sort=name_asc").await).await;
    assert_eq!(body["data"]["items"][0]["name"], json!("Le Van Binh"));

    let body = response_json(app.get("/api/v1/customers?sort=name_desc").await).await;
    assert_eq!(body["data"]["items"][0]["name"], json!("Tran Thi Mai"));

    let body = response_json(app.get("/api/v1/customers?search=Van").await).await;
    assert_eq!(body["data"]["total"], json!(2));
}

#[tokio::test]
async fn customer_order_history_flattens_the_contact() {
    let app = TestApp::new().await;
    let water = app.seed_product("Mineral Water", dec!(6000), 50).await;
    let mai = app.seed_customer("Tran Thi Mai").await;
    let other = app.seed_customer("Nguyen Van An").await;

    for customer_id in [mai, mai, other] {
        let response = app
            .post(
                "/api/v1/orders",
                json!({
                    "customer_id": customer_id,
                    "cart_items": [{ "product_id": water, "quantity": 1 }],
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = response_json(app.get(&format!("/api/v1/customers/{}/orders", mai)).await).await;
    // The contact fields sit at the top level next to the history.
    assert_eq!(body["data"]["name"], json!("Tran Thi Mai"));
    assert_eq!(body["data"]["customer_id"], json!(mai));
    let orders = body["data"]["orders"].as_array().expect("orders");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["status"], json!("pending"));
    assert_eq!(orders[0]["total_amount"], json!("6000"));

    let response = app.get("/api/v1/customers/9999/orders").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_customer_turns_their_orders_into_walk_ins() {
    let app = TestApp::new().await;
    let water = app.seed_product("Mineral Water", dec!(6000), 50).await;
    let mai = app.seed_customer("Tran Thi Mai").await;

    let body = response_json(
        app.post(
            "/api/v1/orders",
            json!({
                "customer_id": mai,
                "cart_items": [{ "product_id": water, "quantity": 2 }],
            }),
        )
        .await,
    )
    .await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");

    let response = app.delete(&format!("/api/v1/customers/{}", mai)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(body["data"]["customer_id"], json!(null));
    assert_eq!(body["data"]["customer_name"], json!("Walk-in customer"));
    assert_eq!(body["data"]["total_amount"], json!("12000"));

    // The listing no longer finds it by the old name.
    let body = response_json(app.get("/api/v1/orders?search=Mai").await).await;
    assert_eq!(body["data"]["total"], json!(0));
    let body = response_json(app.get("/api/v1/orders").await).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["customer_name"], json!(null));
}

#[tokio::test]
async fn user_responses_never_carry_the_password_hash() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/users",
            json!({
                "username": "cashier1",
                "password": "secret123",
                "full_name": "Front Desk Cashier",
                "role": "staff",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["username"], json!("cashier1"));
    assert_eq!(body["data"]["role"], json!("staff"));
    let user_id = body["data"]["user_id"].as_i64().expect("user id");
    assert!(!body["data"]
        .as_object()
        .expect("user object")
        .contains_key("password_hash"));

    let body = response_json(app.get(&format!("/api/v1/users/{}", user_id)).await).await;
    assert!(!body["data"]
        .as_object()
        .expect("user object")
        .contains_key("password_hash"));
}

#[tokio::test]
async fn duplicate_usernames_and_weak_credentials_are_refused() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/users",
            json!({ "username": "admin2", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    // Role defaults to staff when omitted.
    assert_eq!(response_json(response).await["data"]["role"], json!("staff"));

    let response = app
        .post(
            "/api/v1/users",
            json!({ "username": "admin2", "password": "other-secret" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        response_json(response).await["message"],
        json!("Conflict: Username admin2 already exists")
    );

    let response = app
        .post(
            "/api/v1/users",
            json!({ "username": "ab", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["message"]
        .as_str()
        .expect("error message")
        .contains("Username must be 3-50 characters"));

    let response = app
        .post(
            "/api/v1/users",
            json!({ "username": "cashier9", "password": "short" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(response).await["message"]
        .as_str()
        .expect("error message")
        .contains("Password must be at least 6 characters"));
}

#[tokio::test]
async fn user_updates_change_role_and_password_but_not_username() {
    let app = TestApp::new().await;

    let body = response_json(
        app.post(
            "/api/v1/users",
            json!({ "username": "cashier1", "password": "secret123" }),
        )
        .await,
    )
    .await;
    let user_id = body["data"]["user_id"].as_i64().expect("user id") as i32;

    let response = app
        .put(
            &format!("/api/v1/users/{}", user_id),
            json!({ "role": "admin", "full_name": "Shift Lead" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["username"], json!("cashier1"));
    assert_eq!(body["data"]["role"], json!("admin"));
    assert_eq!(body["data"]["full_name"], json!("Shift Lead"));

    let response = app
        .put(
            &format!("/api/v1/users/{}", user_id),
            json!({ "password": "rotated-secret" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app
        .state
        .services
        .users
        .get(user_id)
        .await
        .expect("user lookup");
    assert!(verify_password("rotated-secret", &stored.password_hash));
    assert!(!verify_password("secret123", &stored.password_hash));
}

#[tokio::test]
async fn user_listing_filters_by_role_and_keyword() {
    let app = TestApp::new().await;

    for (username, full_name, role) in [
        ("storemgr", "Store Manager", "admin"),
        ("cashier1", "Front Desk Cashier", "staff"),
        ("cashier2", "Evening Cashier", "staff"),
    ] {
        let response = app
            .post(
                "/api/v1/users",
                json!({
                    "username": username,
                    "password": "secret123",
                    "full_name": full_name,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = response_json(app.get("/api/v1/users?role=admin").await).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["username"], json!("storemgr"));

    let body = response_json(app.get("/api/v1/users?keyword=cash").await).await;
    assert_eq!(body["data"]["total"], json!(2));

    // Keyword also matches the display name.
    let body = response_json(app.get("/api/v1/users?keyword=Store").await).await;
    assert_eq!(body["data"]["total"], json!(1));

    let user_id = body["data"]["items"][0]["user_id"].as_i64().expect("id");
    let response = app.delete(&format!("/api/v1/users/{}", user_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await["message"],
        json!(format!("User #{} deleted.", user_id))
    );
    let response = app.get(&format!("/api/v1/users/{}", user_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
