//! End-to-end coverage of the order workflow: pricing, stock decrement,
//! atomic rollback and the symmetric deletion path.

mod common;

use axum::http::StatusCode;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storeops_api::entities::promotion::DiscountType;

#[tokio::test]
async fn creating_an_order_prices_the_cart_and_decrements_stock() {
    let app = TestApp::new().await;
    let rice = app.seed_product("Jasmine Rice 5kg", dec!(50000), 5).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": rice, "quantity": 2 }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["total_amount"], json!("100000"));
    assert_eq!(body["data"]["discount_amount"], json!("0"));
    let order_id = body["data"]["order_id"].as_i64().expect("order id");
    assert_eq!(
        body["data"]["message"],
        json!(format!("Order #{} created successfully.", order_id))
    );

    assert_eq!(app.stock_of(rice).await, 3);
}

#[tokio::test]
async fn order_snapshot_survives_a_later_price_change() {
    let app = TestApp::new().await;
    let soap = app.seed_product("Hand Soap", dec!(30000), 10).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": soap, "quantity": 1 }] }),
        )
        .await;
    let order_id = response_json(response).await["data"]["order_id"]
        .as_i64()
        .expect("order id");

    // Reprice the product after the sale.
    let response = app
        .put(
            &format!("/api/v1/products/{}", soap),
            json!({ "price": "45000" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(body["data"]["total_amount"], json!("30000"));
    assert_eq!(body["data"]["items"][0]["price"], json!("30000"));
}

#[tokio::test]
async fn insufficient_stock_rejects_the_order_and_mutates_nothing() {
    let app = TestApp::new().await;
    let milk = app.seed_product("Fresh Milk 1L", dec!(32000), 1).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": milk, "quantity": 3 }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_json(response).await;
    assert_eq!(body["error"], json!("Unprocessable Entity"));
    let message = body["message"].as_str().expect("error message");
    assert!(message.contains("Not enough stock for Fresh Milk 1L"));
    assert!(message.contains("only 1 left"));

    assert_eq!(app.stock_of(milk).await, 1);
    let orders = response_json(app.get("/api/v1/orders").await).await;
    assert_eq!(orders["data"]["total"], json!(0));
}

#[tokio::test]
async fn a_failing_line_rolls_back_decrements_from_earlier_lines() {
    let app = TestApp::new().await;
    let tea = app.seed_product("Green Tea", dec!(10000), 10).await;
    let coffee = app.seed_product("Ground Coffee", dec!(58000), 0).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "cart_items": [
                    { "product_id": tea, "quantity": 2 },
                    { "product_id": coffee, "quantity": 1 }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The first line's decrement must not survive the failed second line.
    assert_eq!(app.stock_of(tea).await, 10);
    assert_eq!(app.stock_of(coffee).await, 0);
}

#[tokio::test]
async fn empty_cart_returns_a_field_level_validation_error() {
    let app = TestApp::new().await;

    let response = app.post("/api/v1/orders", json!({ "cart_items": [] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));
    let errors = body["errors"].as_array().expect("errors array");
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap_or("").contains("Cart cannot be empty")));
}

#[tokio::test]
async fn duplicate_cart_lines_are_rejected() {
    let app = TestApp::new().await;
    let water = app.seed_product("Mineral Water", dec!(6000), 20).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "cart_items": [
                    { "product_id": water, "quantity": 1 },
                    { "product_id": water, "quantity": 2 }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("more than once"));
    assert_eq!(app.stock_of(water).await, 20);
}

#[tokio::test]
async fn carts_referencing_unknown_products_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": 9999, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("no longer exist"));
}

#[tokio::test]
async fn unknown_customer_id_is_rejected_before_any_write() {
    let app = TestApp::new().await;
    let chips = app.seed_product("Potato Chips", dec!(18000), 6).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "customer_id": 424242,
                "cart_items": [{ "product_id": chips, "quantity": 1 }]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("Customer does not exist"));
    assert_eq!(app.stock_of(chips).await, 6);
}

#[tokio::test]
async fn orders_without_a_customer_read_as_walk_in_sales() {
    let app = TestApp::new().await;
    let noodles = app.seed_product("Instant Noodles", dec!(42000), 8).await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": noodles, "quantity": 1 }] }),
        )
        .await;
    let order_id = response_json(response).await["data"]["order_id"]
        .as_i64()
        .expect("order id");

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(body["data"]["customer_id"], json!(null));
    assert_eq!(body["data"]["customer_name"], json!("Walk-in customer"));
    assert_eq!(body["data"]["status"], json!("pending"));
}

#[tokio::test]
async fn deleting_an_order_restores_stock_and_promotion_usage() {
    let app = TestApp::new().await;
    let rice = app.seed_product("Jasmine Rice 5kg", dec!(50000), 5).await;
    let promo_id = app
        .seed_promotion("WELCOME10", DiscountType::Percent, dec!(10), dec!(0), 0)
        .await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "promo_code": "WELCOME10",
                "cart_items": [{ "product_id": rice, "quantity": 2 }]
            }),
        )
        .await;
    let body = response_json(response).await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");
    assert_eq!(body["data"]["discount_amount"], json!("10000"));

    assert_eq!(app.stock_of(rice).await, 3);
    assert_eq!(app.promo_used_count(promo_id).await, 1);

    let response = app.delete(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        json!(format!(
            "Order #{} deleted; stock and promotion usage restored.",
            order_id
        ))
    );

    assert_eq!(app.stock_of(rice).await, 5);
    assert_eq!(app.promo_used_count(promo_id).await, 0);

    let response = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_details_carry_line_snapshots_and_the_promo_code() {
    let app = TestApp::new().await;
    let rice = app.seed_product("Jasmine Rice 5kg", dec!(50000), 5).await;
    let tea = app.seed_product("Green Tea", dec!(10000), 5).await;
    app.seed_promotion("SAVE5K", DiscountType::Fixed, dec!(5000), dec!(0), 0)
        .await;
    let customer_id = app.seed_customer("Tran Thi Mai").await;

    let response = app
        .post(
            "/api/v1/orders",
            json!({
                "customer_id": customer_id,
                "promo_code": "SAVE5K",
                "cart_items": [
                    { "product_id": rice, "quantity": 1 },
                    { "product_id": tea, "quantity": 3 }
                ]
            }),
        )
        .await;
    let order_id = response_json(response).await["data"]["order_id"]
        .as_i64()
        .expect("order id");

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    let data = &body["data"];
    assert_eq!(data["customer_name"], json!("Tran Thi Mai"));
    assert_eq!(data["promo_code"], json!("SAVE5K"));
    assert_eq!(data["discount_amount"], json!("5000"));
    assert_eq!(data["total_amount"], json!("75000"));
    assert_eq!(data["payment"], json!(null));

    let items = data["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["product_name"], json!("Jasmine Rice 5kg"));
    assert_eq!(items[0]["subtotal"], json!("50000"));
    assert_eq!(items[1]["product_name"], json!("Green Tea"));
    assert_eq!(items[1]["quantity"], json!(3));
}

#[tokio::test]
async fn order_listing_filters_by_customer_name_and_status() {
    let app = TestApp::new().await;
    let water = app.seed_product("Mineral Water", dec!(6000), 100).await;
    let mai = app.seed_customer("Tran Thi Mai").await;
    let an = app.seed_customer("Nguyen Van An").await;

    for customer_id in [mai, mai, an] {
        let response = app
            .post(
                "/api/v1/orders",
                json!({
                    "customer_id": customer_id,
                    "cart_items": [{ "product_id": water, "quantity": 1 }]
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body = response_json(app.get("/api/v1/orders?search=Mai").await).await;
    assert_eq!(body["data"]["total"], json!(2));

    let body = response_json(app.get("/api/v1/orders?status=paid").await).await;
    assert_eq!(body["data"]["total"], json!(0));

    let body = response_json(app.get("/api/v1/orders?status=pending").await).await;
    assert_eq!(body["data"]["total"], json!(3));
}

#[tokio::test]
async fn quotes_price_the_cart_without_touching_stock_or_counters() {
    let app = TestApp::new().await;
    let rice = app.seed_product("Jasmine Rice 5kg", dec!(50000), 5).await;
    let promo_id = app
        .seed_promotion("WELCOME10", DiscountType::Percent, dec!(10), dec!(0), 0)
        .await;

    let response = app
        .post(
            "/api/v1/orders/quote",
            json!({
                "promo_code": "WELCOME10",
                "cart_items": [{ "product_id": rice, "quantity": 2 }]
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["raw_total"], json!("100000"));
    assert_eq!(body["data"]["discount"], json!("10000"));
    assert_eq!(body["data"]["total"], json!("90000"));
    assert_eq!(body["data"]["is_valid"], json!(true));
    assert_eq!(
        body["data"]["message"],
        json!("Promotion code WELCOME10 applied.")
    );

    // Nothing persisted: stock and usage counter untouched, no order rows.
    assert_eq!(app.stock_of(rice).await, 5);
    assert_eq!(app.promo_used_count(promo_id).await, 0);
    let orders = response_json(app.get("/api/v1/orders").await).await;
    assert_eq!(orders["data"]["total"], json!(0));
}
