//! Payment recording, the unpay reversal, one-call checkout and the
//! payment listing.

mod common;

use axum::http::StatusCode;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storeops_api::entities::promotion::DiscountType;

#[tokio::test]
async fn paying_an_order_records_the_amount_and_flips_status() {
    let app = TestApp::new().await;
    let kettle = app.seed_product("Electric Kettle", dec!(60000), 5).await;

    let body = response_json(
        app.post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": kettle, "quantity": 2 }] }),
        )
        .await,
    )
    .await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");

    let response = app
        .post(
            &format!("/api/v1/orders/{}/pay", order_id),
            json!({ "payment_method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        json!(format!("Order #{} paid via cash.", order_id))
    );
    assert_eq!(body["data"]["order_id"], json!(order_id));
    assert_eq!(body["data"]["amount"], json!("120000"));
    assert_eq!(body["data"]["payment_method"], json!("cash"));
    let payment_id = body["data"]["payment_id"].as_i64().expect("payment id");

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(body["data"]["status"], json!("paid"));
    assert_eq!(body["data"]["payment"]["payment_id"], json!(payment_id));

    // Payment moves money, not stock.
    assert_eq!(app.stock_of(kettle).await, 3);
}

#[tokio::test]
async fn paying_twice_is_refused() {
    let app = TestApp::new().await;
    let kettle = app.seed_product("Electric Kettle", dec!(60000), 5).await;

    let body = response_json(
        app.post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": kettle, "quantity": 1 }] }),
        )
        .await,
    )
    .await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");

    app.post(
        &format!("/api/v1/orders/{}/pay", order_id),
        json!({ "payment_method": "cash" }),
    )
    .await;

    let response = app
        .post(
            &format!("/api/v1/orders/{}/pay", order_id),
            json!({ "payment_method": "card" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        json!(format!("Conflict: Order #{} has already been paid", order_id))
    );

    let body = response_json(app.get("/api/v1/payments").await).await;
    assert_eq!(body["data"]["total"], json!(1));
}

#[tokio::test]
async fn paying_a_missing_order_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/orders/9999/pay", json!({ "payment_method": "cash" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response_json(response).await["message"],
        json!("Not found: Order #9999 not found")
    );
}

#[tokio::test]
async fn deleting_a_payment_reverts_the_order_to_pending() {
    let app = TestApp::new().await;
    let heater = app.seed_product("Space Heater", dec!(90000), 3).await;

    let body = response_json(
        app.post(
            "/api/v1/orders",
            json!({ "cart_items": [{ "product_id": heater, "quantity": 1 }] }),
        )
        .await,
    )
    .await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");

    let body = response_json(
        app.post(
            &format!("/api/v1/orders/{}/pay", order_id),
            json!({ "payment_method": "bank_transfer" }),
        )
        .await,
    )
    .await;
    let payment_id = body["data"]["payment_id"].as_i64().expect("payment id");

    let response = app.delete(&format!("/api/v1/payments/{}", payment_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await["message"],
        json!(format!(
            "Payment #{} deleted; its order is pending again.",
            payment_id
        ))
    );

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(body["data"]["status"], json!("pending"));
    assert_eq!(body["data"]["payment"], json!(null));

    // Unpay reverses the payment only; the goods stay sold.
    assert_eq!(app.stock_of(heater).await, 2);

    let response = app.get(&format!("/api/v1/payments/{}", payment_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The order can be paid again after the correction.
    let response = app
        .post(
            &format!("/api/v1/orders/{}/pay", order_id),
            json!({ "payment_method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn checkout_creates_a_paid_order_in_one_call() {
    let app = TestApp::new().await;
    let blender = app.seed_product("Blender", dec!(80000), 4).await;
    let promo = app
        .seed_promotion("TAKE30K", DiscountType::Fixed, dec!(30000), dec!(0), 0)
        .await;

    let response = app
        .post(
            "/api/v1/checkout",
            json!({
                "promo_code": "TAKE30K",
                "payment_method": "card",
                "cart_items": [{ "product_id": blender, "quantity": 2 }],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");
    let payment_id = body["data"]["payment_id"].as_i64().expect("payment id");
    assert_eq!(body["data"]["total_amount"], json!("130000"));
    assert_eq!(body["data"]["discount_amount"], json!("30000"));
    assert_eq!(
        body["data"]["promotion_message"],
        json!("Promotion code TAKE30K applied.")
    );
    assert_eq!(
        body["data"]["message"],
        json!(format!("Order #{} paid via card.", order_id))
    );

    let body = response_json(app.get(&format!("/api/v1/orders/{}", order_id)).await).await;
    assert_eq!(body["data"]["status"], json!("paid"));
    assert_eq!(body["data"]["payment"]["payment_id"], json!(payment_id));

    assert_eq!(app.stock_of(blender).await, 2);
    assert_eq!(app.promo_used_count(promo).await, 1);
}

#[tokio::test]
async fn checkout_leaves_nothing_behind_when_stock_is_short() {
    let app = TestApp::new().await;
    let toaster = app.seed_product("Toaster", dec!(70000), 1).await;
    let promo = app
        .seed_promotion("TAKE10", DiscountType::Percent, dec!(10), dec!(0), 0)
        .await;

    let response = app
        .post(
            "/api/v1/checkout",
            json!({
                "promo_code": "TAKE10",
                "payment_method": "cash",
                "cart_items": [{ "product_id": toaster, "quantity": 3 }],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(app.stock_of(toaster).await, 1);
    assert_eq!(app.promo_used_count(promo).await, 0);
    let body = response_json(app.get("/api/v1/orders").await).await;
    assert_eq!(body["data"]["total"], json!(0));
    let body = response_json(app.get("/api/v1/payments").await).await;
    assert_eq!(body["data"]["total"], json!(0));
}

#[tokio::test]
async fn checkout_validates_the_cart() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/checkout",
            json!({ "payment_method": "cash", "cart_items": [] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));
    let errors = body["errors"].as_array().expect("errors array");
    assert!(errors
        .iter()
        .any(|e| e.as_str().is_some_and(|s| s.contains("Cart cannot be empty"))));
}

#[tokio::test]
async fn deleting_a_paid_order_removes_its_payment_too() {
    let app = TestApp::new().await;
    let iron = app.seed_product("Steam Iron", dec!(55000), 6).await;

    let body = response_json(
        app.post(
            "/api/v1/checkout",
            json!({
                "payment_method": "cash",
                "cart_items": [{ "product_id": iron, "quantity": 2 }],
            }),
        )
        .await,
    )
    .await;
    let order_id = body["data"]["order_id"].as_i64().expect("order id");
    let payment_id = body["data"]["payment_id"].as_i64().expect("payment id");
    assert_eq!(app.stock_of(iron).await, 4);

    let response = app.delete(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.stock_of(iron).await, 6);
    let response = app.get(&format!("/api/v1/payments/{}", payment_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_listing_joins_customers_and_sorts() {
    let app = TestApp::new().await;
    let rice = app.seed_product("Jasmine Rice 5kg", dec!(50000), 10).await;
    let oil = app.seed_product("Cooking Oil 1L", dec!(70000), 10).await;
    let customer = app.seed_customer("Nguyen Van An").await;

    // A named sale paid in cash, then a walk-in paid by card.
    app.post(
        "/api/v1/checkout",
        json!({
            "customer_id": customer,
            "payment_method": "cash",
            "cart_items": [{ "product_id": rice, "quantity": 1 }],
        }),
    )
    .await;
    app.post(
        "/api/v1/checkout",
        json!({
            "payment_method": "card",
            "cart_items": [{ "product_id": oil, "quantity": 1 }],
        }),
    )
    .await;

    let body = response_json(app.get("/api/v1/payments").await).await;
    assert_eq!(body["data"]["total"], json!(2));
    // Default sort is newest first.
    assert_eq!(body["data"]["items"][0]["payment_method"], json!("card"));
    assert_eq!(body["data"]["items"][0]["customer_name"], json!(null));
    assert_eq!(body["data"]["items"][1]["customer_name"], json!("Nguyen Van An"));

    let body = response_json(app.get("/api/v1/payments?method=cash").await).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["amount"], json!("50000"));

    let body = response_json(app.get("/api/v1/payments?search=Nguyen").await).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["customer_name"], json!("Nguyen Van An"));

    let body = response_json(app.get("/api/v1/payments?sort=amount_desc").await).await;
    assert_eq!(body["data"]["items"][0]["amount"], json!("70000"));
}
