// Shared harness for the integration tests. Not every test binary uses
// every helper.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    middleware, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storeops_api::{
    config::AppConfig,
    db,
    entities::promotion::{self, DiscountType, PromotionStatus},
    events::{self, EventSender},
    handlers::{health, AppServices},
    services::{
        catalog::CreateProductRequest, customers::CustomerRequest,
        promotions::CreatePromotionRequest,
    },
    AppState,
};

/// Harness backed by a throwaway SQLite file: full application state plus
/// an in-process router, torn down (file included) on drop.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_path: PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_promo_limit_enforced(false).await
    }

    /// Same harness with the promotion usage limit policy switched on.
    pub async fn with_promo_limit_enforced(enforce: bool) -> Self {
        let db_path = std::env::temp_dir().join(format!("storeops_test_{}.db", Uuid::new_v4()));
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(
            database_url,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.enforce_promo_usage_limit = enforce;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Some(event_sender), enforce);
        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .nest("/health", health::health_routes())
            .nest("/api/v1", storeops_api::api_v1_routes())
            .layer(middleware::from_fn(
                storeops_api::tracing::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            db_path,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the in-process router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> axum::response::Response {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> axum::response::Response {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> axum::response::Response {
        self.request(Method::DELETE, uri, None).await
    }

    /// Inserts a product with the given opening stock, returning its id.
    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> i32 {
        let product = self
            .state
            .services
            .catalog
            .create_product(CreateProductRequest {
                product_name: name.to_string(),
                category_id: None,
                supplier_id: None,
                barcode: None,
                price,
                unit: Some("pcs".to_string()),
            })
            .await
            .expect("seed product");

        self.state
            .services
            .inventory
            .set_quantity(product.product_id, stock)
            .await
            .expect("seed stock");

        product.product_id
    }

    /// Active promotion valid from today through 30 days out.
    pub async fn seed_promotion(
        &self,
        code: &str,
        discount_type: DiscountType,
        value: Decimal,
        min_order: Decimal,
        usage_limit: i32,
    ) -> i32 {
        let today = Utc::now().date_naive();
        let promo = self
            .state
            .services
            .promotions
            .create(CreatePromotionRequest {
                promo_code: code.to_string(),
                description: None,
                discount_type,
                discount_value: value,
                start_date: today,
                end_date: today + Duration::days(30),
                min_order_amount: min_order,
                usage_limit,
                status: Some(PromotionStatus::Active),
            })
            .await
            .expect("seed promotion");
        promo.promo_id
    }

    /// Raw promotion row with an explicit window and status. The create
    /// path refuses windows that start in the past, so tests that need an
    /// expired or already-running promotion insert one directly.
    pub async fn seed_promotion_with_window(
        &self,
        code: &str,
        discount_type: DiscountType,
        value: Decimal,
        min_order: Decimal,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: PromotionStatus,
    ) -> i32 {
        let promo = promotion::ActiveModel {
            promo_code: Set(code.to_string()),
            description: Set(None),
            discount_type: Set(discount_type),
            discount_value: Set(value),
            start_date: Set(start_date),
            end_date: Set(end_date),
            min_order_amount: Set(min_order),
            usage_limit: Set(0),
            used_count: Set(0),
            status: Set(status),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed promotion row");
        promo.promo_id
    }

    pub async fn seed_customer(&self, name: &str) -> i32 {
        let customer = self
            .state
            .services
            .customers
            .create(CustomerRequest {
                name: name.to_string(),
                phone: None,
                email: None,
                address: None,
            })
            .await
            .expect("seed customer");
        customer.customer_id
    }

    /// Stock on hand straight from the service; a missing row reads 0.
    pub async fn stock_of(&self, product_id: i32) -> i32 {
        self.state
            .services
            .inventory
            .quantity_of(product_id)
            .await
            .expect("read stock level")
    }

    pub async fn promo_used_count(&self, promo_id: i32) -> i32 {
        self.state
            .services
            .promotions
            .get(promo_id)
            .await
            .expect("read promotion")
            .used_count
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// Parse a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not valid json")
}
