use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::orders::{
    CartQuote, CreateOrderRequest, OrderConfirmation, OrderDetails, OrderFilter, OrderSort,
    OrderSummary, QuoteRequest,
};
use crate::services::payments::PayOrderRequest;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on the customer name.
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
    /// First order date to include, inclusive.
    pub date_from: Option<NaiveDate>,
    /// Last order date to include, inclusive.
    pub date_to: Option<NaiveDate>,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
    pub sort: Option<OrderSort>,
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "Orders",
    params(OrderListParams),
    responses(
        (status = 200, description = "Paginated order list", body = ApiResponse<PaginatedResponse<OrderSummary>>)
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<OrderSummary>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let filter = OrderFilter {
        search: params.search,
        status: params.status,
        date_from: params.date_from,
        date_to: params.date_to,
        min_total: params.min_total,
        max_total: params.max_total,
        sort: params.sort,
    };
    let orders = state.services.orders.list_orders(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order details with lines and payment", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OrderDetails>>, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Creates an order from a cart: snapshots prices, applies the promo
/// code when it qualifies and decrements stock, all in one transaction.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderConfirmation>),
        (status = 400, description = "Invalid cart", body = ApiResponse<serde_json::Value>),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    if let Err(errors) = request.validate() {
        let messages = common::validation_messages(&errors);
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<OrderConfirmation>::validation_errors(messages)),
        )
            .into_response());
    }
    let confirmation = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(confirmation))).into_response())
}

/// Prices a cart without persisting anything. Used by the register to
/// preview totals and promo codes before committing the sale.
#[utoipa::path(
    post,
    path = "/api/v1/orders/quote",
    tag = "Orders",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Cart priced", body = ApiResponse<CartQuote>),
        (status = 400, description = "Invalid cart", body = crate::errors::ErrorResponse)
    )
)]
pub async fn quote_cart(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<CartQuote>>, ServiceError> {
    let quote = state.services.orders.quote_cart(request).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/pay",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Order paid", body = ApiResponse<crate::entities::payment::Model>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already paid", body = crate::errors::ErrorResponse)
    )
)]
pub async fn pay_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<PayOrderRequest>,
) -> Result<Json<ApiResponse<crate::entities::payment::Model>>, ServiceError> {
    let method = request.payment_method;
    let payment = state.services.payments.pay_order(id, method).await?;
    Ok(Json(ApiResponse::with_message(
        payment,
        format!("Order #{} paid via {}.", id, method),
    )))
}

/// Deletes an order and reverses its side effects: every line goes back
/// to stock and the promo usage count drops by one.
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted, side effects reversed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Order #{} deleted; stock and promotion usage restored.",
        id
    ))))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/quote", post(quote_cart))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/pay", post(pay_order))
}
