use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::entities::payment::{self, PaymentMethod};
use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::payments::{
    CheckoutConfirmation, CheckoutRequest, PaymentFilter, PaymentSort, PaymentSummary,
};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaymentListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on the paying customer's name.
    pub search: Option<String>,
    pub method: Option<PaymentMethod>,
    pub sort: Option<PaymentSort>,
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "Payments",
    params(PaymentListParams),
    responses(
        (status = 200, description = "Paginated payment list", body = ApiResponse<PaginatedResponse<PaymentSummary>>)
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<PaymentSummary>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let filter = PaymentFilter {
        search: params.search,
        method: params.method,
        sort: params.sort,
    };
    let payments = state
        .services
        .payments
        .list_payments(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "Payments",
    params(("id" = i32, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment found", body = ApiResponse<payment::Model>),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<payment::Model>>, ServiceError> {
    let payment = state.services.payments.get_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

/// One-step sale for the register: creates the order and records its
/// payment in a single transaction, so a declined card leaves nothing
/// behind.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    tag = "Payments",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created and paid", body = ApiResponse<CheckoutConfirmation>),
        (status = 400, description = "Invalid cart", body = ApiResponse<serde_json::Value>),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response, ServiceError> {
    if let Err(errors) = request.validate() {
        let messages = common::validation_messages(&errors);
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<CheckoutConfirmation>::validation_errors(
                messages,
            )),
        )
            .into_response());
    }
    let confirmation = state.services.payments.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(confirmation))).into_response())
}

/// Deletes a payment and flips its order back to pending ("unpay").
#[utoipa::path(
    delete,
    path = "/api/v1/payments/{id}",
    tag = "Payments",
    params(("id" = i32, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment deleted, order pending again", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.payments.delete_payment(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Payment #{} deleted; its order is pending again.",
        id
    ))))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/:id", get(get_payment).delete(delete_payment))
}
