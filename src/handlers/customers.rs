use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::entities::customer;
use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::customers::{CustomerRequest, CustomerSort, CustomerWithOrders};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CustomerListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on the customer name.
    pub search: Option<String>,
    pub sort: Option<CustomerSort>,
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    tag = "Customers",
    params(CustomerListParams),
    responses(
        (status = 200, description = "Paginated customer list", body = ApiResponse<PaginatedResponse<customer::Model>>)
    )
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<customer::Model>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let customers = state
        .services
        .customers
        .list(
            params.search.as_deref(),
            params.sort.unwrap_or_default(),
            page,
            limit,
        )
        .await?;
    Ok(Json(ApiResponse::success(customers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    tag = "Customers",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer found", body = ApiResponse<customer::Model>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<customer::Model>>, ServiceError> {
    let customer = state.services.customers.get(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/orders",
    tag = "Customers",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer with order history", body = ApiResponse<CustomerWithOrders>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_customer_orders(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CustomerWithOrders>>, ServiceError> {
    let customer = state.services.customers.get_with_orders(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    tag = "Customers",
    request_body = CustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<customer::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<CustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(customer))))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    tag = "Customers",
    params(("id" = i32, Path, description = "Customer id")),
    request_body = CustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<customer::Model>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CustomerRequest>,
) -> Result<Json<ApiResponse<customer::Model>>, ServiceError> {
    let customer = state.services.customers.update(id, request).await?;
    Ok(Json(ApiResponse::success(customer)))
}

/// Deletes a customer; their orders survive as walk-in sales.
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    tag = "Customers",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.customers.delete(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Customer #{} deleted.",
        id
    ))))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer)
                .put(update_customer)
                .delete(delete_customer),
        )
        .route("/:id/orders", get(get_customer_orders))
}
