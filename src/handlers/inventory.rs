use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::inventory::{StockLevel, StockLevelFilter};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StockListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on the product name.
    pub search: Option<String>,
}

/// Absolute on-hand quantity for a stocktake correction.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetQuantityRequest {
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    tag = "Inventory",
    params(StockListParams),
    responses(
        (status = 200, description = "Paginated stock levels", body = ApiResponse<PaginatedResponse<StockLevel>>)
    )
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(params): Query<StockListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<StockLevel>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let filter = StockLevelFilter {
        search: params.search,
    };
    let levels = state.services.inventory.list(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(levels)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    tag = "Inventory",
    params(("id" = i32, Path, description = "Inventory record id")),
    responses(
        (status = 200, description = "Stock level found", body = ApiResponse<StockLevel>),
        (status = 404, description = "Inventory record not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<StockLevel>>, ServiceError> {
    let level = state.services.inventory.get(id).await?;
    Ok(Json(ApiResponse::success(level)))
}

/// Sets the absolute on-hand quantity for a product, creating the
/// inventory row if the product has never been stocked.
#[utoipa::path(
    put,
    path = "/api/v1/inventory/products/{product_id}",
    tag = "Inventory",
    params(("product_id" = i32, Path, description = "Product id")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Stock level set", body = ApiResponse<crate::entities::inventory_level::Model>),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn set_stock_quantity(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<ApiResponse<crate::entities::inventory_level::Model>>, ServiceError> {
    request.validate()?;
    let level = state
        .services
        .inventory
        .set_quantity(product_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(level)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    tag = "Inventory",
    params(("id" = i32, Path, description = "Inventory record id")),
    responses(
        (status = 200, description = "Inventory record deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Inventory record not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_stock(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.inventory.delete(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Inventory record #{} deleted.",
        id
    ))))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stock))
        .route("/:id", get(get_stock).delete(delete_stock))
        .route("/products/:product_id", put(set_stock_quantity))
}
