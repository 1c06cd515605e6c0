use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::entities::supplier;
use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::catalog::SupplierRequest;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SupplierListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on name, phone, email or address.
    pub search: Option<String>,
    /// "asc" (default) or "desc", by supplier name.
    pub sort_order: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    tag = "Suppliers",
    params(SupplierListParams),
    responses(
        (status = 200, description = "Paginated supplier list", body = ApiResponse<PaginatedResponse<supplier::Model>>)
    )
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(params): Query<SupplierListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<supplier::Model>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let sort_asc = !matches!(params.sort_order.as_deref(), Some("desc"));
    let suppliers = state
        .services
        .catalog
        .list_suppliers_paged(params.search.as_deref(), sort_asc, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(suppliers)))
}

/// Unpaged name-ordered list for dropdowns.
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/all",
    tag = "Suppliers",
    responses(
        (status = 200, description = "All suppliers, name ascending", body = ApiResponse<Vec<supplier::Model>>)
    )
)]
pub async fn list_all_suppliers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<supplier::Model>>>, ServiceError> {
    let suppliers = state.services.catalog.list_suppliers().await?;
    Ok(Json(ApiResponse::success(suppliers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    tag = "Suppliers",
    params(("id" = i32, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier found", body = ApiResponse<supplier::Model>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<supplier::Model>>, ServiceError> {
    let supplier = state.services.catalog.get_supplier(id).await?;
    Ok(Json(ApiResponse::success(supplier)))
}

#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    tag = "Suppliers",
    request_body = SupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = ApiResponse<supplier::Model>),
        (status = 409, description = "Email already taken", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(request): Json<SupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.services.catalog.create_supplier(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(supplier))))
}

#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{id}",
    tag = "Suppliers",
    params(("id" = i32, Path, description = "Supplier id")),
    request_body = SupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = ApiResponse<supplier::Model>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<SupplierRequest>,
) -> Result<Json<ApiResponse<supplier::Model>>, ServiceError> {
    let supplier = state.services.catalog.update_supplier(id, request).await?;
    Ok(Json(ApiResponse::success(supplier)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    tag = "Suppliers",
    params(("id" = i32, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.catalog.delete_supplier(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Supplier #{} deleted.",
        id
    ))))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/all", get(list_all_suppliers))
        .route(
            "/:id",
            get(get_supplier)
                .put(update_supplier)
                .delete(delete_supplier),
        )
}
