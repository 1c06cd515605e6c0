use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::entities::category;
use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::catalog::CategoryRequest;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CategoryListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on the category name.
    pub search: Option<String>,
    /// "asc" (default) or "desc", by category name.
    pub sort_order: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    params(CategoryListParams),
    responses(
        (status = 200, description = "Paginated category list", body = ApiResponse<PaginatedResponse<category::Model>>)
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<category::Model>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let sort_asc = !matches!(params.sort_order.as_deref(), Some("desc"));
    let categories = state
        .services
        .catalog
        .list_categories_paged(params.search.as_deref(), sort_asc, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// Unpaged name-ordered list for dropdowns.
#[utoipa::path(
    get,
    path = "/api/v1/categories/all",
    tag = "Categories",
    responses(
        (status = 200, description = "All categories, name ascending", body = ApiResponse<Vec<category::Model>>)
    )
)]
pub async fn list_all_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<category::Model>>>, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<category::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<category::Model>),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.catalog.create_category(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    params(("id" = i32, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<category::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<ApiResponse<category::Model>>, ServiceError> {
    let category = state.services.catalog.update_category(id, request).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "Categories",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Category #{} deleted.",
        id
    ))))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/all", get(list_all_categories))
        .route(
            "/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}
