use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::entities::promotion::{self, PromotionStatus};
use crate::errors::ServiceError;
use crate::handlers::common;
use crate::services::promotions::{CreatePromotionRequest, PromotionFilter, UpdatePromotionRequest};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PromotionListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on code or description.
    pub search: Option<String>,
    pub status: Option<PromotionStatus>,
    /// Only promotions whose validity window contains this date.
    pub active_on: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/v1/promotions",
    tag = "Promotions",
    params(PromotionListParams),
    responses(
        (status = 200, description = "Paginated promotion list", body = ApiResponse<PaginatedResponse<promotion::Model>>)
    )
)]
pub async fn list_promotions(
    State(state): State<AppState>,
    Query(params): Query<PromotionListParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<promotion::Model>>>, ServiceError> {
    let (page, limit) = common::resolve_paging(params.page, params.limit, &state.config);
    let filter = PromotionFilter {
        search: params.search,
        status: params.status,
        active_on: params.active_on,
    };
    let promotions = state
        .services
        .promotions
        .list(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(promotions)))
}

#[utoipa::path(
    get,
    path = "/api/v1/promotions/{id}",
    tag = "Promotions",
    params(("id" = i32, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "Promotion found", body = ApiResponse<promotion::Model>),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<promotion::Model>>, ServiceError> {
    let promotion = state.services.promotions.get(id).await?;
    Ok(Json(ApiResponse::success(promotion)))
}

#[utoipa::path(
    post,
    path = "/api/v1/promotions",
    tag = "Promotions",
    request_body = CreatePromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = ApiResponse<promotion::Model>),
        (status = 400, description = "Invalid dates or discount value", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already taken", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    Json(request): Json<CreatePromotionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let promotion = state.services.promotions.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(promotion))))
}

#[utoipa::path(
    put,
    path = "/api/v1/promotions/{id}",
    tag = "Promotions",
    params(("id" = i32, Path, description = "Promotion id")),
    request_body = UpdatePromotionRequest,
    responses(
        (status = 200, description = "Promotion updated", body = ApiResponse<promotion::Model>),
        (status = 400, description = "Start date change rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdatePromotionRequest>,
) -> Result<Json<ApiResponse<promotion::Model>>, ServiceError> {
    let promotion = state.services.promotions.update(id, request).await?;
    Ok(Json(ApiResponse::success(promotion)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/promotions/{id}",
    tag = "Promotions",
    params(("id" = i32, Path, description = "Promotion id")),
    responses(
        (status = 200, description = "Promotion deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.promotions.delete(id).await?;
    Ok(Json(ApiResponse::success_message(format!(
        "Promotion #{} deleted.",
        id
    ))))
}

pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route(
            "/:id",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
}
