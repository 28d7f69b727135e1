use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::review_controller::ReviewController;
use crate::dto::review_dto::{CreateReviewRequest, ReviewListQuery, ReviewListResponse};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::review::Review;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_review_router() -> Router<AppState> {
    Router::new().route("/", post(create_review))
}

/// Listado de reseñas, solo administradores
pub fn create_review_admin_router() -> Router<AppState> {
    Router::new().route("/", get(list_reviews))
}

async fn create_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Json<ApiResponse<Review>>, AppError> {
    let controller = ReviewController::new(state.pool.clone());
    let response = controller.create_review(&user, request).await?;
    Ok(Json(response))
}

async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<ApiResponse<ReviewListResponse>>, AppError> {
    let controller = ReviewController::new(state.pool.clone());
    let response = controller.list_reviews(query).await?;
    Ok(Json(response))
}
