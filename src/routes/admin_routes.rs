use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::auth_controller::AuthController;
use crate::controllers::car_controller::CarController;
use crate::controllers::dashboard_controller::DashboardController;
use crate::dto::auth_dto::{CreateStaffRequest, UserResponse};
use crate::dto::car_dto::{CarListQuery, CarListResponse};
use crate::dto::dashboard_dto::DashboardResponse;
use crate::dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/staff", post(create_staff))
        .route("/staff", get(list_staff))
        .route("/cars", get(list_all_cars))
}

async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardResponse>>, AppError> {
    let controller = DashboardController::new(state.pool.clone());
    let response = controller.dashboard().await?;
    Ok(Json(response))
}

async fn create_staff(
    State(state): State<AppState>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let controller = AuthController::new(state.pool.clone(), state.config.clone(), state.mailer.clone());
    let response = controller.create_staff(request).await?;
    Ok(Json(response))
}

async fn list_staff(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let controller = AuthController::new(state.pool.clone(), state.config.clone(), state.mailer.clone());
    let response = controller.list_staff().await?;
    Ok(Json(response))
}

async fn list_all_cars(
    State(state): State<AppState>,
    Query(query): Query<CarListQuery>,
) -> Result<Json<ApiResponse<CarListResponse>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.list_all_cars(query).await?;
    Ok(Json(response))
}
