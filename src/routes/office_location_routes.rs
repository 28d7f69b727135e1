use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::controllers::office_controller::OfficeController;
use crate::dto::office_dto::{CreateOfficeRequest, OfficeResponse, UpdateOfficeRequest};
use crate::dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_office_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_offices))
        .route("/:id", get(get_office))
}

pub fn create_office_admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_office))
        .route("/:id", put(update_office))
        .route("/:id", delete(delete_office))
}

async fn list_offices(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OfficeResponse>>>, AppError> {
    let controller = OfficeController::new(state.pool.clone());
    let response = controller.list_offices().await?;
    Ok(Json(response))
}

async fn get_office(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OfficeResponse>>, AppError> {
    let controller = OfficeController::new(state.pool.clone());
    let response = controller.get_office(id).await?;
    Ok(Json(response))
}

async fn create_office(
    State(state): State<AppState>,
    Json(request): Json<CreateOfficeRequest>,
) -> Result<Json<ApiResponse<OfficeResponse>>, AppError> {
    let controller = OfficeController::new(state.pool.clone());
    let response = controller.create_office(request).await?;
    Ok(Json(response))
}

async fn update_office(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateOfficeRequest>,
) -> Result<Json<ApiResponse<OfficeResponse>>, AppError> {
    let controller = OfficeController::new(state.pool.clone());
    let response = controller.update_office(id, request).await?;
    Ok(Json(response))
}

async fn delete_office(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = OfficeController::new(state.pool.clone());
    let response = controller.delete_office(id).await?;
    Ok(Json(response))
}
