use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::car_controller::CarController;
use crate::dto::car_dto::{
    CarListQuery, CarListResponse, CarTypeRow, CreateCarRequest, CreateCarTypeRequest,
    UpdateCarRequest, UpdateCarTypeRequest,
};
use crate::dto::ApiResponse;
use crate::models::car::{Car, CarType};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Catálogo de coches visible para cualquier usuario con sesión
pub fn create_car_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cars))
        .route("/:id", get(get_car))
}

/// Gestión de flota, solo administradores
pub fn create_car_admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_car))
        .route("/:id", put(update_car))
        .route("/:id", delete(delete_car))
}

pub fn create_car_type_router() -> Router<AppState> {
    Router::new().route("/", get(list_car_types))
}

pub fn create_car_type_admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_car_type))
        .route("/:id", put(update_car_type))
        .route("/:id", delete(delete_car_type))
}

async fn list_cars(
    State(state): State<AppState>,
    Query(query): Query<CarListQuery>,
) -> Result<Json<ApiResponse<CarListResponse>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.list_cars(query).await?;
    Ok(Json(response))
}

async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Car>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.get_car(id).await?;
    Ok(Json(response))
}

async fn create_car(
    State(state): State<AppState>,
    Json(request): Json<CreateCarRequest>,
) -> Result<Json<ApiResponse<Car>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.create_car(request).await?;
    Ok(Json(response))
}

async fn update_car(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCarRequest>,
) -> Result<Json<ApiResponse<Car>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.update_car(id, request).await?;
    Ok(Json(response))
}

async fn delete_car(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.delete_car(id).await?;
    Ok(Json(response))
}

async fn list_car_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CarTypeRow>>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.list_car_types().await?;
    Ok(Json(response))
}

async fn create_car_type(
    State(state): State<AppState>,
    Json(request): Json<CreateCarTypeRequest>,
) -> Result<Json<ApiResponse<CarType>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.create_car_type(request).await?;
    Ok(Json(response))
}

async fn update_car_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCarTypeRequest>,
) -> Result<Json<ApiResponse<CarType>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.update_car_type(id, request).await?;
    Ok(Json(response))
}

async fn delete_car_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = CarController::new(state.pool.clone());
    let response = controller.delete_car_type(id).await?;
    Ok(Json(response))
}
