use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::dto::booking_dto::{
    BookingCostResponse, BookingListQuery, BookingListResponse, BookingResponse,
    CancelBookingRequest, CreateBookingRequest, MyBookingRow,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::services::BookingService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rutas de reserva del propio cliente
pub fn create_booking_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/mine", get(my_bookings))
        .route("/:id/cancel", post(cancel_booking))
        .route("/cost/:ticket", get(booking_cost))
}

/// Listado global de reservas para personal y administradores
pub fn create_booking_listing_router() -> Router<AppState> {
    Router::new().route("/", get(list_bookings))
}

fn booking_service(state: &AppState) -> BookingService {
    BookingService::new(state.pool.clone(), state.config.clone(), state.mailer.clone())
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .create_booking(user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Reserva creada exitosamente".to_string(),
    )))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<MyBookingRow>>>, AppError> {
    let bookings = booking_service(&state).my_bookings(user.user_id).await?;
    Ok(Json(ApiResponse::success(bookings)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .cancel_booking(user.user_id, id, request.reason)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Reserva cancelada".to_string(),
    )))
}

async fn booking_cost(
    State(state): State<AppState>,
    Path(ticket): Path<String>,
) -> Result<Json<ApiResponse<BookingCostResponse>>, AppError> {
    let cost = booking_service(&state).cost_by_ticket(&ticket).await?;
    Ok(Json(ApiResponse::success(cost)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<ApiResponse<BookingListResponse>>, AppError> {
    let listing = booking_service(&state).list_bookings(&query, &user).await?;
    Ok(Json(ApiResponse::success(listing)))
}
