//! Rutas de operación diaria del personal: despacho de entregas y
//! recogidas, cierres en mostrador, averías y mantenimiento.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::dto::booking_dto::BookingResponse;
use crate::dto::task_dto::{
    CompleteMaintenanceRequest, DamageReportRequest, DispatchRow, MaintenanceRow, TaskHistoryRow,
    TaskResponse,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::maintenance::Maintenance;
use crate::repositories::payment_repository::PaymentHistoryRow;
use crate::services::{BookingService, MaintenanceService, TaskService};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_staff_router() -> Router<AppState> {
    Router::new()
        .route("/deliveries/today", get(deliveries_today))
        .route("/takebacks/today", get(takebacks_today))
        .route("/self-pickups/today", get(self_pickups_today))
        .route("/self-dropoffs/today", get(self_dropoffs_today))
        .route("/bookings/:id/confirm", post(confirm_booking))
        .route("/bookings/:id/claim-delivery", post(claim_delivery))
        .route("/bookings/:id/claim-takeback", post(claim_takeback))
        .route("/bookings/:id/no-show-delivery", post(no_show_delivery))
        .route("/self-pickups/:ticket/complete", post(complete_self_pickup))
        .route("/self-pickups/:ticket/no-show", post(no_show_self_pickup))
        .route("/self-dropoffs/:ticket/complete", post(complete_self_dropoff))
        .route("/tasks/active", get(active_tasks))
        .route("/tasks/history", get(task_history))
        .route("/tasks/:id/complete-delivery", post(complete_delivery))
        .route("/tasks/:id/complete-takeback", post(complete_takeback))
        .route("/tasks/:id/abandon", post(abandon_task))
        .route("/damage", post(report_damage))
        .route("/maintenance/pending", get(pending_maintenance))
        .route("/maintenance/:id/complete", post(complete_maintenance))
        .route("/maintenance/history", get(maintenance_history))
        .route("/payments/history", get(payment_history))
}

fn booking_service(state: &AppState) -> BookingService {
    BookingService::new(state.pool.clone(), state.config.clone(), state.mailer.clone())
}

async fn deliveries_today(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<DispatchRow>>>, AppError> {
    let rows = booking_service(&state).delivery_dispatch(&user).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn takebacks_today(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<DispatchRow>>>, AppError> {
    let rows = booking_service(&state).takeback_dispatch(&user).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn self_pickups_today(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<DispatchRow>>>, AppError> {
    let rows = booking_service(&state).self_pickup_dispatch(&user).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn self_dropoffs_today(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<DispatchRow>>>, AppError> {
    let rows = booking_service(&state).self_dropoff_dispatch(&user).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state).confirm_booking(id).await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Reserva confirmada".to_string(),
    )))
}

async fn claim_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TaskResponse>>, AppError> {
    let service = TaskService::new(state.pool.clone());
    let task = service.claim_delivery(&user, id).await?;
    Ok(Json(ApiResponse::success_with_message(
        task,
        "Entrega reclamada".to_string(),
    )))
}

async fn claim_takeback(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TaskResponse>>, AppError> {
    let service = TaskService::new(state.pool.clone());
    let task = service.claim_takeback(&user, id).await?;
    Ok(Json(ApiResponse::success_with_message(
        task,
        "Recogida reclamada".to_string(),
    )))
}

async fn no_show_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .mark_no_show_delivery(&user, id)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "No-show registrado".to_string(),
    )))
}

async fn complete_self_pickup(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(ticket): Path<String>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .complete_self_pickup(&user, &ticket)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Coche entregado al cliente".to_string(),
    )))
}

async fn no_show_self_pickup(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(ticket): Path<String>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .mark_no_show_self_pickup(&user, &ticket)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "No-show registrado".to_string(),
    )))
}

async fn complete_self_dropoff(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(ticket): Path<String>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .complete_self_dropoff(&user, &ticket)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Devolución completada".to_string(),
    )))
}

async fn active_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<TaskResponse>>>, AppError> {
    let service = TaskService::new(state.pool.clone());
    let tasks = service.active_tasks(&user).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

async fn task_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<TaskHistoryRow>>>, AppError> {
    let service = TaskService::new(state.pool.clone());
    let tasks = service.task_history(&user).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

async fn complete_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .complete_delivery_by_task(&user, id)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Entrega completada y cobrada".to_string(),
    )))
}

async fn complete_takeback(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let booking = booking_service(&state)
        .complete_takeback_by_task(&user, id)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        booking,
        "Recogida completada".to_string(),
    )))
}

async fn abandon_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let service = TaskService::new(state.pool.clone());
    service.abandon_task(&user, id).await?;
    Ok(Json(ApiResponse::success_with_message(
        (),
        "Tarea abandonada".to_string(),
    )))
}

async fn report_damage(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<DamageReportRequest>,
) -> Result<Json<ApiResponse<Maintenance>>, AppError> {
    let service = MaintenanceService::new(state.pool.clone());
    let maintenance = service.report_damage(&user, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        maintenance,
        "Avería registrada, coche retirado del catálogo".to_string(),
    )))
}

async fn pending_maintenance(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MaintenanceRow>>>, AppError> {
    let service = MaintenanceService::new(state.pool.clone());
    let rows = service.pending_maintenance().await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn complete_maintenance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteMaintenanceRequest>,
) -> Result<Json<ApiResponse<Maintenance>>, AppError> {
    let service = MaintenanceService::new(state.pool.clone());
    let maintenance = service.complete_maintenance(&user, id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        maintenance,
        "Mantenimiento completado, coche disponible de nuevo".to_string(),
    )))
}

async fn maintenance_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<MaintenanceRow>>>, AppError> {
    let service = MaintenanceService::new(state.pool.clone());
    let rows = service.maintenance_history(&user).await?;
    Ok(Json(ApiResponse::success(rows)))
}

async fn payment_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<PaymentHistoryRow>>>, AppError> {
    let service = TaskService::new(state.pool.clone());
    let rows = service.payment_history(&user).await?;
    Ok(Json(ApiResponse::success(rows)))
}
