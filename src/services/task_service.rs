//! Tareas del personal
//!
//! Reclamo de entregas y recogidas, tareas activas e historiales.
//! El reclamo es de un solo ganador: el índice único parcial de la
//! tabla tasks rechaza al segundo empleado con AlreadyClaimed.

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::task_dto::{TaskHistoryRow, TaskResponse};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::booking::BookingStatus;
use crate::models::task::TaskType;
use crate::repositories::payment_repository::PaymentHistoryRow;
use crate::repositories::{BookingRepository, CarRepository, PaymentRepository, TaskRepository};
use crate::utils::errors::AppError;

pub struct TaskService {
    tasks: TaskRepository,
    bookings: BookingRepository,
    cars: CarRepository,
    payments: PaymentRepository,
}

impl TaskService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tasks: TaskRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            cars: CarRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool),
        }
    }

    /// Reclama la entrega a domicilio de una reserva
    pub async fn claim_delivery(
        &self,
        staff: &AuthenticatedUser,
        booking_id: Uuid,
    ) -> Result<TaskResponse, AppError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        if !booking.deliver_need {
            return Err(AppError::InvalidState(
                "Esta reserva no tiene entrega a domicilio".to_string(),
            ));
        }
        if !matches!(
            booking.booking_status,
            BookingStatus::Pending | BookingStatus::Confirmed
        ) {
            return Err(AppError::InvalidState(format!(
                "No se puede reclamar una reserva en estado '{}'",
                booking.booking_status.as_str()
            )));
        }
        if let Some(office_id) = booking.delivery_office_id {
            staff.ensure_office(office_id)?;
        }

        let car = self
            .cars
            .find_by_id(booking.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coche no encontrado".to_string()))?;

        let description = format!(
            "Entrega de {} ({}) para el ticket {}",
            car.model, car.license_plate, booking.ticket_number
        );

        let task = self
            .tasks
            .claim(booking_id, TaskType::Delivery, staff.user_id, &description)
            .await?;

        log::info!(
            "🚚 Entrega del ticket {} reclamada por {}",
            booking.ticket_number,
            staff.user_id
        );
        Ok(TaskResponse::from(task))
    }

    /// Reclama la recogida a domicilio de una reserva en alquiler
    pub async fn claim_takeback(
        &self,
        staff: &AuthenticatedUser,
        booking_id: Uuid,
    ) -> Result<TaskResponse, AppError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        if !booking.take_back_need {
            return Err(AppError::InvalidState(
                "Esta reserva no tiene recogida a domicilio".to_string(),
            ));
        }
        if booking.booking_status != BookingStatus::OnRent {
            return Err(AppError::InvalidState(format!(
                "No se puede reclamar una recogida en estado '{}'",
                booking.booking_status.as_str()
            )));
        }
        if let Some(office_id) = booking.takeback_office_id {
            staff.ensure_office(office_id)?;
        }

        let car = self
            .cars
            .find_by_id(booking.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coche no encontrado".to_string()))?;

        let description = format!(
            "Recogida de {} ({}) para el ticket {}",
            car.model, car.license_plate, booking.ticket_number
        );

        let task = self
            .tasks
            .claim(booking_id, TaskType::TakeBack, staff.user_id, &description)
            .await?;

        log::info!(
            "🚚 Recogida del ticket {} reclamada por {}",
            booking.ticket_number,
            staff.user_id
        );
        Ok(TaskResponse::from(task))
    }

    pub async fn active_tasks(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<TaskResponse>, AppError> {
        let tasks = self.tasks.list_active_by_staff(staff.user_id).await?;
        Ok(tasks.into_iter().map(TaskResponse::from).collect())
    }

    pub async fn task_history(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<TaskHistoryRow>, AppError> {
        self.tasks.history_by_staff(staff.user_id).await
    }

    pub async fn abandon_task(
        &self,
        staff: &AuthenticatedUser,
        task_id: Uuid,
    ) -> Result<(), AppError> {
        self.tasks.abandon(task_id, staff.user_id).await
    }

    pub async fn payment_history(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<PaymentHistoryRow>, AppError> {
        self.payments.history_by_staff(staff.user_id).await
    }
}
