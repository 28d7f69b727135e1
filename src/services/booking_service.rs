//! Motor de reservas
//!
//! Este módulo concentra el ciclo de vida completo de una reserva:
//! creación con reclamo atómico del coche, cancelación, entregas,
//! recogidas, no-shows y el despacho de trabajo del personal.
//!
//! Las operaciones de cierre usan transacciones explícitas con
//! SELECT ... FOR UPDATE para que dos empleados no puedan cerrar la
//! misma reserva a la vez.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{DispatchOrdering, EnvironmentConfig};
use crate::dto::booking_dto::{
    BookingCostResponse, BookingListQuery, BookingListResponse, BookingResponse,
    CreateBookingRequest, MyBookingRow,
};
use crate::dto::task_dto::{DispatchCandidate, DispatchRow};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::task::{Task, TaskType};
use crate::repositories::{
    BookingRepository, CarRepository, OfficeRepository, TaskRepository, UserRepository,
};
use crate::services::mailer::{booking_confirmation_email, Mailer};
use crate::services::office_assignment::{resolve_office, OfficeCapability};
use crate::services::ticket_service::unique_ticket_number;
use crate::utils::errors::AppError;
use crate::utils::geo::distance_km;
use validator::Validate;

/// Motivo fijo que deja el empleado cuando el cliente no aparece
pub const NO_SHOW_REASON: &str = "No-show: Customer not at pickup location";

// ----------------------------------------------------------------------
// Reglas puras de tarifas y multas
// ----------------------------------------------------------------------

/// Horas facturables del tramo: toda hora empezada se cobra entera
pub fn rental_hours(pickup: DateTime<Utc>, dropoff: DateTime<Utc>) -> i64 {
    let seconds = (dropoff - pickup).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + 3599) / 3600
}

/// Regla de tarifas: menos de 24 horas se cobra por hora; a partir de
/// ahí, días completos a tarifa diaria más las horas sueltas.
pub fn rental_quote(hours: i64, price_per_hour: Decimal, price_per_day: Decimal) -> Decimal {
    if hours < 24 {
        Decimal::from(hours) * price_per_hour
    } else {
        Decimal::from(hours / 24) * price_per_day + Decimal::from(hours % 24) * price_per_hour
    }
}

/// Multa acumulada del cliente según sus contadores
pub fn outstanding_fine(
    no_show_count: i32,
    cancellation_count: i32,
    fine_no_show: i64,
    fine_cancel: i64,
) -> Decimal {
    Decimal::from(no_show_count as i64 * fine_no_show)
        + Decimal::from(cancellation_count as i64 * fine_cancel)
}

/// Construye las filas de despacho y las ordena según la política.
///
/// Con ordenamiento por tiempo: vencidas primero, luego hora programada
/// ascendente. Con ordenamiento por distancia: vencidas primero, luego
/// puntuación distancia_km + max(0, minutos_restantes) / 60 ascendente.
/// Sin oficina de origen no hay distancias y se cae al orden por tiempo.
pub fn build_dispatch_rows(
    candidates: Vec<DispatchCandidate>,
    origin: Option<(f64, f64)>,
    ordering: DispatchOrdering,
    now: DateTime<Utc>,
) -> Vec<DispatchRow> {
    let mut rows: Vec<DispatchRow> = candidates
        .into_iter()
        .map(|c| {
            let minutes_until = (c.scheduled_at - now).num_minutes();
            let distance = origin.map(|(lat, lng)| distance_km(lat, lng, c.latitude, c.longitude));
            DispatchRow {
                booking_id: c.booking_id,
                ticket_number: c.ticket_number,
                customer_name: c.customer_name,
                customer_phone: c.customer_phone,
                car_model: c.car_model,
                license_plate: c.license_plate,
                latitude: c.latitude,
                longitude: c.longitude,
                scheduled_at: c.scheduled_at,
                total_amount: c.total_amount,
                minutes_until,
                is_overdue: c.scheduled_at < now,
                distance_km: distance,
            }
        })
        .collect();

    let by_distance = ordering == DispatchOrdering::Distance && origin.is_some();
    if by_distance {
        rows.sort_by(|a, b| {
            b.is_overdue
                .cmp(&a.is_overdue)
                .then_with(|| {
                    if a.is_overdue {
                        a.scheduled_at.cmp(&b.scheduled_at)
                    } else {
                        let score_a = urgency_score(a);
                        let score_b = urgency_score(b);
                        score_a
                            .partial_cmp(&score_b)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    }
                })
        });
    } else {
        rows.sort_by(|a, b| {
            b.is_overdue
                .cmp(&a.is_overdue)
                .then_with(|| a.scheduled_at.cmp(&b.scheduled_at))
        });
    }

    rows
}

fn urgency_score(row: &DispatchRow) -> f64 {
    row.distance_km.unwrap_or(0.0) + (row.minutes_until.max(0) as f64) / 60.0
}

// ----------------------------------------------------------------------
// Servicio
// ----------------------------------------------------------------------

pub struct BookingService {
    pool: PgPool,
    config: EnvironmentConfig,
    mailer: Arc<dyn Mailer>,
    bookings: BookingRepository,
    cars: CarRepository,
    offices: OfficeRepository,
    users: UserRepository,
    tasks: TaskRepository,
}

impl BookingService {
    pub fn new(pool: PgPool, config: EnvironmentConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            cars: CarRepository::new(pool.clone()),
            offices: OfficeRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            pool,
            config,
            mailer,
        }
    }

    /// Crea una reserva reclamando el coche de forma atómica.
    ///
    /// Si la inserción falla después del reclamo, el coche se libera
    /// como compensación para no dejarlo bloqueado.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        request: CreateBookingRequest,
    ) -> Result<BookingResponse, AppError> {
        request.validate()?;

        if request.dropoff_datetime <= request.pickup_datetime {
            return Err(AppError::ValidationError(
                "La devolución debe ser posterior a la recogida".to_string(),
            ));
        }

        let now = Utc::now();
        let lead_time = Duration::hours(self.config.booking_lead_time_hours);
        if request.pickup_datetime < now + lead_time {
            return Err(AppError::ValidationError(format!(
                "La reserva debe hacerse con al menos {} horas de antelación",
                self.config.booking_lead_time_hours
            )));
        }

        let car = self
            .cars
            .find_by_id(request.car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coche no encontrado".to_string()))?;

        let customer = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Usuario no encontrado".to_string()))?;

        let hours = rental_hours(request.pickup_datetime, request.dropoff_datetime);
        let total_amount = rental_quote(hours, car.price_per_hour, car.price_per_day);

        // La necesidad de entrega/recogida no se pide: la decide el
        // resolutor según las coordenadas. Sin oficina en rango, la
        // reserva es de mostrador.
        let offices = self.offices.list_all().await?;
        let delivery_office_id = resolve_office(
            &self.config,
            &offices,
            request.pickup_latitude,
            request.pickup_longitude,
            OfficeCapability::Deliver,
        );
        let takeback_office_id = resolve_office(
            &self.config,
            &offices,
            request.dropoff_latitude,
            request.dropoff_longitude,
            OfficeCapability::TakeBack,
        );

        let ticket_number = unique_ticket_number(&self.bookings).await?;

        // Reclamo atómico: un solo UPDATE condicional decide el ganador
        if !self.cars.try_claim(request.car_id).await? {
            return Err(AppError::CarUnavailable(
                "El coche ya no está disponible".to_string(),
            ));
        }

        let booking = Booking {
            booking_id: Uuid::new_v4(),
            ticket_number,
            user_id,
            car_id: request.car_id,
            pickup_datetime: request.pickup_datetime,
            dropoff_datetime: request.dropoff_datetime,
            pickup_latitude: request.pickup_latitude,
            pickup_longitude: request.pickup_longitude,
            dropoff_latitude: request.dropoff_latitude,
            dropoff_longitude: request.dropoff_longitude,
            total_amount,
            booking_status: BookingStatus::Pending,
            deliver_need: delivery_office_id.is_some(),
            take_back_need: takeback_office_id.is_some(),
            delivery_office_id,
            takeback_office_id,
            complete_by: None,
            cancellation_reason: None,
            cancellation_date: None,
            created_at: now,
            updated_at: now,
        };

        let created = match self.bookings.create(&booking).await {
            Ok(created) => created,
            Err(e) => {
                // Compensación: el coche no puede quedar bloqueado
                if let Err(release_err) = self.cars.release(request.car_id).await {
                    log::error!(
                        "❌ Error liberando el coche {} tras fallo de reserva: {}",
                        request.car_id,
                        release_err
                    );
                }
                return Err(e);
            }
        };

        log::info!(
            "✅ Reserva {} creada para el coche {}",
            created.ticket_number,
            created.car_id
        );

        let mailer = self.mailer.clone();
        let (subject, body) = booking_confirmation_email(
            &customer.name,
            &created.ticket_number,
            &car.model,
            created.pickup_datetime,
        );
        let to = customer.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, body).await {
                log::error!("📧 Error enviando confirmación de reserva: {}", e);
            }
        });

        Ok(BookingResponse::from(created))
    }

    /// Confirma una reserva pendiente
    pub async fn confirm_booking(&self, booking_id: Uuid) -> Result<BookingResponse, AppError> {
        let result = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'confirmed', updated_at = NOW()
            WHERE booking_id = $1 AND booking_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error confirming booking: {}", e)))?;

        match result {
            Some(booking) => Ok(BookingResponse::from(booking)),
            None => {
                let existing = self.bookings.find_by_id(booking_id).await?;
                match existing {
                    Some(b) => Err(AppError::InvalidState(format!(
                        "No se puede confirmar una reserva en estado '{}'",
                        b.booking_status.as_str()
                    ))),
                    None => Err(AppError::NotFound("Reserva no encontrada".to_string())),
                }
            }
        }
    }

    /// Cancelación por el cliente, solo antes de que el coche salga
    pub async fn cancel_booking(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_id(&mut tx, booking_id).await?;

        if booking.user_id != user_id {
            return Err(AppError::Forbidden(
                "Solo el titular puede cancelar la reserva".to_string(),
            ));
        }
        if !booking.booking_status.can_cancel() {
            return Err(AppError::InvalidState(format!(
                "No se puede cancelar una reserva en estado '{}'",
                booking.booking_status.as_str()
            )));
        }

        let reason = reason.unwrap_or_else(|| "Cancelled by customer".to_string());

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'cancelled', cancellation_reason = $2,
                cancellation_date = NOW(), updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error cancelling booking: {}", e)))?;

        sqlx::query(
            "UPDATE users SET cancellation_count = cancellation_count + 1, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating cancellation count: {}", e)))?;

        release_car_tx(&mut tx, booking.car_id).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error cancelling booking: {}", e)))?;

        log::info!("✅ Reserva {} cancelada por el cliente", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    pub async fn my_bookings(&self, user_id: Uuid) -> Result<Vec<MyBookingRow>, AppError> {
        self.bookings.list_by_user(user_id).await
    }

    /// Listado administrativo. El personal con oficina asignada solo ve
    /// las reservas que tocan su oficina o que él mismo cerró; los
    /// admins lo ven todo.
    pub async fn list_bookings(
        &self,
        query: &BookingListQuery,
        principal: &AuthenticatedUser,
    ) -> Result<BookingListResponse, AppError> {
        let staff_scope = if principal.is_admin() {
            None
        } else {
            principal
                .office_location_id
                .map(|office_id| (office_id, principal.user_id))
        };

        let (bookings, total, total_amount_sum) = self.bookings.list(query, staff_scope).await?;

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let total_pages = (total + per_page - 1) / per_page;

        Ok(BookingListResponse {
            bookings,
            total,
            total_amount_sum,
            page,
            per_page,
            total_pages,
        })
    }

    /// Desglose de cobro que el personal consulta por número de ticket
    pub async fn cost_by_ticket(&self, ticket_number: &str) -> Result<BookingCostResponse, AppError> {
        let row = self
            .bookings
            .cost_lookup(ticket_number)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        let fine = outstanding_fine(
            row.no_show_count,
            row.cancellation_count,
            self.config.fine_no_show,
            self.config.fine_cancel,
        );

        Ok(BookingCostResponse {
            booking_id: row.booking_id,
            ticket_number: row.ticket_number,
            booking_status: row.booking_status,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            car_model: row.car_model,
            license_plate: row.license_plate,
            pickup_datetime: row.pickup_datetime,
            dropoff_datetime: row.dropoff_datetime,
            total_amount: row.total_amount,
            outstanding_fine: fine,
            grand_total: row.total_amount + fine,
        })
    }

    /// Cierre de una entrega a domicilio: el repartidor que reclamó la
    /// tarea entrega el coche y cobra el total más las multas pendientes.
    pub async fn complete_delivery(
        &self,
        staff: &AuthenticatedUser,
        booking_id: Uuid,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_id(&mut tx, booking_id).await?;
        ensure_delivery_booking(&booking)?;
        ensure_pickup_ready(&booking)?;

        let task = lock_active_task(&mut tx, booking_id, "delivery").await?;
        ensure_task_holder(&task, staff)?;

        complete_task_tx(&mut tx, task.task_id).await?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'on_rent', complete_by = $2, updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(staff.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating booking: {}", e)))?;

        self.settle_rental_payments(&mut tx, &updated, staff.user_id)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error completing delivery: {}", e)))?;

        log::info!("🚚 Entrega completada para la reserva {}", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    /// Cierre de una recogida a domicilio: el coche vuelve a estar libre
    pub async fn complete_takeback(
        &self,
        staff: &AuthenticatedUser,
        booking_id: Uuid,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_id(&mut tx, booking_id).await?;

        if !booking.take_back_need {
            return Err(AppError::InvalidState(
                "Esta reserva se devuelve en mostrador".to_string(),
            ));
        }
        if booking.booking_status != BookingStatus::OnRent {
            return Err(AppError::InvalidState(format!(
                "No se puede recoger una reserva en estado '{}'",
                booking.booking_status.as_str()
            )));
        }

        let task = lock_active_task(&mut tx, booking_id, "take_back").await?;
        ensure_task_holder(&task, staff)?;

        complete_task_tx(&mut tx, task.task_id).await?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'completed', complete_by = $2, updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(staff.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating booking: {}", e)))?;

        release_car_tx(&mut tx, booking.car_id).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error completing takeback: {}", e)))?;

        log::info!("✅ Recogida completada para la reserva {}", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    /// Cierra una entrega partiendo del identificador de la tarea
    pub async fn complete_delivery_by_task(
        &self,
        staff: &AuthenticatedUser,
        task_id: Uuid,
    ) -> Result<BookingResponse, AppError> {
        let booking_id = self.task_booking(task_id, TaskType::Delivery).await?;
        self.complete_delivery(staff, booking_id).await
    }

    /// Cierra una recogida partiendo del identificador de la tarea
    pub async fn complete_takeback_by_task(
        &self,
        staff: &AuthenticatedUser,
        task_id: Uuid,
    ) -> Result<BookingResponse, AppError> {
        let booking_id = self.task_booking(task_id, TaskType::TakeBack).await?;
        self.complete_takeback(staff, booking_id).await
    }

    async fn task_booking(&self, task_id: Uuid, expected: TaskType) -> Result<Uuid, AppError> {
        let task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tarea no encontrada".to_string()))?;

        if task.task_type != expected {
            return Err(AppError::InvalidState(
                "La tarea no es del tipo esperado para esta operación".to_string(),
            ));
        }
        task.booking_id.ok_or_else(|| {
            AppError::InvalidState("La tarea no está ligada a ninguna reserva".to_string())
        })
    }

    /// El cliente recoge el coche en mostrador presentando su ticket
    pub async fn complete_self_pickup(
        &self,
        staff: &AuthenticatedUser,
        ticket_number: &str,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_ticket(&mut tx, ticket_number).await?;

        if booking.deliver_need {
            return Err(AppError::InvalidState(
                "Esta reserva se entrega a domicilio".to_string(),
            ));
        }
        ensure_pickup_ready(&booking)?;

        let car_office = car_office_tx(&mut tx, booking.car_id).await?;
        staff.ensure_office(car_office)?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'on_rent', complete_by = $2, updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking.booking_id)
        .bind(staff.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating booking: {}", e)))?;

        self.settle_rental_payments(&mut tx, &updated, staff.user_id)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error completing pickup: {}", e)))?;

        log::info!("✅ Recogida en mostrador para la reserva {}", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    /// El cliente devuelve el coche en mostrador
    pub async fn complete_self_dropoff(
        &self,
        staff: &AuthenticatedUser,
        ticket_number: &str,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_ticket(&mut tx, ticket_number).await?;

        if booking.take_back_need {
            return Err(AppError::InvalidState(
                "Esta reserva se recoge a domicilio".to_string(),
            ));
        }
        if booking.booking_status != BookingStatus::OnRent {
            return Err(AppError::InvalidState(format!(
                "No se puede devolver una reserva en estado '{}'",
                booking.booking_status.as_str()
            )));
        }

        let car_office = car_office_tx(&mut tx, booking.car_id).await?;
        staff.ensure_office(car_office)?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'completed', complete_by = $2, updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking.booking_id)
        .bind(staff.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating booking: {}", e)))?;

        release_car_tx(&mut tx, booking.car_id).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error completing dropoff: {}", e)))?;

        log::info!("✅ Devolución en mostrador para la reserva {}", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    /// No-show en una entrega a domicilio reclamada por el repartidor
    pub async fn mark_no_show_delivery(
        &self,
        staff: &AuthenticatedUser,
        booking_id: Uuid,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_id(&mut tx, booking_id).await?;
        ensure_delivery_booking(&booking)?;
        ensure_pickup_ready(&booking)?;

        let task = lock_active_task(&mut tx, booking_id, "delivery").await?;
        ensure_task_holder(&task, staff)?;

        complete_task_tx(&mut tx, task.task_id).await?;

        let updated = self.apply_no_show(&mut tx, &booking, staff.user_id).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error marking no-show: {}", e)))?;

        log::warn!("❌ No-show registrado para la reserva {}", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    /// No-show de una recogida en mostrador
    pub async fn mark_no_show_self_pickup(
        &self,
        staff: &AuthenticatedUser,
        ticket_number: &str,
    ) -> Result<BookingResponse, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let booking = lock_booking_by_ticket(&mut tx, ticket_number).await?;

        if booking.deliver_need {
            return Err(AppError::InvalidState(
                "Esta reserva se entrega a domicilio".to_string(),
            ));
        }
        ensure_pickup_ready(&booking)?;
        ensure_pickup_time_passed(&booking)?;

        let car_office = car_office_tx(&mut tx, booking.car_id).await?;
        staff.ensure_office(car_office)?;

        let updated = self.apply_no_show(&mut tx, &booking, staff.user_id).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error marking no-show: {}", e)))?;

        log::warn!("❌ No-show registrado para la reserva {}", updated.ticket_number);
        Ok(BookingResponse::from(updated))
    }

    /// Entregas pendientes, ordenadas por urgencia
    pub async fn delivery_dispatch(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<DispatchRow>, AppError> {
        let office_scope = if staff.is_admin() {
            None
        } else {
            staff.office_location_id
        };

        let candidates = self.bookings.delivery_candidates(office_scope).await?;
        let origin = self.staff_origin(staff).await?;

        Ok(build_dispatch_rows(
            candidates,
            origin,
            self.config.dispatch_ordering,
            Utc::now(),
        ))
    }

    /// Recogidas pendientes, ordenadas por urgencia
    pub async fn takeback_dispatch(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<DispatchRow>, AppError> {
        let office_scope = if staff.is_admin() {
            None
        } else {
            staff.office_location_id
        };

        let candidates = self.bookings.takeback_candidates(office_scope).await?;
        let origin = self.staff_origin(staff).await?;

        Ok(build_dispatch_rows(
            candidates,
            origin,
            self.config.dispatch_ordering,
            Utc::now(),
        ))
    }

    /// Recogidas en mostrador de hoy, sin filtrar por oficina
    pub async fn self_pickup_dispatch(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<DispatchRow>, AppError> {
        let candidates = self.bookings.self_pickup_candidates().await?;
        let origin = self.staff_origin(staff).await?;

        Ok(build_dispatch_rows(
            candidates,
            origin,
            self.config.dispatch_ordering,
            Utc::now(),
        ))
    }

    /// Devoluciones en mostrador de hoy, sin filtrar por oficina
    pub async fn self_dropoff_dispatch(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<DispatchRow>, AppError> {
        let candidates = self.bookings.self_dropoff_candidates().await?;
        let origin = self.staff_origin(staff).await?;

        Ok(build_dispatch_rows(
            candidates,
            origin,
            self.config.dispatch_ordering,
            Utc::now(),
        ))
    }

    async fn staff_origin(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Option<(f64, f64)>, AppError> {
        match staff.office_location_id {
            Some(office_id) => Ok(self
                .offices
                .find_by_id(office_id)
                .await?
                .map(|o| (o.latitude, o.longitude))),
            None => Ok(None),
        }
    }

    /// Cobra la reserva y las multas pendientes en el mismo cierre.
    /// Pagar las multas deja los dos contadores del cliente a cero.
    async fn settle_rental_payments(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking: &Booking,
        staff_id: Uuid,
    ) -> Result<(), AppError> {
        let counters: (i32, i32) = sqlx::query_as(
            "SELECT no_show_count, cancellation_count FROM users WHERE user_id = $1 FOR UPDATE",
        )
        .bind(booking.user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error locking customer: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, user_id, staff_id, booking_id, payment_type, amount)
            VALUES ($1, $2, $3, $4, 'booking', $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.user_id)
        .bind(staff_id)
        .bind(booking.booking_id)
        .bind(booking.total_amount)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error recording payment: {}", e)))?;

        let fine = outstanding_fine(
            counters.0,
            counters.1,
            self.config.fine_no_show,
            self.config.fine_cancel,
        );

        if fine > Decimal::ZERO {
            sqlx::query(
                r#"
                INSERT INTO payments (payment_id, user_id, staff_id, booking_id, payment_type, amount)
                VALUES ($1, $2, $3, $4, 'fine', $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(booking.user_id)
            .bind(staff_id)
            .bind(booking.booking_id)
            .bind(fine)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error recording fine payment: {}", e)))?;

            sqlx::query(
                "UPDATE users SET no_show_count = 0, cancellation_count = 0, updated_at = NOW() WHERE user_id = $1",
            )
            .bind(booking.user_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error resetting fine counters: {}", e)))?;

            log::info!(
                "💰 Multa de {} cobrada junto a la reserva {}",
                fine,
                booking.ticket_number
            );
        }

        Ok(())
    }

    async fn apply_no_show(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking: &Booking,
        staff_id: Uuid,
    ) -> Result<Booking, AppError> {
        let updated = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET booking_status = 'cancelled', cancellation_reason = $2,
                cancellation_date = NOW(), complete_by = $3, updated_at = NOW()
            WHERE booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking.booking_id)
        .bind(NO_SHOW_REASON)
        .bind(staff_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error cancelling booking: {}", e)))?;

        sqlx::query(
            "UPDATE users SET no_show_count = no_show_count + 1, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(booking.user_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating no-show count: {}", e)))?;

        release_car_tx(tx, booking.car_id).await?;

        Ok(updated)
    }
}

// ----------------------------------------------------------------------
// Helpers transaccionales
// ----------------------------------------------------------------------

async fn lock_booking_by_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking_id: Uuid,
) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error locking booking: {}", e)))?
        .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))
}

async fn lock_booking_by_ticket(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ticket_number: &str,
) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE ticket_number = $1 FOR UPDATE")
        .bind(ticket_number)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error locking booking: {}", e)))?
        .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))
}

async fn lock_active_task(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    booking_id: Uuid,
    task_type: &str,
) -> Result<Task, AppError> {
    let sql = format!(
        "SELECT * FROM tasks WHERE booking_id = $1 AND task_type = '{}' AND status = 'in_progress' FOR UPDATE",
        task_type
    );

    sqlx::query_as::<_, Task>(&sql)
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error locking task: {}", e)))?
        .ok_or_else(|| {
            AppError::InvalidState("Nadie ha reclamado esta tarea todavía".to_string())
        })
}

async fn complete_task_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    task_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("UPDATE tasks SET status = 'completed', updated_at = NOW() WHERE task_id = $1")
        .bind(task_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error completing task: {}", e)))?;

    Ok(())
}

async fn release_car_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    car_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("UPDATE cars SET availability = TRUE, updated_at = NOW() WHERE car_id = $1")
        .bind(car_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error releasing car: {}", e)))?;

    Ok(())
}

async fn car_office_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    car_id: Uuid,
) -> Result<i32, AppError> {
    let row: (i32,) = sqlx::query_as("SELECT office_location_id FROM cars WHERE car_id = $1")
        .bind(car_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading car office: {}", e)))?;

    Ok(row.0)
}

fn ensure_delivery_booking(booking: &Booking) -> Result<(), AppError> {
    if !booking.deliver_need {
        return Err(AppError::InvalidState(
            "Esta reserva es de recogida en mostrador".to_string(),
        ));
    }
    Ok(())
}

fn ensure_pickup_ready(booking: &Booking) -> Result<(), AppError> {
    if !matches!(
        booking.booking_status,
        BookingStatus::Pending | BookingStatus::Confirmed
    ) {
        return Err(AppError::InvalidState(format!(
            "No se puede entregar una reserva en estado '{}'",
            booking.booking_status.as_str()
        )));
    }
    Ok(())
}

fn ensure_pickup_time_passed(booking: &Booking) -> Result<(), AppError> {
    if booking.pickup_datetime > Utc::now() {
        return Err(AppError::InvalidState(
            "Todavía no ha llegado la hora de recogida".to_string(),
        ));
    }
    Ok(())
}

fn ensure_task_holder(task: &Task, staff: &AuthenticatedUser) -> Result<(), AppError> {
    if task.assigned_staff_id != staff.user_id && !staff.is_admin() {
        return Err(AppError::Forbidden(
            "Otro empleado tiene reclamada esta tarea".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::TimeZone;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_rental_hours_rounds_up() {
        let pickup = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        assert_eq!(rental_hours(pickup, pickup + Duration::minutes(90)), 2);
        assert_eq!(rental_hours(pickup, pickup + Duration::hours(23)), 23);
        assert_eq!(rental_hours(pickup, pickup + Duration::hours(24)), 24);
        assert_eq!(rental_hours(pickup, pickup + Duration::seconds(1)), 1);
        assert_eq!(rental_hours(pickup, pickup), 0);
    }

    #[test]
    fn test_quote_under_one_day_uses_hourly_rate() {
        // 10 horas a 100/h
        assert_eq!(rental_quote(10, dec(100), dec(2000)), dec(1000));
        // 23 horas siguen siendo por hora aunque superen la tarifa diaria
        assert_eq!(rental_quote(23, dec(100), dec(2000)), dec(2300));
    }

    #[test]
    fn test_quote_full_days_plus_remainder() {
        // Exactamente un día
        assert_eq!(rental_quote(24, dec(100), dec(2000)), dec(2000));
        // Dos días y dos horas
        assert_eq!(rental_quote(50, dec(100), dec(2000)), dec(4200));
        // Tres días exactos
        assert_eq!(rental_quote(72, dec(100), dec(2000)), dec(6000));
    }

    #[test]
    fn test_outstanding_fine_is_multiplicative() {
        assert_eq!(outstanding_fine(0, 0, 10000, 3000), dec(0));
        assert_eq!(outstanding_fine(1, 0, 10000, 3000), dec(10000));
        assert_eq!(outstanding_fine(2, 1, 10000, 3000), dec(23000));
        assert_eq!(outstanding_fine(0, 3, 10000, 3000), dec(9000));
    }

    fn candidate(ticket: &str, scheduled_at: DateTime<Utc>, lat: f64, lng: f64) -> DispatchCandidate {
        DispatchCandidate {
            booking_id: Uuid::new_v4(),
            ticket_number: ticket.to_string(),
            customer_name: "Cliente".to_string(),
            customer_phone: "+9595550000".to_string(),
            car_model: "Toyota Vios".to_string(),
            license_plate: "YGN-1234".to_string(),
            latitude: lat,
            longitude: lng,
            scheduled_at,
            total_amount: dec(5000),
        }
    }

    #[test]
    fn test_dispatch_time_ordering_puts_overdue_first() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let candidates = vec![
            candidate("CR-FUTURE", now + Duration::hours(2), 16.80, 96.15),
            candidate("CR-OVERDUE", now - Duration::hours(1), 16.81, 96.15),
            candidate("CR-SOON", now + Duration::minutes(30), 16.82, 96.15),
        ];

        let rows = build_dispatch_rows(candidates, None, DispatchOrdering::Time, now);

        assert_eq!(rows[0].ticket_number, "CR-OVERDUE");
        assert!(rows[0].is_overdue);
        assert_eq!(rows[1].ticket_number, "CR-SOON");
        assert_eq!(rows[2].ticket_number, "CR-FUTURE");
        assert_eq!(rows[1].minutes_until, 30);
    }

    #[test]
    fn test_dispatch_distance_ordering_prefers_nearby() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let origin = Some((16.80, 96.15));
        // Ambas con la misma hora programada, solo cambia la distancia
        let candidates = vec![
            candidate("CR-FAR", now + Duration::hours(1), 17.25, 96.15),
            candidate("CR-NEAR", now + Duration::hours(1), 16.81, 96.15),
        ];

        let rows = build_dispatch_rows(candidates, origin, DispatchOrdering::Distance, now);

        assert_eq!(rows[0].ticket_number, "CR-NEAR");
        assert!(rows[0].distance_km.is_some());
    }

    #[test]
    fn test_dispatch_distance_ordering_keeps_overdue_first() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let origin = Some((16.80, 96.15));
        let candidates = vec![
            candidate("CR-NEAR", now + Duration::minutes(10), 16.801, 96.15),
            candidate("CR-OVERDUE-FAR", now - Duration::hours(3), 17.25, 96.15),
        ];

        let rows = build_dispatch_rows(candidates, origin, DispatchOrdering::Distance, now);

        // La vencida gana aunque esté mucho más lejos
        assert_eq!(rows[0].ticket_number, "CR-OVERDUE-FAR");
    }

    #[test]
    fn test_dispatch_distance_without_origin_falls_back_to_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let candidates = vec![
            candidate("CR-LATER", now + Duration::hours(2), 16.80, 96.15),
            candidate("CR-EARLIER", now + Duration::hours(1), 17.25, 96.15),
        ];

        let rows = build_dispatch_rows(candidates, None, DispatchOrdering::Distance, now);

        assert_eq!(rows[0].ticket_number, "CR-EARLIER");
        assert!(rows[0].distance_km.is_none());
    }

    #[test]
    fn test_staff_office_guard() {
        let staff = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Staff,
            office_location_id: Some(1),
        };
        let admin = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
            office_location_id: None,
        };

        assert!(staff.ensure_office(1).is_ok());
        assert!(staff.ensure_office(2).is_err());
        // Los admins no están atados a una oficina
        assert!(admin.ensure_office(2).is_ok());
    }
}
