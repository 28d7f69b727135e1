use crate::dto::booking_dto::{BookingListQuery, BookingListRow, MyBookingRow};
use crate::dto::task_dto::DispatchCandidate;
use crate::models::booking::{Booking, BookingStatus};
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Fila del desglose de cobro por ticket
#[derive(Debug, sqlx::FromRow)]
pub struct CostLookupRow {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub booking_status: BookingStatus,
    pub total_amount: Decimal,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    pub customer_name: String,
    pub customer_phone: String,
    pub no_show_count: i32,
    pub cancellation_count: i32,
    pub car_model: String,
    pub license_plate: String,
}

pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        let result = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                booking_id, ticket_number, user_id, car_id,
                pickup_datetime, dropoff_datetime,
                pickup_latitude, pickup_longitude, dropoff_latitude, dropoff_longitude,
                total_amount, booking_status, deliver_need, take_back_need,
                delivery_office_id, takeback_office_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING *
            "#,
        )
        .bind(booking.booking_id)
        .bind(&booking.ticket_number)
        .bind(booking.user_id)
        .bind(booking.car_id)
        .bind(booking.pickup_datetime)
        .bind(booking.dropoff_datetime)
        .bind(booking.pickup_latitude)
        .bind(booking.pickup_longitude)
        .bind(booking.dropoff_latitude)
        .bind(booking.dropoff_longitude)
        .bind(booking.total_amount)
        .bind(booking.booking_status)
        .bind(booking.deliver_need)
        .bind(booking.take_back_need)
        .bind(booking.delivery_office_id)
        .bind(booking.takeback_office_id)
        .bind(booking.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error creating booking: {}", e)))?;

        Ok(result)
    }

    pub async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>, AppError> {
        let result = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error finding booking: {}", e)))?;

        Ok(result)
    }

    pub async fn ticket_exists(&self, ticket_number: &str) -> Result<bool, AppError> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM bookings WHERE ticket_number = $1)")
                .bind(ticket_number)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error checking ticket: {}", e)))?;

        Ok(result.0)
    }

    /// Historial del cliente con la marca de reseña ya escrita
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<MyBookingRow>, AppError> {
        let result = sqlx::query_as::<_, MyBookingRow>(
            r#"
            SELECT
                b.booking_id, b.ticket_number, b.car_id, c.model AS car_model,
                p.photo_path AS car_photo,
                b.pickup_datetime, b.dropoff_datetime, b.booking_status, b.total_amount,
                b.deliver_need, b.take_back_need, b.cancellation_reason,
                EXISTS(
                    SELECT 1 FROM reviews r
                    WHERE r.booking_id = b.booking_id AND r.user_id = b.user_id
                ) AS has_reviewed,
                b.created_at
            FROM bookings b
            JOIN cars c ON c.car_id = b.car_id
            LEFT JOIN photo_paths p ON p.photo_path_id = c.photo_path_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing user bookings: {}", e)))?;

        Ok(result)
    }

    /// Listado administrativo con filtros dinámicos.
    /// Si staff_scope viene (oficina y usuario del empleado), solo se
    /// devuelven reservas que tocan su oficina o que él mismo cerró.
    pub async fn list(
        &self,
        query: &BookingListQuery,
        staff_scope: Option<(i32, Uuid)>,
    ) -> Result<(Vec<BookingListRow>, i64, Decimal), AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let status = match &query.status {
            Some(s) => Some(parse_status(s)?),
            None => None,
        };

        let mut conditions: Vec<String> = Vec::new();
        let mut idx = 1;
        if status.is_some() {
            conditions.push(format!("b.booking_status = ${}", idx));
            idx += 1;
        }
        // El scope del empleado manda sobre el filtro explícito de oficina
        if staff_scope.is_some() {
            conditions.push(format!(
                "(b.delivery_office_id = ${0} OR b.takeback_office_id = ${0} OR b.complete_by = ${1})",
                idx,
                idx + 1
            ));
            idx += 2;
        } else if query.office_id.is_some() {
            conditions.push(format!(
                "(b.delivery_office_id = ${0} OR b.takeback_office_id = ${0} OR c.office_location_id = ${0})",
                idx
            ));
            idx += 1;
        }
        if query.search.is_some() {
            conditions.push(format!(
                "(b.ticket_number ILIKE ${0} OR u.name ILIKE ${0} OR c.model ILIKE ${0} OR c.license_plate ILIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.deliver_need.is_some() {
            conditions.push(format!("b.deliver_need = ${}", idx));
            idx += 1;
        }
        if query.take_back_need.is_some() {
            conditions.push(format!("b.take_back_need = ${}", idx));
            idx += 1;
        }
        if query.car_type_id.is_some() {
            conditions.push(format!("c.car_type_id = ${}", idx));
            idx += 1;
        }
        if query.from_date.is_some() {
            conditions.push(format!("b.pickup_datetime >= ${}", idx));
            idx += 1;
        }
        if query.to_date.is_some() {
            conditions.push(format!("b.pickup_datetime <= ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Columnas de orden acotadas a una lista blanca, nunca se
        // interpola la entrada del cliente
        let sort_column = match query.sort_by.as_deref() {
            Some("pickup_datetime") => "b.pickup_datetime",
            Some("total_amount") => "b.total_amount",
            Some("rating") => "COALESCE(ar.avg_rating, 0)",
            _ => "b.created_at",
        };
        let sort_dir = match query.sort_order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };

        let sql = format!(
            r#"
            SELECT
                b.booking_id, b.ticket_number,
                u.name AS customer_name, u.phone AS customer_phone,
                c.model AS car_model, c.license_plate,
                b.pickup_datetime, b.dropoff_datetime, b.booking_status, b.total_amount,
                b.deliver_need, b.take_back_need,
                od.location_name AS delivery_office,
                ot.location_name AS takeback_office,
                b.created_at
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            LEFT JOIN office_locations od ON od.office_location_id = b.delivery_office_id
            LEFT JOIN office_locations ot ON ot.office_location_id = b.takeback_office_id
            LEFT JOIN (
                SELECT b2.car_id, AVG(r.rating)::float8 AS avg_rating
                FROM reviews r
                JOIN bookings b2 ON b2.booking_id = r.booking_id
                GROUP BY b2.car_id
            ) ar ON ar.car_id = b.car_id
            {}
            ORDER BY {} {}
            LIMIT {} OFFSET {}
            "#,
            where_clause, sort_column, sort_dir, per_page, offset
        );

        let mut rows_query = sqlx::query_as::<_, BookingListRow>(&sql);
        if let Some(status) = status {
            rows_query = rows_query.bind(status);
        }
        if let Some((office_id, staff_id)) = staff_scope {
            rows_query = rows_query.bind(office_id).bind(staff_id);
        } else if let Some(office_id) = query.office_id {
            rows_query = rows_query.bind(office_id);
        }
        if let Some(search) = &query.search {
            rows_query = rows_query.bind(format!("%{}%", search));
        }
        if let Some(deliver_need) = query.deliver_need {
            rows_query = rows_query.bind(deliver_need);
        }
        if let Some(take_back_need) = query.take_back_need {
            rows_query = rows_query.bind(take_back_need);
        }
        if let Some(car_type_id) = query.car_type_id {
            rows_query = rows_query.bind(car_type_id);
        }
        if let Some(from_date) = query.from_date {
            rows_query = rows_query.bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            rows_query = rows_query.bind(to_date);
        }

        let bookings = rows_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error listing bookings: {}", e)))?;

        let count_sql = format!(
            r#"
            SELECT COUNT(*), COALESCE(SUM(b.total_amount), 0)
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            {}
            "#,
            where_clause
        );

        let mut count_query = sqlx::query_as::<_, (i64, Decimal)>(&count_sql);
        if let Some(status) = status {
            count_query = count_query.bind(status);
        }
        if let Some((office_id, staff_id)) = staff_scope {
            count_query = count_query.bind(office_id).bind(staff_id);
        } else if let Some(office_id) = query.office_id {
            count_query = count_query.bind(office_id);
        }
        if let Some(search) = &query.search {
            count_query = count_query.bind(format!("%{}%", search));
        }
        if let Some(deliver_need) = query.deliver_need {
            count_query = count_query.bind(deliver_need);
        }
        if let Some(take_back_need) = query.take_back_need {
            count_query = count_query.bind(take_back_need);
        }
        if let Some(car_type_id) = query.car_type_id {
            count_query = count_query.bind(car_type_id);
        }
        if let Some(from_date) = query.from_date {
            count_query = count_query.bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            count_query = count_query.bind(to_date);
        }

        let (total, total_amount_sum) = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error counting bookings: {}", e)))?;

        Ok((bookings, total, total_amount_sum))
    }

    /// Desglose de cobro por número de ticket
    pub async fn cost_lookup(&self, ticket_number: &str) -> Result<Option<CostLookupRow>, AppError> {
        let result = sqlx::query_as::<_, CostLookupRow>(
            r#"
            SELECT
                b.booking_id, b.ticket_number, b.booking_status, b.total_amount,
                b.pickup_datetime, b.dropoff_datetime,
                u.name AS customer_name, u.phone AS customer_phone,
                u.no_show_count, u.cancellation_count,
                c.model AS car_model, c.license_plate
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            WHERE b.ticket_number = $1
            "#,
        )
        .bind(ticket_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error looking up booking cost: {}", e)))?;

        Ok(result)
    }

    /// Entregas a domicilio sin reclamar, más antiguas primero
    pub async fn delivery_candidates(
        &self,
        office_id: Option<i32>,
    ) -> Result<Vec<DispatchCandidate>, AppError> {
        let office_condition = if office_id.is_some() {
            "AND b.delivery_office_id = $1"
        } else {
            ""
        };

        let sql = format!(
            r#"
            SELECT
                b.booking_id, b.ticket_number,
                u.name AS customer_name, u.phone AS customer_phone,
                c.model AS car_model, c.license_plate,
                b.pickup_latitude AS latitude, b.pickup_longitude AS longitude,
                b.pickup_datetime AS scheduled_at, b.total_amount
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            WHERE b.deliver_need = TRUE
              AND b.booking_status IN ('pending', 'confirmed')
              AND b.pickup_datetime::date <= CURRENT_DATE
              AND NOT EXISTS (
                  SELECT 1 FROM tasks t
                  WHERE t.booking_id = b.booking_id
                    AND t.task_type = 'delivery'
                    AND t.status IN ('in_progress', 'completed')
              )
              {}
            ORDER BY b.pickup_datetime ASC
            "#,
            office_condition
        );

        let mut rows_query = sqlx::query_as::<_, DispatchCandidate>(&sql);
        if let Some(office_id) = office_id {
            rows_query = rows_query.bind(office_id);
        }

        let result = rows_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error listing deliveries: {}", e)))?;

        Ok(result)
    }

    /// Recogidas a domicilio pendientes de coches en alquiler
    pub async fn takeback_candidates(
        &self,
        office_id: Option<i32>,
    ) -> Result<Vec<DispatchCandidate>, AppError> {
        let office_condition = if office_id.is_some() {
            "AND b.takeback_office_id = $1"
        } else {
            ""
        };

        let sql = format!(
            r#"
            SELECT
                b.booking_id, b.ticket_number,
                u.name AS customer_name, u.phone AS customer_phone,
                c.model AS car_model, c.license_plate,
                b.dropoff_latitude AS latitude, b.dropoff_longitude AS longitude,
                b.dropoff_datetime AS scheduled_at, b.total_amount
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            WHERE b.take_back_need = TRUE
              AND b.booking_status = 'on_rent'
              AND b.dropoff_datetime::date <= CURRENT_DATE
              AND NOT EXISTS (
                  SELECT 1 FROM tasks t
                  WHERE t.booking_id = b.booking_id
                    AND t.task_type = 'take_back'
                    AND t.status IN ('in_progress', 'completed')
              )
              {}
            ORDER BY b.dropoff_datetime ASC
            "#,
            office_condition
        );

        let mut rows_query = sqlx::query_as::<_, DispatchCandidate>(&sql);
        if let Some(office_id) = office_id {
            rows_query = rows_query.bind(office_id);
        }

        let result = rows_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error listing takebacks: {}", e)))?;

        Ok(result)
    }

    /// Recogidas en mostrador previstas para hoy (o ya vencidas)
    pub async fn self_pickup_candidates(&self) -> Result<Vec<DispatchCandidate>, AppError> {
        let result = sqlx::query_as::<_, DispatchCandidate>(
            r#"
            SELECT
                b.booking_id, b.ticket_number,
                u.name AS customer_name, u.phone AS customer_phone,
                c.model AS car_model, c.license_plate,
                b.pickup_latitude AS latitude, b.pickup_longitude AS longitude,
                b.pickup_datetime AS scheduled_at, b.total_amount
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            WHERE b.deliver_need = FALSE
              AND b.booking_status IN ('pending', 'confirmed')
              AND b.pickup_datetime::date <= CURRENT_DATE
            ORDER BY b.pickup_datetime ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing self pickups: {}", e)))?;

        Ok(result)
    }

    /// Devoluciones en mostrador previstas para hoy (o ya vencidas)
    pub async fn self_dropoff_candidates(&self) -> Result<Vec<DispatchCandidate>, AppError> {
        let result = sqlx::query_as::<_, DispatchCandidate>(
            r#"
            SELECT
                b.booking_id, b.ticket_number,
                u.name AS customer_name, u.phone AS customer_phone,
                c.model AS car_model, c.license_plate,
                b.dropoff_latitude AS latitude, b.dropoff_longitude AS longitude,
                b.dropoff_datetime AS scheduled_at, b.total_amount
            FROM bookings b
            JOIN users u ON u.user_id = b.user_id
            JOIN cars c ON c.car_id = b.car_id
            WHERE b.take_back_need = FALSE
              AND b.booking_status = 'on_rent'
              AND b.dropoff_datetime::date <= CURRENT_DATE
            ORDER BY b.dropoff_datetime ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing self dropoffs: {}", e)))?;

        Ok(result)
    }
}

fn parse_status(s: &str) -> Result<BookingStatus, AppError> {
    match s {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "on_rent" => Ok(BookingStatus::OnRent),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        other => Err(AppError::ValidationError(format!(
            "Estado de reserva desconocido: '{}'",
            other
        ))),
    }
}
