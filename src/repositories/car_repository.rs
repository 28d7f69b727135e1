use crate::dto::car_dto::{
    CarListQuery, CarTypeRow, CarWithQuote, CreateCarRequest, CreateCarTypeRequest,
    UpdateCarRequest, UpdateCarTypeRequest,
};
use crate::models::car::{Car, CarType};
use crate::utils::errors::{is_unique_violation, AppError};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

pub struct CarRepository {
    pool: PgPool,
}

impl CarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Coches
    // ------------------------------------------------------------------

    pub async fn create(&self, request: &CreateCarRequest) -> Result<Car, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let photo_path_id = match &request.photo_path {
            Some(path) => {
                let row: (i32,) = sqlx::query_as(
                    "INSERT INTO photo_paths (photo_path) VALUES ($1) RETURNING photo_path_id",
                )
                .bind(path)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error creating photo: {}", e)))?;
                Some(row.0)
            }
            None => None,
        };

        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (
                car_id, car_type_id, office_location_id, model, license_plate,
                price_per_hour, price_per_day, availability, number_of_seats,
                luggage_capacity, color, transmission, fuel_type, photo_path_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.car_type_id)
        .bind(request.office_location_id)
        .bind(&request.model)
        .bind(&request.license_plate)
        .bind(request.price_per_hour)
        .bind(request.price_per_day)
        .bind(request.number_of_seats)
        .bind(request.luggage_capacity)
        .bind(&request.color)
        .bind(&request.transmission)
        .bind(&request.fuel_type)
        .bind(photo_path_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Ya existe un coche con la matrícula '{}'",
                    request.license_plate
                ))
            } else {
                AppError::DatabaseError(format!("Error creating car: {}", e))
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error creating car: {}", e)))?;

        Ok(car)
    }

    pub async fn find_by_id(&self, car_id: Uuid) -> Result<Option<Car>, AppError> {
        let result = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE car_id = $1")
            .bind(car_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error finding car: {}", e)))?;

        Ok(result)
    }

    /// Reclama el coche de forma atómica: disponible -> ocupado.
    /// Devuelve false si otro proceso lo reclamó antes.
    pub async fn try_claim(&self, car_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE cars SET availability = FALSE, updated_at = NOW() WHERE car_id = $1 AND availability = TRUE",
        )
        .bind(car_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error claiming car: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    /// Libera el coche. Idempotente: liberar un coche ya libre no es error.
    pub async fn release(&self, car_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE cars SET availability = TRUE, updated_at = NOW() WHERE car_id = $1")
            .bind(car_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error releasing car: {}", e)))?;

        Ok(())
    }

    /// Listado con filtros y presupuesto del tramo pedido.
    ///
    /// El presupuesto replica la regla de tarifas: menos de 24 horas se
    /// cobra por hora, a partir de ahí días completos más horas sueltas.
    pub async fn list_with_quote(
        &self,
        query: &CarListQuery,
        include_unavailable: bool,
    ) -> Result<(Vec<CarWithQuote>, i64), AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions: Vec<String> = Vec::new();
        if !include_unavailable {
            conditions.push("c.availability = TRUE".to_string());
        }

        // $1 y $2 quedan reservados para el tramo del presupuesto
        let mut idx = 3;
        if query.search.is_some() {
            conditions.push(format!(
                "(c.model ILIKE ${0} OR c.license_plate ILIKE ${0} OR ct.type_name ILIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.car_type_id.is_some() {
            conditions.push(format!("c.car_type_id = ${}", idx));
            idx += 1;
        }
        if query.office_id.is_some() {
            conditions.push(format!("c.office_location_id = ${}", idx));
            idx += 1;
        }
        if query.min_seats.is_some() {
            conditions.push(format!("c.number_of_seats >= ${}", idx));
            idx += 1;
        }
        if query.transmission.is_some() {
            conditions.push(format!("LOWER(c.transmission) = LOWER(${})", idx));
            idx += 1;
        }
        if query.fuel_type.is_some() {
            conditions.push(format!("LOWER(c.fuel_type) = LOWER(${})", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let order_clause = match query.sort.as_deref() {
            Some("price_asc") => "ORDER BY total_price ASC NULLS LAST, c.created_at DESC",
            Some("price_desc") => "ORDER BY total_price DESC NULLS LAST, c.created_at DESC",
            Some("hourly_asc") => "ORDER BY c.price_per_hour ASC, c.created_at DESC",
            Some("hourly_desc") => "ORDER BY c.price_per_hour DESC, c.created_at DESC",
            Some("daily_asc") => "ORDER BY c.price_per_day ASC, c.created_at DESC",
            Some("daily_desc") => "ORDER BY c.price_per_day DESC, c.created_at DESC",
            Some("rating") => "ORDER BY avg_rating DESC NULLS LAST, c.created_at DESC",
            _ => "ORDER BY c.created_at DESC",
        };

        let sql = format!(
            r#"
            SELECT
                c.car_id, c.car_type_id, ct.type_name,
                c.office_location_id, o.location_name AS office_name,
                c.model, c.license_plate, c.price_per_hour, c.price_per_day,
                c.availability, c.number_of_seats, c.luggage_capacity,
                c.color, c.transmission, c.fuel_type,
                p.photo_path,
                CASE
                    WHEN h.hours IS NULL THEN NULL
                    WHEN h.hours < 24 THEN h.hours * c.price_per_hour
                    ELSE (h.hours / 24) * c.price_per_day + (h.hours % 24) * c.price_per_hour
                END AS total_price,
                ra.avg_rating
            FROM cars c
            JOIN car_types ct ON ct.car_type_id = c.car_type_id
            JOIN office_locations o ON o.office_location_id = c.office_location_id
            LEFT JOIN photo_paths p ON p.photo_path_id = c.photo_path_id
            LEFT JOIN LATERAL (
                SELECT CEIL(EXTRACT(EPOCH FROM ($2::timestamptz - $1::timestamptz)) / 3600)::int AS hours
            ) h ON TRUE
            LEFT JOIN LATERAL (
                SELECT AVG(r.rating)::numeric(3,2) AS avg_rating
                FROM reviews r
                JOIN bookings b ON b.booking_id = r.booking_id
                WHERE b.car_id = c.car_id
            ) ra ON TRUE
            {}
            {}
            LIMIT {} OFFSET {}
            "#,
            where_clause, order_clause, per_page, offset
        );

        let mut rows_query = sqlx::query_as::<_, CarWithQuote>(&sql)
            .bind(query.pickup_datetime)
            .bind(query.dropoff_datetime);
        if let Some(search) = &query.search {
            rows_query = rows_query.bind(format!("%{}%", search));
        }
        if let Some(car_type_id) = query.car_type_id {
            rows_query = rows_query.bind(car_type_id);
        }
        if let Some(office_id) = query.office_id {
            rows_query = rows_query.bind(office_id);
        }
        if let Some(min_seats) = query.min_seats {
            rows_query = rows_query.bind(min_seats);
        }
        if let Some(transmission) = &query.transmission {
            rows_query = rows_query.bind(transmission);
        }
        if let Some(fuel_type) = &query.fuel_type {
            rows_query = rows_query.bind(fuel_type);
        }

        let cars = rows_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error listing cars: {}", e)))?;

        // La consulta de conteo renumera los placeholders desde $1
        let mut count_conditions: Vec<String> = Vec::new();
        if !include_unavailable {
            count_conditions.push("c.availability = TRUE".to_string());
        }
        let mut count_idx = 1;
        if query.search.is_some() {
            count_conditions.push(format!(
                "(c.model ILIKE ${0} OR c.license_plate ILIKE ${0} OR ct.type_name ILIKE ${0})",
                count_idx
            ));
            count_idx += 1;
        }
        if query.car_type_id.is_some() {
            count_conditions.push(format!("c.car_type_id = ${}", count_idx));
            count_idx += 1;
        }
        if query.office_id.is_some() {
            count_conditions.push(format!("c.office_location_id = ${}", count_idx));
            count_idx += 1;
        }
        if query.min_seats.is_some() {
            count_conditions.push(format!("c.number_of_seats >= ${}", count_idx));
            count_idx += 1;
        }
        if query.transmission.is_some() {
            count_conditions.push(format!("LOWER(c.transmission) = LOWER(${})", count_idx));
            count_idx += 1;
        }
        if query.fuel_type.is_some() {
            count_conditions.push(format!("LOWER(c.fuel_type) = LOWER(${})", count_idx));
        }

        let count_where = if count_conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", count_conditions.join(" AND "))
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM cars c JOIN car_types ct ON ct.car_type_id = c.car_type_id {}",
            count_where
        );

        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        if let Some(search) = &query.search {
            count_query = count_query.bind(format!("%{}%", search));
        }
        if let Some(car_type_id) = query.car_type_id {
            count_query = count_query.bind(car_type_id);
        }
        if let Some(office_id) = query.office_id {
            count_query = count_query.bind(office_id);
        }
        if let Some(min_seats) = query.min_seats {
            count_query = count_query.bind(min_seats);
        }
        if let Some(transmission) = &query.transmission {
            count_query = count_query.bind(transmission);
        }
        if let Some(fuel_type) = &query.fuel_type {
            count_query = count_query.bind(fuel_type);
        }

        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error counting cars: {}", e)))?;

        Ok((cars, total.0))
    }

    pub async fn update(&self, car_id: Uuid, request: &UpdateCarRequest) -> Result<Car, AppError> {
        let current = self
            .find_by_id(car_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coche no encontrado".to_string()))?;

        let photo_path_id = match &request.photo_path {
            Some(path) => {
                let row: (i32,) = sqlx::query_as(
                    "INSERT INTO photo_paths (photo_path) VALUES ($1) RETURNING photo_path_id",
                )
                .bind(path)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error creating photo: {}", e)))?;
                Some(row.0)
            }
            None => current.photo_path_id,
        };

        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars
            SET car_type_id = $2, office_location_id = $3, model = $4, license_plate = $5,
                price_per_hour = $6, price_per_day = $7, availability = $8,
                number_of_seats = $9, luggage_capacity = $10, color = $11,
                transmission = $12, fuel_type = $13, photo_path_id = $14, updated_at = NOW()
            WHERE car_id = $1
            RETURNING *
            "#,
        )
        .bind(car_id)
        .bind(request.car_type_id.unwrap_or(current.car_type_id))
        .bind(request.office_location_id.unwrap_or(current.office_location_id))
        .bind(request.model.clone().unwrap_or(current.model))
        .bind(request.license_plate.clone().unwrap_or(current.license_plate))
        .bind(request.price_per_hour.unwrap_or(current.price_per_hour))
        .bind(request.price_per_day.unwrap_or(current.price_per_day))
        .bind(request.availability.unwrap_or(current.availability))
        .bind(request.number_of_seats.unwrap_or(current.number_of_seats))
        .bind(request.luggage_capacity.unwrap_or(current.luggage_capacity))
        .bind(request.color.clone().unwrap_or(current.color))
        .bind(request.transmission.clone().unwrap_or(current.transmission))
        .bind(request.fuel_type.clone().unwrap_or(current.fuel_type))
        .bind(photo_path_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating car: {}", e)))?;

        Ok(car)
    }

    /// Borrado en dos fases: primero el coche deja de referenciar la foto,
    /// después se elimina la fila de photo_paths ya huérfana.
    pub async fn delete(&self, car_id: Uuid) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let current: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT photo_path_id FROM cars WHERE car_id = $1")
                .bind(car_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error finding car: {}", e)))?;

        let photo_path_id = match current {
            Some((photo,)) => photo,
            None => return Err(AppError::NotFound("Coche no encontrado".to_string())),
        };

        let has_bookings: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM bookings WHERE car_id = $1)")
                .bind(car_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error checking bookings: {}", e)))?;

        if has_bookings.0 {
            return Err(AppError::Conflict(
                "No se puede eliminar un coche con reservas asociadas".to_string(),
            ));
        }

        sqlx::query("DELETE FROM cars WHERE car_id = $1")
            .bind(car_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error deleting car: {}", e)))?;

        if let Some(photo_id) = photo_path_id {
            sqlx::query("DELETE FROM photo_paths WHERE photo_path_id = $1")
                .bind(photo_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error deleting photo: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error deleting car: {}", e)))?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Tipos de coche
    // ------------------------------------------------------------------

    pub async fn create_type(&self, request: &CreateCarTypeRequest) -> Result<CarType, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let photo_path_id = match &request.photo_path {
            Some(path) => {
                let row: (i32,) = sqlx::query_as(
                    "INSERT INTO photo_paths (photo_path) VALUES ($1) RETURNING photo_path_id",
                )
                .bind(path)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error creating photo: {}", e)))?;
                Some(row.0)
            }
            None => None,
        };

        let car_type = sqlx::query_as::<_, CarType>(
            r#"
            INSERT INTO car_types (type_name, description, photo_path_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&request.type_name)
        .bind(&request.description)
        .bind(photo_path_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Ya existe el tipo '{}'", request.type_name))
            } else {
                AppError::DatabaseError(format!("Error creating car type: {}", e))
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error creating car type: {}", e)))?;

        Ok(car_type)
    }

    pub async fn find_type_by_id(&self, car_type_id: i32) -> Result<Option<CarType>, AppError> {
        let result =
            sqlx::query_as::<_, CarType>("SELECT * FROM car_types WHERE car_type_id = $1")
                .bind(car_type_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error finding car type: {}", e)))?;

        Ok(result)
    }

    pub async fn list_types(&self) -> Result<Vec<CarTypeRow>, AppError> {
        let result = sqlx::query_as::<_, CarTypeRow>(
            r#"
            SELECT ct.car_type_id, ct.type_name, ct.description, p.photo_path, ct.created_at
            FROM car_types ct
            LEFT JOIN photo_paths p ON p.photo_path_id = ct.photo_path_id
            ORDER BY ct.type_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing car types: {}", e)))?;

        Ok(result)
    }

    pub async fn update_type(
        &self,
        car_type_id: i32,
        request: &UpdateCarTypeRequest,
    ) -> Result<CarType, AppError> {
        let current = self
            .find_type_by_id(car_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tipo de coche no encontrado".to_string()))?;

        let photo_path_id = match &request.photo_path {
            Some(path) => {
                let row: (i32,) = sqlx::query_as(
                    "INSERT INTO photo_paths (photo_path) VALUES ($1) RETURNING photo_path_id",
                )
                .bind(path)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error creating photo: {}", e)))?;
                Some(row.0)
            }
            None => current.photo_path_id,
        };

        let car_type = sqlx::query_as::<_, CarType>(
            r#"
            UPDATE car_types
            SET type_name = $2, description = $3, photo_path_id = $4, updated_at = NOW()
            WHERE car_type_id = $1
            RETURNING *
            "#,
        )
        .bind(car_type_id)
        .bind(request.type_name.clone().unwrap_or(current.type_name))
        .bind(request.description.clone().or(current.description))
        .bind(photo_path_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating car type: {}", e)))?;

        Ok(car_type)
    }

    /// Borrado en dos fases, igual que con los coches
    pub async fn delete_type(&self, car_type_id: i32) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let current: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT photo_path_id FROM car_types WHERE car_type_id = $1")
                .bind(car_type_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error finding car type: {}", e)))?;

        let photo_path_id = match current {
            Some((photo,)) => photo,
            None => return Err(AppError::NotFound("Tipo de coche no encontrado".to_string())),
        };

        let has_cars: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM cars WHERE car_type_id = $1)")
                .bind(car_type_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error checking cars: {}", e)))?;

        if has_cars.0 {
            return Err(AppError::Conflict(
                "No se puede eliminar un tipo con coches asociados".to_string(),
            ));
        }

        sqlx::query("DELETE FROM car_types WHERE car_type_id = $1")
            .bind(car_type_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error deleting car type: {}", e)))?;

        if let Some(photo_id) = photo_path_id {
            sqlx::query("DELETE FROM photo_paths WHERE photo_path_id = $1")
                .bind(photo_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error deleting photo: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error deleting car type: {}", e)))?;

        Ok(())
    }
}
