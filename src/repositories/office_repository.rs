use crate::dto::office_dto::{CreateOfficeRequest, UpdateOfficeRequest};
use crate::models::office_location::OfficeLocation;
use crate::utils::errors::AppError;
use sqlx::PgPool;

pub struct OfficeRepository {
    pool: PgPool,
}

impl OfficeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateOfficeRequest) -> Result<OfficeLocation, AppError> {
        let result = sqlx::query_as::<_, OfficeLocation>(
            r#"
            INSERT INTO office_locations (
                location_name, latitude, longitude, can_deliver, can_take_back, service_radius_km
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.location_name)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.can_deliver.unwrap_or(true))
        .bind(request.can_take_back.unwrap_or(true))
        .bind(request.service_radius_km.unwrap_or(100.0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error creating office: {}", e)))?;

        Ok(result)
    }

    pub async fn find_by_id(&self, office_id: i32) -> Result<Option<OfficeLocation>, AppError> {
        let result = sqlx::query_as::<_, OfficeLocation>(
            "SELECT * FROM office_locations WHERE office_location_id = $1",
        )
        .bind(office_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error finding office: {}", e)))?;

        Ok(result)
    }

    pub async fn list_all(&self) -> Result<Vec<OfficeLocation>, AppError> {
        let result = sqlx::query_as::<_, OfficeLocation>(
            "SELECT * FROM office_locations ORDER BY location_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing offices: {}", e)))?;

        Ok(result)
    }

    pub async fn update(
        &self,
        office_id: i32,
        request: &UpdateOfficeRequest,
    ) -> Result<OfficeLocation, AppError> {
        let current = self
            .find_by_id(office_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Oficina no encontrada".to_string()))?;

        let result = sqlx::query_as::<_, OfficeLocation>(
            r#"
            UPDATE office_locations
            SET location_name = $2, latitude = $3, longitude = $4,
                can_deliver = $5, can_take_back = $6, service_radius_km = $7, updated_at = NOW()
            WHERE office_location_id = $1
            RETURNING *
            "#,
        )
        .bind(office_id)
        .bind(request.location_name.clone().unwrap_or(current.location_name))
        .bind(request.latitude.unwrap_or(current.latitude))
        .bind(request.longitude.unwrap_or(current.longitude))
        .bind(request.can_deliver.unwrap_or(current.can_deliver))
        .bind(request.can_take_back.unwrap_or(current.can_take_back))
        .bind(request.service_radius_km.unwrap_or(current.service_radius_km))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error updating office: {}", e)))?;

        Ok(result)
    }

    pub async fn delete(&self, office_id: i32) -> Result<(), AppError> {
        let has_cars: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM cars WHERE office_location_id = $1)")
                .bind(office_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error checking cars: {}", e)))?;

        if has_cars.0 {
            return Err(AppError::Conflict(
                "No se puede eliminar una oficina con coches asignados".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM office_locations WHERE office_location_id = $1")
            .bind(office_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error deleting office: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Oficina no encontrada".to_string()));
        }

        Ok(())
    }
}
