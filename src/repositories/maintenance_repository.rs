use crate::dto::task_dto::MaintenanceRow;
use crate::models::maintenance::Maintenance;
use crate::utils::errors::AppError;
use sqlx::PgPool;
use uuid::Uuid;

pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, maintenance_id: Uuid) -> Result<Option<Maintenance>, AppError> {
        let result = sqlx::query_as::<_, Maintenance>(
            "SELECT * FROM maintenance WHERE maintenance_id = $1",
        )
        .bind(maintenance_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error finding maintenance: {}", e)))?;

        Ok(result)
    }

    pub async fn list_pending(&self) -> Result<Vec<MaintenanceRow>, AppError> {
        let result = sqlx::query_as::<_, MaintenanceRow>(
            r#"
            SELECT m.maintenance_id, m.car_id, c.model AS car_model, c.license_plate,
                   m.description, m.cost, m.status, m.created_at, m.updated_at
            FROM maintenance m
            JOIN cars c ON c.car_id = m.car_id
            WHERE m.status = 'pending'
            ORDER BY m.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing pending maintenance: {}", e)))?;

        Ok(result)
    }

    /// Historial del empleado limitado a los últimos 30 días
    pub async fn history_by_staff(&self, staff_id: Uuid) -> Result<Vec<MaintenanceRow>, AppError> {
        let result = sqlx::query_as::<_, MaintenanceRow>(
            r#"
            SELECT m.maintenance_id, m.car_id, c.model AS car_model, c.license_plate,
                   m.description, m.cost, m.status, m.created_at, m.updated_at
            FROM maintenance m
            JOIN cars c ON c.car_id = m.car_id
            WHERE m.staff_id = $1
              AND m.created_at >= NOW() - INTERVAL '30 days'
            ORDER BY m.updated_at DESC
            "#,
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing maintenance history: {}", e)))?;

        Ok(result)
    }
}
