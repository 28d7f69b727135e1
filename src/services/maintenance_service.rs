//! Mantenimiento de la flota
//!
//! Un parte de daños saca el coche de circulación y abre una tarea de
//! mantenimiento asignada a quien lo reporta. Al completarla, el coche
//! vuelve a estar disponible.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::task_dto::{CompleteMaintenanceRequest, DamageReportRequest, MaintenanceRow};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::car::Car;
use crate::models::maintenance::{Maintenance, MaintenanceStatus};
use crate::repositories::MaintenanceRepository;
use crate::utils::errors::AppError;

pub struct MaintenanceService {
    pool: PgPool,
    maintenance: MaintenanceRepository,
}

impl MaintenanceService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            maintenance: MaintenanceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Reporta un daño: el coche queda fuera de servicio hasta que el
    /// mantenimiento se complete.
    pub async fn report_damage(
        &self,
        staff: &AuthenticatedUser,
        request: DamageReportRequest,
    ) -> Result<Maintenance, AppError> {
        request.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE car_id = $1 FOR UPDATE")
            .bind(request.car_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error locking car: {}", e)))?
            .ok_or_else(|| AppError::NotFound("Coche no encontrado".to_string()))?;

        let maintenance = sqlx::query_as::<_, Maintenance>(
            r#"
            INSERT INTO maintenance (maintenance_id, car_id, staff_id, description, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.car_id)
        .bind(staff.user_id)
        .bind(&request.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error creating maintenance: {}", e)))?;

        sqlx::query("UPDATE cars SET availability = FALSE, updated_at = NOW() WHERE car_id = $1")
            .bind(request.car_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error blocking car: {}", e)))?;

        let task_description = format!(
            "Mantenimiento de {} ({}): {}",
            car.model, car.license_plate, request.description
        );

        sqlx::query(
            r#"
            INSERT INTO tasks (task_id, task_type, status, description, maintenance_id, assigned_staff_id)
            VALUES ($1, 'maintenance', 'in_progress', $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&task_description)
        .bind(maintenance.maintenance_id)
        .bind(staff.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error creating maintenance task: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Error reporting damage: {}", e)))?;

        log::warn!(
            "🔧 Daño reportado en {} ({}), coche fuera de servicio",
            car.model,
            car.license_plate
        );
        Ok(maintenance)
    }

    /// Cierra un mantenimiento y devuelve el coche a la flota
    pub async fn complete_maintenance(
        &self,
        staff: &AuthenticatedUser,
        maintenance_id: Uuid,
        request: CompleteMaintenanceRequest,
    ) -> Result<Maintenance, AppError> {
        if request.cost < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "El coste no puede ser negativo".to_string(),
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error starting transaction: {}", e)))?;

        let maintenance = sqlx::query_as::<_, Maintenance>(
            "SELECT * FROM maintenance WHERE maintenance_id = $1 FOR UPDATE",
        )
        .bind(maintenance_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error locking maintenance: {}", e)))?
        .ok_or_else(|| AppError::NotFound("Mantenimiento no encontrado".to_string()))?;

        if maintenance.status != MaintenanceStatus::Pending {
            return Err(AppError::InvalidState(
                "Este mantenimiento ya está completado".to_string(),
            ));
        }
        if maintenance.staff_id != staff.user_id && !staff.is_admin() {
            return Err(AppError::Forbidden(
                "Otro empleado tiene asignado este mantenimiento".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Maintenance>(
            r#"
            UPDATE maintenance
            SET status = 'completed', cost = $2, updated_at = NOW()
            WHERE maintenance_id = $1
            RETURNING *
            "#,
        )
        .bind(maintenance_id)
        .bind(request.cost)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error completing maintenance: {}", e)))?;

        sqlx::query(
            "UPDATE tasks SET status = 'completed', updated_at = NOW() WHERE maintenance_id = $1 AND status = 'in_progress'",
        )
        .bind(maintenance_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error completing maintenance task: {}", e)))?;

        sqlx::query("UPDATE cars SET availability = TRUE, updated_at = NOW() WHERE car_id = $1")
            .bind(maintenance.car_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error releasing car: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| {
                AppError::TransactionFailure(format!("Error completing maintenance: {}", e))
            })?;

        log::info!("🔧 Mantenimiento {} completado", maintenance_id);
        Ok(updated)
    }

    pub async fn pending_maintenance(&self) -> Result<Vec<MaintenanceRow>, AppError> {
        self.maintenance.list_pending().await
    }

    pub async fn maintenance_history(
        &self,
        staff: &AuthenticatedUser,
    ) -> Result<Vec<MaintenanceRow>, AppError> {
        self.maintenance.history_by_staff(staff.user_id).await
    }
}
