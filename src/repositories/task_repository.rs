use crate::dto::task_dto::TaskHistoryRow;
use crate::models::task::{Task, TaskStatus, TaskType};
use crate::utils::errors::{is_unique_violation, AppError};
use sqlx::PgPool;
use uuid::Uuid;

pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reclama una tarea para un empleado.
    ///
    /// El índice único parcial sobre (booking_id, task_type) con estado
    /// in_progress garantiza un solo ganador aunque dos empleados
    /// reclamen a la vez.
    pub async fn claim(
        &self,
        booking_id: Uuid,
        task_type: TaskType,
        staff_id: Uuid,
        description: &str,
    ) -> Result<Task, AppError> {
        let result = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (task_id, task_type, status, description, booking_id, assigned_staff_id)
            VALUES ($1, $2, 'in_progress', $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_type)
        .bind(description)
        .bind(booking_id)
        .bind(staff_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyClaimed(
                    "Otro empleado ya reclamó esta tarea".to_string(),
                )
            } else {
                AppError::DatabaseError(format!("Error claiming task: {}", e))
            }
        })?;

        Ok(result)
    }

    pub async fn find_by_id(&self, task_id: Uuid) -> Result<Option<Task>, AppError> {
        let result = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error finding task: {}", e)))?;

        Ok(result)
    }

    pub async fn list_active_by_staff(&self, staff_id: Uuid) -> Result<Vec<Task>, AppError> {
        let result = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE assigned_staff_id = $1 AND status = 'in_progress' ORDER BY created_at DESC",
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing active tasks: {}", e)))?;

        Ok(result)
    }

    /// Historial del empleado limitado a los últimos 30 días
    pub async fn history_by_staff(&self, staff_id: Uuid) -> Result<Vec<TaskHistoryRow>, AppError> {
        let result = sqlx::query_as::<_, TaskHistoryRow>(
            r#"
            SELECT t.task_id, t.task_type, t.status, t.description,
                   b.ticket_number, t.created_at, t.updated_at
            FROM tasks t
            LEFT JOIN bookings b ON b.booking_id = t.booking_id
            WHERE t.assigned_staff_id = $1
              AND t.created_at >= NOW() - INTERVAL '30 days'
            ORDER BY t.updated_at DESC
            "#,
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing task history: {}", e)))?;

        Ok(result)
    }

    /// Abandona una tarea reclamada sin completarla: la fila vuelve a
    /// desaparecer y la reserva queda de nuevo reclamable.
    pub async fn abandon(&self, task_id: Uuid, staff_id: Uuid) -> Result<(), AppError> {
        let task = self
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tarea no encontrada".to_string()))?;

        if task.assigned_staff_id != staff_id {
            return Err(AppError::Forbidden(
                "Solo el empleado asignado puede abandonar la tarea".to_string(),
            ));
        }
        if task.status != TaskStatus::InProgress {
            return Err(AppError::InvalidState(
                "Solo se pueden abandonar tareas en curso".to_string(),
            ));
        }

        sqlx::query("DELETE FROM tasks WHERE task_id = $1 AND status = 'in_progress'")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error abandoning task: {}", e)))?;

        Ok(())
    }
}
