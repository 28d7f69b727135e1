//! DTOs de tareas y despacho de personal

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::task::{Task, TaskStatus, TaskType};

/// Fila cruda de candidatos a despacho (entregas o recogidas pendientes)
#[derive(Debug, Clone, FromRow)]
pub struct DispatchCandidate {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub car_model: String,
    pub license_plate: String,
    pub latitude: f64,
    pub longitude: f64,
    pub scheduled_at: DateTime<Utc>,
    pub total_amount: Decimal,
}

/// Fila del listado de despacho con la urgencia ya calculada
#[derive(Debug, Serialize)]
pub struct DispatchRow {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub car_model: String,
    pub license_plate: String,
    pub latitude: f64,
    pub longitude: f64,
    pub scheduled_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub minutes_until: i64,
    pub is_overdue: bool,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub description: String,
    pub booking_id: Option<Uuid>,
    pub maintenance_id: Option<Uuid>,
    pub assigned_staff_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.task_id,
            task_type: task.task_type,
            status: task.status,
            description: task.description,
            booking_id: task.booking_id,
            maintenance_id: task.maintenance_id,
            assigned_staff_id: task.assigned_staff_id,
            created_at: task.created_at,
        }
    }
}

/// Fila del historial de tareas del empleado
#[derive(Debug, Serialize, FromRow)]
pub struct TaskHistoryRow {
    pub task_id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub description: String,
    pub ticket_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DamageReportRequest {
    pub car_id: Uuid,
    #[validate(length(min = 5, max = 2000, message = "La descripción debe tener entre 5 y 2000 caracteres"))]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteMaintenanceRequest {
    pub cost: Decimal,
}

/// Fila del historial de mantenimiento (join con coche)
#[derive(Debug, Serialize, FromRow)]
pub struct MaintenanceRow {
    pub maintenance_id: Uuid,
    pub car_id: Uuid,
    pub car_model: String,
    pub license_plate: String,
    pub description: String,
    pub cost: Decimal,
    pub status: crate::models::maintenance::MaintenanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
