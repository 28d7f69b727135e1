//! Modelo de Task
//!
//! Este módulo contiene el struct Task y sus enums de tipo y estado.
//! Una tarea activa por (booking, tipo) se garantiza con un índice único parcial.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de tarea - mapea al ENUM task_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "task_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Delivery,
    TakeBack,
    Maintenance,
}

/// Estado de la tarea - mapea al ENUM task_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// Task principal - mapea exactamente a la tabla tasks
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub description: String,
    pub booking_id: Option<Uuid>,
    pub maintenance_id: Option<Uuid>,
    pub assigned_staff_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
