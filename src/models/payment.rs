//! Modelo de Payment
//!
//! Libro de pagos append-only: nunca se actualiza ni se borra una fila.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de pago - mapea al ENUM payment_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Booking,
    Fine,
}

/// Payment principal - mapea exactamente a la tabla payments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub staff_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
