use crate::models::payment::{Payment, PaymentType};
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Fila del historial de cobros de un empleado
#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct PaymentHistoryRow {
    pub payment_id: Uuid,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub customer_name: String,
    pub ticket_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payment: &Payment) -> Result<Payment, AppError> {
        let result = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (payment_id, user_id, staff_id, booking_id, payment_type, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payment.payment_id)
        .bind(payment.user_id)
        .bind(payment.staff_id)
        .bind(payment.booking_id)
        .bind(payment.payment_type)
        .bind(payment.amount)
        .bind(payment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error creating payment: {}", e)))?;

        Ok(result)
    }

    pub async fn history_by_staff(
        &self,
        staff_id: Uuid,
    ) -> Result<Vec<PaymentHistoryRow>, AppError> {
        let result = sqlx::query_as::<_, PaymentHistoryRow>(
            r#"
            SELECT p.payment_id, p.payment_type, p.amount,
                   u.name AS customer_name, b.ticket_number, p.created_at
            FROM payments p
            JOIN users u ON u.user_id = p.user_id
            LEFT JOIN bookings b ON b.booking_id = p.booking_id
            WHERE p.staff_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error listing payments: {}", e)))?;

        Ok(result)
    }
}
