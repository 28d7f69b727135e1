//! DTOs del panel de administración

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::dto::booking_dto::BookingListRow;
use crate::dto::task_dto::MaintenanceRow;

/// Serie diaria de los últimos siete días, huecos rellenados con cero
#[derive(Debug, Serialize)]
pub struct ChartSeries<T> {
    pub labels: Vec<String>,
    pub data: Vec<T>,
}

/// Total cobrado por cada empleado
#[derive(Debug, Serialize, FromRow)]
pub struct StaffPaymentsRow {
    pub staff_name: String,
    pub total_collected: Decimal,
}

/// Payload agregado del panel de administración
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub today_revenue: Decimal,
    pub month_revenue: Decimal,
    pub today_bookings: i64,
    pub month_bookings: i64,
    pub total_cars: i64,
    pub available_cars: i64,
    pub rented_cars: i64,
    pub maintenance_cars: i64,
    pub total_staff: i64,
    pub delivery_staff: i64,
    pub takeback_staff: i64,
    pub maintenance_staff: i64,
    pub free_staff: i64,
    pub pending_deliveries: i64,
    pub pending_takebacks: i64,
    pub revenue_chart: ChartSeries<Decimal>,
    pub bookings_chart: ChartSeries<i64>,
    pub payments_by_staff: Vec<StaffPaymentsRow>,
    pub maintenance_queue: Vec<MaintenanceRow>,
    pub recent_bookings: Vec<BookingListRow>,
    pub generated_at: DateTime<Utc>,
}
