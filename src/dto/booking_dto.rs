//! DTOs de reservas

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::{Booking, BookingStatus};

/// Request de creación de reserva
///
/// El total se calcula en el servidor a partir de las tarifas del coche,
/// nunca se acepta del cliente. La necesidad de entrega/recogida a
/// domicilio tampoco se pide: se deriva de las coordenadas.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub car_id: Uuid,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitud de recogida inválida"))]
    pub pickup_latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitud de recogida inválida"))]
    pub pickup_longitude: f64,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitud de devolución inválida"))]
    pub dropoff_latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitud de devolución inválida"))]
    pub dropoff_longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub total_amount: Decimal,
    pub booking_status: BookingStatus,
    pub deliver_need: bool,
    pub take_back_need: bool,
    pub delivery_office_id: Option<i32>,
    pub takeback_office_id: Option<i32>,
    pub cancellation_reason: Option<String>,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.booking_id,
            ticket_number: booking.ticket_number,
            user_id: booking.user_id,
            car_id: booking.car_id,
            pickup_datetime: booking.pickup_datetime,
            dropoff_datetime: booking.dropoff_datetime,
            pickup_latitude: booking.pickup_latitude,
            pickup_longitude: booking.pickup_longitude,
            dropoff_latitude: booking.dropoff_latitude,
            dropoff_longitude: booking.dropoff_longitude,
            total_amount: booking.total_amount,
            booking_status: booking.booking_status,
            deliver_need: booking.deliver_need,
            take_back_need: booking.take_back_need,
            delivery_office_id: booking.delivery_office_id,
            takeback_office_id: booking.takeback_office_id,
            cancellation_reason: booking.cancellation_reason,
            cancellation_date: booking.cancellation_date,
            created_at: booking.created_at,
        }
    }
}

/// Filtros del listado administrativo de reservas
///
/// `search` busca a la vez por ticket, nombre del cliente, modelo y
/// matrícula. `sort_by` admite created_at, pickup_datetime, total_amount
/// y rating (valoración media del coche).
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub deliver_need: Option<bool>,
    pub take_back_need: Option<bool>,
    pub office_id: Option<i32>,
    pub car_type_id: Option<i32>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Fila del listado administrativo (join con usuario, coche y oficinas)
#[derive(Debug, Serialize, FromRow)]
pub struct BookingListRow {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub car_model: String,
    pub license_plate: String,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    pub booking_status: BookingStatus,
    pub total_amount: Decimal,
    pub deliver_need: bool,
    pub take_back_need: bool,
    pub delivery_office: Option<String>,
    pub takeback_office: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingListRow>,
    pub total: i64,
    pub total_amount_sum: Decimal,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Fila del historial del propio cliente
#[derive(Debug, Serialize, FromRow)]
pub struct MyBookingRow {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub car_id: Uuid,
    pub car_model: String,
    pub car_photo: Option<String>,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    pub booking_status: BookingStatus,
    pub total_amount: Decimal,
    pub deliver_need: bool,
    pub take_back_need: bool,
    pub cancellation_reason: Option<String>,
    pub has_reviewed: bool,
    pub created_at: DateTime<Utc>,
}

/// Desglose de cobro que ve el personal al buscar por ticket
#[derive(Debug, Serialize)]
pub struct BookingCostResponse {
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub booking_status: BookingStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub car_model: String,
    pub license_plate: String,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    pub total_amount: Decimal,
    pub outstanding_fine: Decimal,
    pub grand_total: Decimal,
}
