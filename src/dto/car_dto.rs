//! DTOs del catálogo de vehículos

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCarTypeRequest {
    #[validate(length(min = 2, max = 100, message = "El nombre del tipo debe tener entre 2 y 100 caracteres"))]
    pub type_name: String,
    pub description: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarTypeRequest {
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCarRequest {
    pub car_type_id: i32,
    pub office_location_id: i32,
    #[validate(length(min = 1, max = 255, message = "El modelo es requerido"))]
    pub model: String,
    pub license_plate: String,
    pub price_per_hour: Decimal,
    pub price_per_day: Decimal,
    #[validate(range(min = 1, max = 50, message = "Número de asientos inválido"))]
    pub number_of_seats: i32,
    #[validate(range(min = 0, max = 50, message = "Capacidad de maletas inválida"))]
    pub luggage_capacity: i32,
    pub color: String,
    pub transmission: String,
    pub fuel_type: String,
    pub photo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub car_type_id: Option<i32>,
    pub office_location_id: Option<i32>,
    pub model: Option<String>,
    pub license_plate: Option<String>,
    pub price_per_hour: Option<Decimal>,
    pub price_per_day: Option<Decimal>,
    pub availability: Option<bool>,
    pub number_of_seats: Option<i32>,
    pub luggage_capacity: Option<i32>,
    pub color: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub photo_path: Option<String>,
}

/// Filtros del listado público de coches
///
/// Si vienen las dos fechas se calcula el precio total del tramo
/// con la tarifa por hora y por día de cada coche.
#[derive(Debug, Deserialize)]
pub struct CarListQuery {
    pub pickup_datetime: Option<DateTime<Utc>>,
    pub dropoff_datetime: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub car_type_id: Option<i32>,
    pub office_id: Option<i32>,
    pub min_seats: Option<i32>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Fila del listado de coches con el presupuesto del tramo pedido
#[derive(Debug, Serialize, FromRow)]
pub struct CarWithQuote {
    pub car_id: Uuid,
    pub car_type_id: i32,
    pub type_name: String,
    pub office_location_id: i32,
    pub office_name: String,
    pub model: String,
    pub license_plate: String,
    pub price_per_hour: Decimal,
    pub price_per_day: Decimal,
    pub availability: bool,
    pub number_of_seats: i32,
    pub luggage_capacity: i32,
    pub color: String,
    pub transmission: String,
    pub fuel_type: String,
    pub photo_path: Option<String>,
    pub total_price: Option<Decimal>,
    pub avg_rating: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CarListResponse {
    pub cars: Vec<CarWithQuote>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Tipo de coche con su foto resuelta
#[derive(Debug, Serialize, FromRow)]
pub struct CarTypeRow {
    pub car_type_id: i32,
    pub type_name: String,
    pub description: Option<String>,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
}
