//! Modelo de Car y CarType
//!
//! Este módulo contiene los structs del catálogo de vehículos.
//! Mapean exactamente a las tablas cars, car_types y photo_paths.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Car principal - mapea exactamente a la tabla cars
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub car_id: Uuid,
    pub car_type_id: i32,
    pub office_location_id: i32,
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
    pub photo_path_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tipo de coche - mapea exactamente a la tabla car_types
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CarType {
    pub car_type_id: i32,
    pub type_name: String,
    pub description: Option<String>,
    pub photo_path_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ruta de foto - mapea exactamente a la tabla photo_paths
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhotoPath {
    pub photo_path_id: i32,
    pub photo_path: String,
    pub created_at: DateTime<Utc>,
}
