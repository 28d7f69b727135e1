//! Modelo de OfficeLocation
//!
//! Mapea exactamente a la tabla office_locations. Las columnas de capacidad
//! y radio alimentan la política de asignación por área de servicio.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Oficina de servicio - mapea exactamente a la tabla office_locations
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfficeLocation {
    pub office_location_id: i32,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub can_deliver: bool,
    pub can_take_back: bool,
    pub service_radius_km: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
