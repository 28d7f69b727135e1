//! DTOs de oficinas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::office_location::OfficeLocation;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOfficeRequest {
    #[validate(length(min = 2, max = 255, message = "El nombre de la oficina debe tener entre 2 y 255 caracteres"))]
    pub location_name: String,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitud inválida"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitud inválida"))]
    pub longitude: f64,
    pub can_deliver: Option<bool>,
    pub can_take_back: Option<bool>,
    pub service_radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOfficeRequest {
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub can_deliver: Option<bool>,
    pub can_take_back: Option<bool>,
    pub service_radius_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OfficeResponse {
    pub office_location_id: i32,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub can_deliver: bool,
    pub can_take_back: bool,
    pub service_radius_km: f64,
    pub created_at: DateTime<Utc>,
}

impl From<OfficeLocation> for OfficeResponse {
    fn from(office: OfficeLocation) -> Self {
        Self {
            office_location_id: office.office_location_id,
            location_name: office.location_name,
            latitude: office.latitude,
            longitude: office.longitude,
            can_deliver: office.can_deliver,
            can_take_back: office.can_take_back,
            service_radius_km: office.service_radius_km,
            created_at: office.created_at,
        }
    }
}
