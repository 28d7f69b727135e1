//! DTOs de la API
//!
//! Este módulo contiene los requests tipados por operación y las
//! responses de cada recurso, más la envoltura genérica de la API.

use serde::Serialize;

pub mod auth_dto;
pub mod booking_dto;
pub mod car_dto;
pub mod dashboard_dto;
pub mod office_dto;
pub mod review_dto;
pub mod task_dto;

/// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
            data: None,
        }
    }
}
