//! DTOs de reseñas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "La puntuación debe estar entre 1 y 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "El comentario no puede superar 2000 caracteres"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub booking_id: Option<Uuid>,
    /// Busca por ticket, nombre del autor o modelo del coche
    pub search: Option<String>,
    pub rating: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Fila de reseña con el autor y el coche resueltos
#[derive(Debug, Serialize, FromRow)]
pub struct ReviewRow {
    pub review_id: Uuid,
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub reviewer_name: String,
    pub reviewer_phone: String,
    pub car_model: String,
    pub license_plate: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewRow>,
    pub total: i64,
    /// Media global de todas las reseñas, con un decimal
    pub overall_average_rating: Option<f64>,
    pub total_all_reviews: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}
