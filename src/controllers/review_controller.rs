use crate::dto::review_dto::{CreateReviewRequest, ReviewListQuery, ReviewListResponse};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::booking::BookingStatus;
use crate::models::review::Review;
use crate::repositories::{BookingRepository, ReviewRepository};
use crate::utils::errors::AppError;
use sqlx::PgPool;
use validator::Validate;

pub struct ReviewController {
    repository: ReviewRepository,
    bookings: BookingRepository,
}

impl ReviewController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ReviewRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool),
        }
    }

    /// Solo se reseñan reservas propias y completadas, una vez cada una
    pub async fn create_review(
        &self,
        principal: &AuthenticatedUser,
        request: CreateReviewRequest,
    ) -> Result<ApiResponse<Review>, AppError> {
        request.validate()?;

        let booking = self
            .bookings
            .find_by_id(request.booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        if booking.user_id != principal.user_id {
            return Err(AppError::Forbidden(
                "Solo puedes reseñar tus propias reservas".to_string(),
            ));
        }
        if booking.booking_status != BookingStatus::Completed {
            return Err(AppError::InvalidState(
                "Solo se pueden reseñar reservas completadas".to_string(),
            ));
        }

        let review = self
            .repository
            .create(
                request.booking_id,
                principal.user_id,
                request.rating,
                request.comment.as_deref(),
            )
            .await?;

        log::info!("⭐ Reseña creada para la reserva {}", booking.ticket_number);
        Ok(ApiResponse::success_with_message(
            review,
            "Reseña publicada exitosamente".to_string(),
        ))
    }

    pub async fn list_reviews(
        &self,
        query: ReviewListQuery,
    ) -> Result<ApiResponse<ReviewListResponse>, AppError> {
        if let Some(rating) = query.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::ValidationError(
                    "La puntuación debe estar entre 1 y 5".to_string(),
                ));
            }
        }

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let (reviews, total) = self.repository.list(&query).await?;
        let (average, total_all_reviews) = self.repository.overall_stats().await?;
        let total_pages = (total + per_page - 1) / per_page;

        Ok(ApiResponse::success(ReviewListResponse {
            reviews,
            total,
            overall_average_rating: average.map(|a| (a * 10.0).round() / 10.0),
            total_all_reviews,
            page,
            per_page,
            total_pages,
        }))
    }

}
