use crate::dto::review_dto::{ReviewListQuery, ReviewRow};
use crate::models::review::Review;
use crate::utils::errors::{is_unique_violation, AppError};
use sqlx::PgPool;
use uuid::Uuid;

pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, AppError> {
        let result = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (review_id, booking_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Ya has escrito una reseña para esta reserva".to_string())
            } else {
                AppError::DatabaseError(format!("Error creating review: {}", e))
            }
        })?;

        Ok(result)
    }

    pub async fn list(&self, query: &ReviewListQuery) -> Result<(Vec<ReviewRow>, i64), AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions: Vec<String> = Vec::new();
        let mut idx = 1;
        if query.booking_id.is_some() {
            conditions.push(format!("r.booking_id = ${}", idx));
            idx += 1;
        }
        if query.search.is_some() {
            conditions.push(format!(
                "(b.ticket_number ILIKE ${0} OR u.name ILIKE ${0} OR c.model ILIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.rating.is_some() {
            conditions.push(format!("r.rating = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Orden solo por columnas de la lista blanca
        let sort_column = match query.sort_by.as_deref() {
            Some("rating") => "r.rating",
            Some("reviewer_name") => "u.name",
            _ => "r.created_at",
        };
        let sort_direction = match query.sort_order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };

        let sql = format!(
            r#"
            SELECT r.review_id, r.booking_id, b.ticket_number,
                   u.name AS reviewer_name, u.phone AS reviewer_phone,
                   c.model AS car_model, c.license_plate,
                   r.rating, r.comment, r.created_at
            FROM reviews r
            JOIN users u ON u.user_id = r.user_id
            JOIN bookings b ON b.booking_id = r.booking_id
            JOIN cars c ON c.car_id = b.car_id
            {}
            ORDER BY {} {}
            LIMIT {} OFFSET {}
            "#,
            where_clause, sort_column, sort_direction, per_page, offset
        );

        let mut rows_query = sqlx::query_as::<_, ReviewRow>(&sql);
        if let Some(booking_id) = query.booking_id {
            rows_query = rows_query.bind(booking_id);
        }
        if let Some(search) = &query.search {
            rows_query = rows_query.bind(format!("%{}%", search));
        }
        if let Some(rating) = query.rating {
            rows_query = rows_query.bind(rating);
        }

        let reviews = rows_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error listing reviews: {}", e)))?;

        let count_sql = format!(
            r#"
            SELECT COUNT(*)
            FROM reviews r
            JOIN users u ON u.user_id = r.user_id
            JOIN bookings b ON b.booking_id = r.booking_id
            JOIN cars c ON c.car_id = b.car_id
            {}
            "#,
            where_clause
        );

        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        if let Some(booking_id) = query.booking_id {
            count_query = count_query.bind(booking_id);
        }
        if let Some(search) = &query.search {
            count_query = count_query.bind(format!("%{}%", search));
        }
        if let Some(rating) = query.rating {
            count_query = count_query.bind(rating);
        }

        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Error counting reviews: {}", e)))?;

        Ok((reviews, total.0))
    }

    /// Media y total globales, sin filtros
    pub async fn overall_stats(&self) -> Result<(Option<f64>, i64), AppError> {
        let row: (Option<f64>, i64) =
            sqlx::query_as("SELECT AVG(rating)::float8, COUNT(*) FROM reviews")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Error loading review stats: {}", e)))?;

        Ok(row)
    }
}
