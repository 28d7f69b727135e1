use crate::dto::booking_dto::{BookingListQuery, BookingListRow};
use crate::dto::dashboard_dto::{ChartSeries, DashboardResponse, StaffPaymentsRow};
use crate::dto::ApiResponse;
use crate::repositories::{BookingRepository, MaintenanceRepository};
use crate::utils::errors::AppError;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;

pub struct DashboardController {
    pool: PgPool,
    bookings: BookingRepository,
    maintenance: MaintenanceRepository,
}

impl DashboardController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            maintenance: MaintenanceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Agrega todas las métricas del panel en consultas concurrentes
    pub async fn dashboard(&self) -> Result<ApiResponse<DashboardResponse>, AppError> {
        let (
            (today_revenue, month_revenue),
            (today_bookings, month_bookings),
            (total_cars, available_cars, rented_cars, maintenance_cars),
            (total_staff, delivery_staff, takeback_staff, maintenance_staff),
            (pending_deliveries, pending_takebacks),
            revenue_rows,
            bookings_rows,
            payments_by_staff,
            maintenance_queue,
            recent_bookings,
        ) = futures::try_join!(
            self.revenue_figures(),
            self.booking_figures(),
            self.fleet_figures(),
            self.staff_figures(),
            self.pending_today(),
            self.revenue_series(),
            self.bookings_series(),
            self.payments_by_staff(),
            self.maintenance.list_pending(),
            self.recent_bookings(),
        )?;

        // Se asume que nadie lleva dos tareas activas a la vez
        let free_staff =
            (total_staff - delivery_staff - takeback_staff - maintenance_staff).max(0);

        let today = Utc::now().date_naive();

        Ok(ApiResponse::success(DashboardResponse {
            today_revenue,
            month_revenue,
            today_bookings,
            month_bookings,
            total_cars,
            available_cars,
            rented_cars,
            maintenance_cars,
            total_staff,
            delivery_staff,
            takeback_staff,
            maintenance_staff,
            free_staff,
            pending_deliveries,
            pending_takebacks,
            revenue_chart: build_series(revenue_rows, Decimal::ZERO, today),
            bookings_chart: build_series(bookings_rows, 0, today),
            payments_by_staff,
            maintenance_queue,
            recent_bookings,
            generated_at: Utc::now(),
        }))
    }

    async fn revenue_figures(&self) -> Result<(Decimal, Decimal), AppError> {
        let row: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE created_at::date = CURRENT_DATE), 0),
                COALESCE(SUM(amount) FILTER (WHERE created_at >= date_trunc('month', CURRENT_TIMESTAMP)), 0)
            FROM payments
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading revenue figures: {}", e)))?;

        Ok(row)
    }

    async fn booking_figures(&self) -> Result<(i64, i64), AppError> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at::date = CURRENT_DATE),
                COUNT(*) FILTER (WHERE created_at >= date_trunc('month', CURRENT_TIMESTAMP))
            FROM bookings
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading booking figures: {}", e)))?;

        Ok(row)
    }

    async fn fleet_figures(&self) -> Result<(i64, i64, i64, i64), AppError> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM cars),
                (SELECT COUNT(*) FROM cars WHERE availability = TRUE),
                (SELECT COUNT(DISTINCT car_id) FROM bookings
                 WHERE booking_status IN ('pending', 'confirmed', 'on_rent')),
                (SELECT COUNT(*) FROM maintenance WHERE status = 'pending')
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading fleet figures: {}", e)))?;

        Ok(row)
    }

    async fn staff_figures(&self) -> Result<(i64, i64, i64, i64), AppError> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'staff'),
                (SELECT COUNT(DISTINCT assigned_staff_id) FROM tasks
                 WHERE task_type = 'delivery' AND status = 'in_progress'),
                (SELECT COUNT(DISTINCT assigned_staff_id) FROM tasks
                 WHERE task_type = 'take_back' AND status = 'in_progress'),
                (SELECT COUNT(DISTINCT assigned_staff_id) FROM tasks
                 WHERE task_type = 'maintenance' AND status = 'in_progress')
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading staff figures: {}", e)))?;

        Ok(row)
    }

    async fn pending_today(&self) -> Result<(i64, i64), AppError> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM bookings
                 WHERE deliver_need = TRUE
                   AND booking_status IN ('pending', 'confirmed')
                   AND pickup_datetime::date = CURRENT_DATE),
                (SELECT COUNT(*) FROM bookings
                 WHERE take_back_need = TRUE
                   AND booking_status = 'on_rent'
                   AND dropoff_datetime::date = CURRENT_DATE)
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading pending counts: {}", e)))?;

        Ok(row)
    }

    async fn revenue_series(&self) -> Result<Vec<(NaiveDate, Decimal)>, AppError> {
        let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
            r#"
            SELECT created_at::date AS day, COALESCE(SUM(amount), 0) AS total
            FROM payments
            WHERE created_at >= CURRENT_DATE - INTERVAL '6 days'
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading revenue series: {}", e)))?;

        Ok(rows)
    }

    async fn bookings_series(&self) -> Result<Vec<(NaiveDate, i64)>, AppError> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            r#"
            SELECT created_at::date AS day, COUNT(*) AS total
            FROM bookings
            WHERE created_at >= CURRENT_DATE - INTERVAL '6 days'
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading bookings series: {}", e)))?;

        Ok(rows)
    }

    async fn payments_by_staff(&self) -> Result<Vec<StaffPaymentsRow>, AppError> {
        let rows = sqlx::query_as::<_, StaffPaymentsRow>(
            r#"
            SELECT u.name AS staff_name, COALESCE(SUM(p.amount), 0) AS total_collected
            FROM payments p
            JOIN users u ON u.user_id = p.staff_id
            GROUP BY u.name
            ORDER BY total_collected DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Error loading staff payments: {}", e)))?;

        Ok(rows)
    }

    async fn recent_bookings(&self) -> Result<Vec<BookingListRow>, AppError> {
        let query = BookingListQuery {
            page: Some(1),
            per_page: Some(10),
            ..Default::default()
        };

        let (rows, _, _) = self.bookings.list(&query, None).await?;
        Ok(rows)
    }
}

/// Construye la serie de siete días terminando hoy; los días sin filas
/// quedan a cero
fn build_series<T: Clone>(rows: Vec<(NaiveDate, T)>, zero: T, today: NaiveDate) -> ChartSeries<T> {
    let by_day: HashMap<NaiveDate, T> = rows.into_iter().collect();

    let mut labels = Vec::with_capacity(7);
    let mut data = Vec::with_capacity(7);
    for offset in (0..7i64).rev() {
        let day = today - Duration::days(offset);
        labels.push(day.format("%d %b").to_string());
        data.push(by_day.get(&day).cloned().unwrap_or_else(|| zero.clone()));
    }

    ChartSeries { labels, data }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_build_series_fills_missing_days_with_zero() {
        let today = date(2025, 8, 19);
        let rows = vec![(date(2025, 8, 17), 3i64), (date(2025, 8, 19), 5i64)];

        let series = build_series(rows, 0, today);

        assert_eq!(series.labels.len(), 7);
        assert_eq!(series.data.len(), 7);
        assert_eq!(series.data, vec![0, 0, 0, 0, 3, 0, 5]);
        assert_eq!(series.labels[6], "19 Aug");
        assert_eq!(series.labels[0], "13 Aug");
    }

    #[test]
    fn test_build_series_ignores_days_outside_the_window() {
        let today = date(2025, 8, 19);
        let rows = vec![(date(2025, 8, 1), Decimal::from(100))];

        let series = build_series(rows, Decimal::ZERO, today);

        assert!(series.data.iter().all(|d| *d == Decimal::ZERO));
    }
}
