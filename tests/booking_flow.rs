//! Tests de integración del ciclo de vida de reservas.
//!
//! Requieren una base de datos PostgreSQL accesible vía
//! `TEST_DATABASE_URL`; si la variable no está definida cada test se
//! omite silenciosamente. Los datos generados usan sufijos únicos para
//! no chocar entre tests que corren en paralelo.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use rental_ops::config::environment::{
    DispatchOrdering, EnvironmentConfig, OfficeAssignmentPolicy,
};
use rental_ops::controllers::ReviewController;
use rental_ops::dto::booking_dto::CreateBookingRequest;
use rental_ops::dto::review_dto::CreateReviewRequest;
use rental_ops::middleware::auth::AuthenticatedUser;
use rental_ops::models::booking::BookingStatus;
use rental_ops::models::user::UserRole;
use rental_ops::repositories::CarRepository;
use rental_ops::services::booking_service::NO_SHOW_REASON;
use rental_ops::services::{BookingService, Mailer, SmtpMailer, TaskService};
use rental_ops::utils::errors::AppError;

const OFFICE_LAT: f64 = 16.8409;
const OFFICE_LNG: f64 = 96.1735;

async fn connect() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL no configurada, test omitido");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("no se pudo conectar a la base de datos de test");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("error aplicando migraciones");

    Some(pool)
}

fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        environment: "development".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        jwt_secret: "clave-de-test-suficientemente-larga".to_string(),
        jwt_expiration: 3600,
        cors_origins: vec![],
        office_assignment_policy: OfficeAssignmentPolicy::NearestBand,
        delivery_min_km: 1.0,
        delivery_max_km: 100.0,
        dispatch_ordering: DispatchOrdering::Time,
        booking_lead_time_hours: 24,
        fine_no_show: 10000,
        fine_cancel: 3000,
        smtp_host: None,
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
        mail_from: None,
    }
}

fn booking_service(pool: &PgPool) -> BookingService {
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::disabled());
    BookingService::new(pool.clone(), test_config(), mailer)
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn seed_office(pool: &PgPool) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO office_locations (location_name, latitude, longitude)
         VALUES ($1, $2, $3) RETURNING office_location_id",
    )
    .bind(format!("Oficina {}", suffix()))
    .bind(OFFICE_LAT)
    .bind(OFFICE_LNG)
    .fetch_one(pool)
    .await
    .expect("error insertando oficina")
}

async fn seed_car(pool: &PgPool, office_id: i32) -> Uuid {
    let car_type_id: i32 =
        sqlx::query_scalar("INSERT INTO car_types (type_name) VALUES ($1) RETURNING car_type_id")
            .bind(format!("Tipo {}", suffix()))
            .fetch_one(pool)
            .await
            .expect("error insertando tipo de coche");

    sqlx::query_scalar(
        "INSERT INTO cars (car_id, car_type_id, office_location_id, model, license_plate,
                           price_per_hour, price_per_day, number_of_seats, luggage_capacity,
                           color, transmission, fuel_type)
         VALUES ($1, $2, $3, 'Toyota Vios', $4, 100, 2000, 4, 2, 'Blanco', 'automatic', 'petrol')
         RETURNING car_id",
    )
    .bind(Uuid::new_v4())
    .bind(car_type_id)
    .bind(office_id)
    .bind(format!("T-{}", suffix()))
    .fetch_one(pool)
    .await
    .expect("error insertando coche")
}

async fn seed_user(pool: &PgPool, role: UserRole, office_id: Option<i32>) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO users (user_id, name, email, phone, password_hash, role, office_location_id)
         VALUES ($1, $2, $3, '+959551234567', 'hash-de-test', $4, $5)
         RETURNING user_id",
    )
    .bind(Uuid::new_v4())
    .bind(format!("Usuario {}", suffix()))
    .bind(format!("u-{}@test.com", suffix()))
    .bind(role)
    .bind(office_id)
    .fetch_one(pool)
    .await
    .expect("error insertando usuario")
}

fn staff_principal(user_id: Uuid, office_id: i32) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id,
        role: UserRole::Staff,
        office_location_id: Some(office_id),
    }
}

/// Recogida en la propia oficina: a menos de 1 km no se ofrece entrega
fn self_service_request(car_id: Uuid) -> CreateBookingRequest {
    let pickup = Utc::now() + Duration::hours(48);
    CreateBookingRequest {
        car_id,
        pickup_datetime: pickup,
        dropoff_datetime: pickup + Duration::hours(24),
        pickup_latitude: OFFICE_LAT,
        pickup_longitude: OFFICE_LNG,
        dropoff_latitude: OFFICE_LAT,
        dropoff_longitude: OFFICE_LNG,
    }
}

/// Dirección a ~17 km de la oficina, dentro de la banda [1, 100):
/// el resolutor asigna oficina y marca la entrega a domicilio
fn delivery_request(car_id: Uuid) -> CreateBookingRequest {
    let pickup = Utc::now() + Duration::hours(48);
    CreateBookingRequest {
        car_id,
        pickup_datetime: pickup,
        dropoff_datetime: pickup + Duration::hours(24),
        pickup_latitude: 16.99,
        pickup_longitude: 96.17,
        dropoff_latitude: 16.99,
        dropoff_longitude: 96.17,
    }
}

async fn booking_status(pool: &PgPool, booking_id: Uuid) -> String {
    sqlx::query_scalar("SELECT booking_status::text FROM bookings WHERE booking_id = $1")
        .bind(booking_id)
        .fetch_one(pool)
        .await
        .expect("error leyendo estado de la reserva")
}

async fn car_available(pool: &PgPool, car_id: Uuid) -> bool {
    sqlx::query_scalar("SELECT availability FROM cars WHERE car_id = $1")
        .bind(car_id)
        .fetch_one(pool)
        .await
        .expect("error leyendo disponibilidad del coche")
}

async fn user_counters(pool: &PgPool, user_id: Uuid) -> (i32, i32) {
    sqlx::query_as("SELECT no_show_count, cancellation_count FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("error leyendo contadores del usuario")
}

async fn booking_payments(pool: &PgPool, booking_id: Uuid) -> Vec<(String, Decimal)> {
    sqlx::query_as(
        "SELECT payment_type::text, amount FROM payments
         WHERE booking_id = $1 ORDER BY payment_type",
    )
    .bind(booking_id)
    .fetch_all(pool)
    .await
    .expect("error leyendo pagos")
}

#[tokio::test]
async fn self_pickup_cycle_settles_and_releases() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let staff_id = seed_user(&pool, UserRole::Staff, Some(office_id)).await;
    let staff = staff_principal(staff_id, office_id);

    let booking = service
        .create_booking(customer_id, self_service_request(car_id))
        .await
        .expect("la reserva debería crearse");

    // El coche queda reclamado desde la creación
    assert!(!car_available(&pool, car_id).await);
    assert_eq!(booking.total_amount, Decimal::from(2000));

    service
        .confirm_booking(booking.booking_id)
        .await
        .expect("la confirmación debería funcionar");

    let picked = service
        .complete_self_pickup(&staff, &booking.ticket_number)
        .await
        .expect("la recogida en mostrador debería cerrarse");
    assert_eq!(booking_status(&pool, picked.booking_id).await, "on_rent");

    let payments = booking_payments(&pool, booking.booking_id).await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].0, "booking");
    assert_eq!(payments[0].1, Decimal::from(2000));

    let done = service
        .complete_self_dropoff(&staff, &booking.ticket_number)
        .await
        .expect("la devolución debería cerrarse");
    assert_eq!(booking_status(&pool, done.booking_id).await, "completed");
    assert!(car_available(&pool, car_id).await);
}

#[tokio::test]
async fn second_booking_for_claimed_car_is_rejected() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let first = seed_user(&pool, UserRole::Customer, None).await;
    let second = seed_user(&pool, UserRole::Customer, None).await;

    service
        .create_booking(first, self_service_request(car_id))
        .await
        .expect("la primera reserva debería crearse");

    let err = service
        .create_booking(second, self_service_request(car_id))
        .await
        .expect_err("el coche ya está reclamado");
    assert!(matches!(err, AppError::CarUnavailable(_)));
}

#[tokio::test]
async fn cancelling_frees_car_and_counts_against_customer() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;

    let booking = service
        .create_booking(customer_id, self_service_request(car_id))
        .await
        .expect("la reserva debería crearse");

    // Otro usuario no puede cancelarla
    let stranger = seed_user(&pool, UserRole::Customer, None).await;
    let err = service
        .cancel_booking(stranger, booking.booking_id, None)
        .await
        .expect_err("solo el titular cancela");
    assert!(matches!(err, AppError::Forbidden(_)));

    let cancelled = service
        .cancel_booking(customer_id, booking.booking_id, Some("Cambio de planes".to_string()))
        .await
        .expect("la cancelación debería funcionar");
    assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
    assert!(car_available(&pool, car_id).await);

    let (_, cancellations) = user_counters(&pool, customer_id).await;
    assert_eq!(cancellations, 1);

    // Cancelar dos veces no es válido
    let err = service
        .cancel_booking(customer_id, booking.booking_id, None)
        .await
        .expect_err("ya está cancelada");
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn delivery_task_can_only_be_claimed_once() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);
    let tasks = TaskService::new(pool.clone());

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let first_staff = seed_user(&pool, UserRole::Staff, Some(office_id)).await;
    let second_staff = seed_user(&pool, UserRole::Staff, Some(office_id)).await;

    let booking = service
        .create_booking(customer_id, delivery_request(car_id))
        .await
        .expect("la reserva con entrega debería crearse");

    tasks
        .claim_delivery(&staff_principal(first_staff, office_id), booking.booking_id)
        .await
        .expect("el primer reclamo debería funcionar");

    let err = tasks
        .claim_delivery(&staff_principal(second_staff, office_id), booking.booking_id)
        .await
        .expect_err("la tarea ya está reclamada");
    assert!(matches!(err, AppError::AlreadyClaimed(_)));
}

#[tokio::test]
async fn delivery_completion_is_restricted_to_the_claimer() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);
    let tasks = TaskService::new(pool.clone());

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let claimer = seed_user(&pool, UserRole::Staff, Some(office_id)).await;
    let other = seed_user(&pool, UserRole::Staff, Some(office_id)).await;

    let booking = service
        .create_booking(customer_id, delivery_request(car_id))
        .await
        .expect("la reserva con entrega debería crearse");

    let task = tasks
        .claim_delivery(&staff_principal(claimer, office_id), booking.booking_id)
        .await
        .expect("el reclamo debería funcionar");

    let err = service
        .complete_delivery_by_task(&staff_principal(other, office_id), task.task_id)
        .await
        .expect_err("otro empleado no puede cerrar la tarea");
    assert!(matches!(err, AppError::Forbidden(_)));

    let delivered = service
        .complete_delivery_by_task(&staff_principal(claimer, office_id), task.task_id)
        .await
        .expect("el titular de la tarea cierra la entrega");
    assert_eq!(booking_status(&pool, delivered.booking_id).await, "on_rent");

    let payments = booking_payments(&pool, booking.booking_id).await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].0, "booking");
}

#[tokio::test]
async fn no_show_needs_pickup_time_in_the_past() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let staff_id = seed_user(&pool, UserRole::Staff, Some(office_id)).await;
    let staff = staff_principal(staff_id, office_id);

    let booking = service
        .create_booking(customer_id, self_service_request(car_id))
        .await
        .expect("la reserva debería crearse");

    let err = service
        .mark_no_show_self_pickup(&staff, &booking.ticket_number)
        .await
        .expect_err("la hora de recogida aún no pasó");
    assert!(matches!(err, AppError::InvalidState(_)));

    sqlx::query("UPDATE bookings SET pickup_datetime = NOW() - INTERVAL '1 hour' WHERE booking_id = $1")
        .bind(booking.booking_id)
        .execute(&pool)
        .await
        .expect("error moviendo la hora de recogida");

    let marked = service
        .mark_no_show_self_pickup(&staff, &booking.ticket_number)
        .await
        .expect("ahora el no-show es válido");
    assert_eq!(marked.booking_status, BookingStatus::Cancelled);
    assert_eq!(marked.cancellation_reason.as_deref(), Some(NO_SHOW_REASON));
    assert!(car_available(&pool, car_id).await);

    let (no_shows, _) = user_counters(&pool, customer_id).await;
    assert_eq!(no_shows, 1);
}

#[tokio::test]
async fn settlement_collects_outstanding_fines_and_resets_counters() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);

    let office_id = seed_office(&pool).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let staff_id = seed_user(&pool, UserRole::Staff, Some(office_id)).await;
    let staff = staff_principal(staff_id, office_id);

    // Una cancelación previa deja una multa pendiente de 3000
    let first_car = seed_car(&pool, office_id).await;
    let first = service
        .create_booking(customer_id, self_service_request(first_car))
        .await
        .expect("la primera reserva debería crearse");
    service
        .cancel_booking(customer_id, first.booking_id, None)
        .await
        .expect("la cancelación debería funcionar");

    let second_car = seed_car(&pool, office_id).await;
    let second = service
        .create_booking(customer_id, self_service_request(second_car))
        .await
        .expect("la segunda reserva debería crearse");

    service
        .complete_self_pickup(&staff, &second.ticket_number)
        .await
        .expect("la recogida debería cerrarse");

    let payments = booking_payments(&pool, second.booking_id).await;
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].0, "booking");
    assert_eq!(payments[0].1, Decimal::from(2000));
    assert_eq!(payments[1].0, "fine");
    assert_eq!(payments[1].1, Decimal::from(3000));

    let (no_shows, cancellations) = user_counters(&pool, customer_id).await;
    assert_eq!(no_shows, 0);
    assert_eq!(cancellations, 0);
}

#[tokio::test]
async fn staff_from_another_office_cannot_settle_self_pickup() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);

    let office_id = seed_office(&pool).await;
    let other_office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let outsider = seed_user(&pool, UserRole::Staff, Some(other_office_id)).await;

    let booking = service
        .create_booking(customer_id, self_service_request(car_id))
        .await
        .expect("la reserva debería crearse");

    let err = service
        .complete_self_pickup(
            &staff_principal(outsider, other_office_id),
            &booking.ticket_number,
        )
        .await
        .expect_err("el coche pertenece a otra oficina");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn reviews_require_a_completed_booking_owned_by_the_author() {
    let Some(pool) = connect().await else { return };
    let service = booking_service(&pool);
    let reviews = ReviewController::new(pool.clone());

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let customer_id = seed_user(&pool, UserRole::Customer, None).await;
    let customer = AuthenticatedUser {
        user_id: customer_id,
        role: UserRole::Customer,
        office_location_id: None,
    };

    let booking = service
        .create_booking(customer_id, self_service_request(car_id))
        .await
        .expect("la reserva debería crearse");

    let request = |rating| CreateReviewRequest {
        booking_id: booking.booking_id,
        rating,
        comment: Some("Todo perfecto".to_string()),
    };

    // Aún está pendiente, no se puede reseñar
    let err = reviews
        .create_review(&customer, request(5))
        .await
        .expect_err("la reserva no está completada");
    assert!(matches!(err, AppError::InvalidState(_)));

    sqlx::query("UPDATE bookings SET booking_status = 'completed' WHERE booking_id = $1")
        .bind(booking.booking_id)
        .execute(&pool)
        .await
        .expect("error completando la reserva");

    // Otro usuario no puede reseñar una reserva ajena
    let stranger_id = seed_user(&pool, UserRole::Customer, None).await;
    let stranger = AuthenticatedUser {
        user_id: stranger_id,
        role: UserRole::Customer,
        office_location_id: None,
    };
    let err = reviews
        .create_review(&stranger, request(4))
        .await
        .expect_err("la reserva es de otro usuario");
    assert!(matches!(err, AppError::Forbidden(_)));

    reviews
        .create_review(&customer, request(5))
        .await
        .expect("el titular puede reseñar");

    let err = reviews
        .create_review(&customer, request(3))
        .await
        .expect_err("solo una reseña por reserva");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn claim_has_one_winner_and_release_is_idempotent() {
    let Some(pool) = connect().await else { return };

    let office_id = seed_office(&pool).await;
    let car_id = seed_car(&pool, office_id).await;
    let cars = CarRepository::new(pool.clone());

    // Dos reclamos seguidos: solo el primero gana
    assert!(cars.try_claim(car_id).await.expect("error reclamando"));
    assert!(!cars.try_claim(car_id).await.expect("error en el segundo reclamo"));

    cars.release(car_id).await.expect("error liberando");
    assert!(car_available(&pool, car_id).await);

    cars.release(car_id).await.expect("error liberando de nuevo");
    assert!(car_available(&pool, car_id).await);
}
