//! Tests HTTP contra el router completo.
//!
//! Levantan el servidor en un puerto aleatorio y lo atacan con reqwest.
//! Igual que los tests de flujo, se omiten sin `TEST_DATABASE_URL`.

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use rental_ops::config::environment::{
    DispatchOrdering, EnvironmentConfig, OfficeAssignmentPolicy,
};
use rental_ops::services::{Mailer, SmtpMailer};
use rental_ops::startup::build_router;
use rental_ops::state::AppState;

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

/// Levanta el servidor en un puerto libre y devuelve su URL base
async fn spawn_app(pool: PgPool) -> String {
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::disabled());
    let state = AppState::new(pool, test_config(), mailer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("no se pudo abrir el puerto de test");
    let addr = listener.local_addr().expect("sin dirección local");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("error del servidor de test");
    });

    format!("http://{}", addr)
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn register_body(email: &str) -> serde_json::Value {
    json!({
        "name": "Cliente de Prueba",
        "email": email,
        "password": "secreto123",
        "phone": "+959551234567",
    })
}

async fn register_and_get_token(client: &reqwest::Client, base: &str, email: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/register", base))
        .json(&register_body(email))
        .send()
        .await
        .expect("register no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("register sin JSON");
    assert_eq!(body["success"], true);
    body["data"]["token"]
        .as_str()
        .expect("register sin token")
        .to_string()
}

#[tokio::test]
async fn health_check_works() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("health sin JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "rental_ops");
}

#[tokio::test]
async fn register_login_and_profile_flow() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let email = format!("cliente-{}@test.com", suffix());

    let token = register_and_get_token(&client, &base, &email).await;

    // Login con las mismas credenciales
    let response = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "email": email, "password": "secreto123" }))
        .send()
        .await
        .expect("login no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    // Perfil con el token del registro
    let response = client
        .get(format!("{}/api/auth/profile", base))
        .bearer_auth(&token)
        .send()
        .await
        .expect("profile no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("profile sin JSON");
    assert_eq!(body["data"]["email"], email.as_str());

    // Sin token no hay perfil
    let response = client
        .get(format!("{}/api/auth/profile", base))
        .send()
        .await
        .expect("profile sin token no respondió");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let email = format!("duplicado-{}@test.com", suffix());

    register_and_get_token(&client, &base, &email).await;

    let response = client
        .post(format!("{}/api/auth/register", base))
        .json(&register_body(&email))
        .send()
        .await
        .expect("segundo register no respondió");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_fails_validation() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({
            "name": "Cliente",
            "email": format!("corto-{}@test.com", suffix()),
            "password": "corta",
            "phone": "+959551234567",
        }))
        .send()
        .await
        .expect("register no respondió");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_cannot_reach_staff_or_admin_routes() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool).await;
    let client = reqwest::Client::new();
    let email = format!("cliente-{}@test.com", suffix());

    let token = register_and_get_token(&client, &base, &email).await;

    let staff_routes = [
        format!("{}/api/staff/tasks/active", base),
        format!("{}/api/staff/deliveries/today", base),
        format!("{}/api/bookings", base),
    ];
    for url in staff_routes {
        let response = client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .expect("ruta de personal no respondió");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "url: {}", url);
    }

    let response = client
        .get(format!("{}/api/admin/dashboard", base))
        .bearer_auth(&token)
        .send()
        .await
        .expect("dashboard no respondió");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_open_dashboard() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();

    // Sembrar un admin directamente con contraseña conocida
    let email = format!("admin-{}@test.com", suffix());
    let hash = bcrypt::hash("secreto123", 4).expect("error generando hash");
    sqlx::query(
        "INSERT INTO users (user_id, name, email, phone, password_hash, role)
         VALUES ($1, 'Admin de Prueba', $2, '+959551234567', $3, 'admin')",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&hash)
    .execute(&pool)
    .await
    .expect("error sembrando admin");

    let response = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "email": email, "password": "secreto123" }))
        .send()
        .await
        .expect("login no respondió");
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("login sin JSON");
    let token = body["data"]["token"].as_str().expect("login sin token");

    let response = client
        .get(format!("{}/api/admin/dashboard", base))
        .bearer_auth(token)
        .send()
        .await
        .expect("dashboard no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("dashboard sin JSON");
    assert_eq!(body["success"], true);
    assert!(body["data"]["today_bookings"].is_number());
    assert!(body["data"]["total_cars"].is_number());
    assert_eq!(body["data"]["revenue_chart"]["labels"].as_array().map(|l| l.len()), Some(7));
}

#[tokio::test]
async fn booking_can_be_created_and_cancelled_over_http() {
    let Some(pool) = connect().await else { return };
    let base = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();

    let email = format!("c-{}@test.com", suffix());
    let token = register_and_get_token(&client, &base, &email).await;

    // Oficina y coche sembrados directamente
    let office_id: i32 = sqlx::query_scalar(
        "INSERT INTO office_locations (location_name, latitude, longitude)
         VALUES ($1, 16.8409, 96.1735) RETURNING office_location_id",
    )
    .bind(format!("Oficina {}", suffix()))
    .fetch_one(&pool)
    .await
    .expect("error sembrando oficina");

    let car_type_id: i32 =
        sqlx::query_scalar("INSERT INTO car_types (type_name) VALUES ($1) RETURNING car_type_id")
            .bind(format!("Tipo {}", suffix()))
            .fetch_one(&pool)
            .await
            .expect("error sembrando tipo");

    let car_id: Uuid = sqlx::query_scalar(
        "INSERT INTO cars (car_id, car_type_id, office_location_id, model, license_plate,
                           price_per_hour, price_per_day, number_of_seats, luggage_capacity,
                           color, transmission, fuel_type)
         VALUES ($1, $2, $3, 'Honda Fit', $4, 150, 2500, 4, 2, 'Gris', 'automatic', 'petrol')
         RETURNING car_id",
    )
    .bind(Uuid::new_v4())
    .bind(car_type_id)
    .bind(office_id)
    .bind(format!("H-{}", suffix()))
    .fetch_one(&pool)
    .await
    .expect("error sembrando coche");

    // Recogida en mostrador a dos días vista, pegada a la oficina
    let pickup = Utc::now() + Duration::hours(48);
    let dropoff = pickup + Duration::hours(6);
    let response = client
        .post(format!("{}/api/bookings", base))
        .bearer_auth(&token)
        .json(&json!({
            "car_id": car_id,
            "pickup_datetime": pickup,
            "dropoff_datetime": dropoff,
            "pickup_latitude": 16.8412,
            "pickup_longitude": 96.1735,
            "dropoff_latitude": 16.8412,
            "dropoff_longitude": 96.1735,
        }))
        .send()
        .await
        .expect("creación no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("creación sin JSON");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["booking_status"], "pending");
    assert_eq!(body["data"]["deliver_need"], false);
    let ticket = body["data"]["ticket_number"].as_str().expect("sin ticket");
    assert!(ticket.starts_with("CR"));
    let booking_id = body["data"]["booking_id"]
        .as_str()
        .expect("sin booking_id")
        .to_string();

    // El coche queda retenido por la reserva
    let available: bool = sqlx::query_scalar("SELECT availability FROM cars WHERE car_id = $1")
        .bind(car_id)
        .fetch_one(&pool)
        .await
        .expect("error consultando coche");
    assert!(!available);

    let response = client
        .post(format!("{}/api/bookings/{}/cancel", base, booking_id))
        .bearer_auth(&token)
        .json(&json!({ "reason": "Cambio de planes" }))
        .send()
        .await
        .expect("cancelación no respondió");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("cancelación sin JSON");
    assert_eq!(body["data"]["booking_status"], "cancelled");

    let available: bool = sqlx::query_scalar("SELECT availability FROM cars WHERE car_id = $1")
        .bind(car_id)
        .fetch_one(&pool)
        .await
        .expect("error consultando coche");
    assert!(available);
}
