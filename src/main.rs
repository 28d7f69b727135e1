use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use rental_ops::config::environment::EnvironmentConfig;
use rental_ops::database::DatabaseConnection;
use rental_ops::services::{Mailer, SmtpMailer};
use rental_ops::startup::build_router;
use rental_ops::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚗 Journey Wheel - Backend de alquiler de coches");
    info!("================================================");

    // Inicializar base de datos (aplica migraciones al arrancar)
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let pool = db_connection.pool().clone();

    let config = EnvironmentConfig::default();
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::from_config(&config));
    let app_state = AppState::new(pool, config.clone(), mailer);

    let app = build_router(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🔑 Auth:");
    info!("   POST /api/auth/register - Registro de cliente");
    info!("   POST /api/auth/login - Login");
    info!("   GET  /api/auth/profile - Perfil y multas pendientes");
    info!("🚗 Catálogo:");
    info!("   GET  /api/cars - Coches disponibles con presupuesto");
    info!("   GET  /api/cars/:id - Detalle de coche");
    info!("   GET  /api/car-types - Tipos de coche");
    info!("   GET  /api/offices - Oficinas");
    info!("📋 Reservas:");
    info!("   POST /api/bookings - Crear reserva");
    info!("   GET  /api/bookings/mine - Mis reservas");
    info!("   POST /api/bookings/:id/cancel - Cancelar reserva");
    info!("   GET  /api/bookings/cost/:ticket - Coste por ticket");
    info!("   GET  /api/bookings - Listado global (personal)");
    info!("⭐ Reseñas:");
    info!("   POST /api/reviews - Crear reseña");
    info!("🚚 Personal:");
    info!("   GET  /api/staff/deliveries/today - Entregas de hoy");
    info!("   GET  /api/staff/takebacks/today - Recogidas de hoy");
    info!("   GET  /api/staff/self-pickups/today - Recogidas en mostrador");
    info!("   GET  /api/staff/self-dropoffs/today - Devoluciones en mostrador");
    info!("   POST /api/staff/bookings/:id/confirm - Confirmar reserva");
    info!("   POST /api/staff/bookings/:id/claim-delivery - Reclamar entrega");
    info!("   POST /api/staff/bookings/:id/claim-takeback - Reclamar recogida");
    info!("   POST /api/staff/tasks/:id/complete-delivery - Cerrar entrega");
    info!("   POST /api/staff/tasks/:id/complete-takeback - Cerrar recogida");
    info!("   POST /api/staff/damage - Reportar avería");
    info!("👑 Administración:");
    info!("   GET  /api/admin/dashboard - Panel de métricas");
    info!("   POST /api/admin/staff - Alta de personal");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                anyhow::anyhow!(e)
            })
    });

    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
