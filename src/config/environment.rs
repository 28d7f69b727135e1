//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno, las credenciales
//! y las políticas de negocio del sistema de alquiler.

use std::env;

/// Política de asignación de oficinas para entregas y recogidas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeAssignmentPolicy {
    /// Oficina más cercana dentro de una banda de distancia [min_km, max_km)
    NearestBand,
    /// Oficinas con flag de capacidad y radio de servicio propio
    ServiceArea,
}

/// Ordenamiento de las listas de despacho del personal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrdering {
    /// Vencidas primero, luego por hora programada ascendente
    Time,
    /// Vencidas primero, luego por urgencia compuesta distancia + espera
    Distance,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    // Políticas de negocio
    pub office_assignment_policy: OfficeAssignmentPolicy,
    pub delivery_min_km: f64,
    pub delivery_max_km: f64,
    pub dispatch_ordering: DispatchOrdering,
    pub booking_lead_time_hours: i64,
    pub fine_no_show: i64,
    pub fine_cancel: i64,
    // Correo SMTP (el envío queda deshabilitado si falta el host)
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub mail_from: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            port: env::var("PORT")
                .expect("PORT must be set")
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").expect("HOST must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiration: env::var("JWT_EXPIRATION")
                .expect("JWT_EXPIRATION must be set")
                .parse()
                .expect("JWT_EXPIRATION must be a valid number"),
            cors_origins: env::var("CORS_ORIGINS")
                .expect("CORS_ORIGINS must be set")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            office_assignment_policy: parse_assignment_policy(
                &env::var("OFFICE_ASSIGNMENT_POLICY").unwrap_or_else(|_| "nearest_band".to_string()),
            ),
            delivery_min_km: env::var("DELIVERY_MIN_KM")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()
                .expect("DELIVERY_MIN_KM must be a valid number"),
            delivery_max_km: env::var("DELIVERY_MAX_KM")
                .unwrap_or_else(|_| "100.0".to_string())
                .parse()
                .expect("DELIVERY_MAX_KM must be a valid number"),
            dispatch_ordering: parse_dispatch_ordering(
                &env::var("DISPATCH_ORDERING").unwrap_or_else(|_| "time".to_string()),
            ),
            booking_lead_time_hours: env::var("BOOKING_LEAD_TIME_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("BOOKING_LEAD_TIME_HOURS must be a valid number"),
            fine_no_show: env::var("FINE_NO_SHOW")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .expect("FINE_NO_SHOW must be a valid number"),
            fine_cancel: env::var("FINE_CANCEL")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("FINE_CANCEL must be a valid number"),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .expect("SMTP_PORT must be a valid number"),
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            mail_from: env::var("MAIL_FROM").ok(),
        }
    }
}

fn parse_assignment_policy(value: &str) -> OfficeAssignmentPolicy {
    match value {
        "nearest_band" => OfficeAssignmentPolicy::NearestBand,
        "service_area" => OfficeAssignmentPolicy::ServiceArea,
        other => panic!(
            "OFFICE_ASSIGNMENT_POLICY must be 'nearest_band' or 'service_area', got '{}'",
            other
        ),
    }
}

fn parse_dispatch_ordering(value: &str) -> DispatchOrdering {
    match value {
        "time" => DispatchOrdering::Time,
        "distance" => DispatchOrdering::Distance,
        other => panic!("DISPATCH_ORDERING must be 'time' or 'distance', got '{}'", other),
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
