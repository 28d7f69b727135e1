//! Conexión a PostgreSQL
//!
//! Este módulo encapsula el pool de conexiones y aplica las migraciones
//! al arrancar el servicio.

use anyhow::Result;
use sqlx::PgPool;

use crate::config::database::DatabaseConfig;

/// Conexión compartida a la base de datos
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Crear la conexión con la configuración por defecto y aplicar migraciones
    pub async fn new_default() -> Result<Self> {
        let config = DatabaseConfig::default();
        Self::new(&config).await
    }

    /// Crear la conexión con una configuración explícita
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = config.create_pool().await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Pool de conexiones subyacente
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Verificar que la conexión responde
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
