use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use tracing::info;

use crate::config::{Config, DatabaseConfig};
use crate::error::{GateError, Result};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect and build the pool
    pub async fn new(config: &Config) -> Result<Self> {
        let options = connect_options(&config.database)?;

        info!(
            host = %config.database.host,
            port = %config.database.port,
            database = %config.database.name,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .min_connections(config.database.min_connections)
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(30 * 60))
            .max_lifetime(Duration::from_secs(60 * 60))
            .connect_with(options)
            .await
            .map_err(|e| GateError::DatabaseConnection(e.to_string()))?;

        info!("Database connection pool established");

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");
        super::migrations::run_migrations(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

/// Connection options from discrete settings; the password never ends up
/// in a URL or a log line.
fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let ssl_mode = PgSslMode::from_str(&config.ssl_mode).map_err(|_| {
        GateError::InvalidConfig(format!("DB_SSLMODE '{}' is not supported", config.ssl_mode))
    })?;

    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode)
        .application_name("tradegate"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_config(ssl_mode: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".to_string(),
            port: 6432,
            user: "tradegate".to_string(),
            password: "p@ss:word".to_string(),
            name: "tradegate".to_string(),
            ssl_mode: ssl_mode.to_string(),
            max_connections: 20,
            min_connections: 2,
        }
    }

    #[test]
    fn test_connect_options() {
        let options = connect_options(&database_config("require")).unwrap();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6432);
        assert_eq!(options.get_database(), Some("tradegate"));
    }

    #[test]
    fn test_unknown_ssl_mode_is_rejected() {
        assert!(matches!(
            connect_options(&database_config("sometimes")),
            Err(GateError::InvalidConfig(_))
        ));
    }
}
