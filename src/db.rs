use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub type DbPool = DatabaseConnection;

/// Pool tuning derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// Every connection to `sqlite::memory:` opens its own empty database,
    /// so such pools are held to a single connection.
    fn is_in_memory(&self) -> bool {
        self.url.starts_with("sqlite::memory:") || self.url.contains("mode=memory")
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let (max, min) = if config.is_in_memory() {
        (1, 1)
    } else {
        (config.max_connections, config.min_connections)
    };

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(max)
        .min_connections(min)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("fleetmeter.db.max_connections", f64::from(max));
    info!(max_connections = max, "Opening database pool");

    Database::connect(options).await.map_err(|e| {
        error!(error = %e, "Could not open database pool");
        ServiceError::DatabaseError(e)
    })
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// Applies pending schema migrations; already-applied ones are skipped.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(|e| {
            error!(error = %e, "Schema migration failed");
            ServiceError::DatabaseError(e)
        })?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Schema up to date");
    Ok(())
}

/// Pings the database, recording latency and failures.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    match pool.ping().await {
        Ok(()) => {
            histogram!("fleetmeter.db.ping_seconds", start.elapsed().as_secs_f64());
            debug!("Database ping ok");
            Ok(())
        }
        Err(e) => {
            counter!("fleetmeter.db.ping_failures", 1);
            error!(error = %e, "Database ping failed");
            Err(ServiceError::DatabaseError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DbConfig {
        DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 8,
            min_connections: 2,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn memory_urls_are_detected() {
        assert!(memory_config().is_in_memory());
        let file = DbConfig {
            url: "sqlite://fleetmeter.db?mode=rwc".into(),
            ..memory_config()
        };
        assert!(!file.is_in_memory());
    }

    #[tokio::test]
    async fn connects_migrates_and_pings_sqlite() {
        let pool = establish_connection_with_config(&memory_config())
            .await
            .expect("sqlite memory pool");

        run_migrations(&pool).await.expect("migrations apply");
        // applying twice is a no-op
        run_migrations(&pool).await.expect("migrations are idempotent");
        assert!(check_connection(&pool).await.is_ok());
    }
}
