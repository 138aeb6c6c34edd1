//! Database module for handling SQLite connections and schema
//!
//! This module provides connection pooling, configuration, embedded
//! migrations and health checks for the food diary datastore.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

/// Database configuration struct
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl DatabaseConfig {
    /// Create a new DatabaseConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DATABASE_URL`: SQLite connection URL (default: "sqlite://foodtracker.db")
    /// - `DATABASE_MAX_CONNECTIONS`: Maximum number of connections (default: 10)
    /// - `DATABASE_MIN_CONNECTIONS`: Minimum number of connections (default: 1)
    /// - `DATABASE_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 30)
    pub fn from_env() -> DatabaseResult<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://foodtracker.db".to_string());

        if database_url.trim().is_empty() {
            return Err(DatabaseError::Configuration(
                "DATABASE_URL must not be empty".to_string(),
            ));
        }

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let connection_timeout = env::var("DATABASE_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            database_url,
            max_connections,
            min_connections,
            connection_timeout,
        })
    }
}

/// Initialize a SQLite connection pool
///
/// The database file is created when missing and foreign keys are enforced
/// on every connection.
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    info!("Initializing database connection pool");

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connection)?;

    info!("Database connection pool initialized successfully");
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &SqlitePool) -> DatabaseResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    info!("Database migrations applied");
    Ok(())
}

/// Open a migrated in-memory database
///
/// The pool holds a single connection that never expires, since every
/// connection to `sqlite::memory:` would otherwise see its own empty database.
pub async fn memory_pool() -> DatabaseResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::Configuration(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connection)?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Check database connectivity
pub async fn health_check(pool: &SqlitePool) -> DatabaseResult<bool> {
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => {
            info!("Database health check successful");
            Ok(true)
        }
        Err(e) => {
            error!("Database health check failed: {}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_database_config_defaults() {
        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("DATABASE_MAX_CONNECTIONS");
            env::remove_var("DATABASE_MIN_CONNECTIONS");
            env::remove_var("DATABASE_CONNECTION_TIMEOUT");
        }

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.database_url, "sqlite://foodtracker.db");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connection_timeout, 30);
    }

    #[test]
    #[serial]
    fn test_database_config_from_env_with_custom_values() {
        unsafe {
            env::set_var("DATABASE_URL", "sqlite://test.db");
            env::set_var("DATABASE_MAX_CONNECTIONS", "20");
            env::set_var("DATABASE_CONNECTION_TIMEOUT", "not-a-number");
        }

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.database_url, "sqlite://test.db");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.connection_timeout, 30);

        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("DATABASE_MAX_CONNECTIONS");
            env::remove_var("DATABASE_CONNECTION_TIMEOUT");
        }
    }

    #[tokio::test]
    async fn test_memory_pool_is_migrated() {
        let pool = memory_pool().await.unwrap();
        assert!(health_check(&pool).await.unwrap());

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' \
             AND name NOT LIKE 'sqlite%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["food_entries", "friend_edges", "tokens", "users"]);
    }
}
