//! Integration tests for the datastore bootstrap
//!
//! These tests verify that the schema is applied and that the relational
//! constraints the service relies on are enforced by the datastore itself.

use common::database::{DatabaseConfig, health_check, init_pool, memory_pool, run_migrations};
use common::error::{is_foreign_key_violation, is_unique_violation};
use sqlx::Row;

/// File-backed pool comes up, migrates twice without error and answers queries
#[tokio::test]
async fn test_file_database_bootstrap() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join(format!("food-diary-{}.db", std::process::id()));
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}", path.display()),
        max_connections: 2,
        min_connections: 1,
        connection_timeout: 5,
    };

    let pool = init_pool(&config).await?;
    run_migrations(&pool).await?;
    run_migrations(&pool).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "SQLite simple query test failed");

    pool.close().await;
    let _ = std::fs::remove_file(&path);
    Ok(())
}

/// Username uniqueness and the friend edge key are datastore constraints
#[tokio::test]
async fn test_constraints_are_enforced() -> Result<(), Box<dyn std::error::Error>> {
    let pool = memory_pool().await?;

    let insert_user = "INSERT INTO users (username, username_folded, credential_hash, created_at) \
         VALUES ('alice', 'alice', ?, '2024-01-01T00:00:00+00:00')";

    sqlx::query(insert_user).bind("x").execute(&pool).await?;

    let duplicate = sqlx::query(insert_user)
        .bind("y")
        .execute(&pool)
        .await
        .expect_err("duplicate username must be rejected");
    assert!(is_unique_violation(&duplicate));

    let dangling = sqlx::query(
        "INSERT INTO friend_edges (user_id, friend_id, created_at) \
         VALUES (1, 99, '2024-01-01T00:00:00+00:00')",
    )
    .execute(&pool)
    .await
    .expect_err("edge to unknown user must be rejected");
    assert!(is_foreign_key_violation(&dangling));

    Ok(())
}
