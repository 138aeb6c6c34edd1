//! Common library for the food diary service
//!
//! This crate provides functionality shared by the auth, social and api
//! crates: datastore configuration and pooling, the embedded schema, and
//! the error taxonomy every component reports.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     assert!(health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;

pub use error::{CoreError, CoreResult, DatabaseError, DatabaseResult};

/// Identifier of a registered user
pub type UserId = i64;

/// Identifier of a logged food entry
pub type EntryId = i64;
