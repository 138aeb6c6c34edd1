//! User model and related functionality

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2 PHC string; never leaves the service
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user, safe to show to other users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}
