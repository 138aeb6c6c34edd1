//! Session model and related functionality

use std::fmt;

use chrono::{DateTime, Utc};
use common::UserId;
use serde::Serialize;
use sqlx::FromRow;

/// An issued bearer token and the identity it stands for
#[derive(Clone, Serialize, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    #[sqlx(rename = "created_at")]
    pub issued_at: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}
