//! Session authority: opaque bearer tokens stored in the datastore
//!
//! A token is valid while `now < issued_at + ttl`. Validity is computed from
//! the stored issuance time on every lookup; expired rows are simply never
//! matched and may be purged at leisure.

use chrono::{DateTime, Duration, Utc};
use common::error::{is_foreign_key_violation, is_unique_violation};
use common::{CoreError, CoreResult, DatabaseError, UserId};
use rand::RngCore;
use rand::rngs::OsRng;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::models::Session;

/// Lifetime of an issued token
pub const TOKEN_TTL_DAYS: i64 = 30;

/// Random bytes per token; hex encoding doubles the length
const TOKEN_BYTES: usize = 32;

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct SessionAuthority {
    pool: SqlitePool,
    ttl: Duration,
}

impl SessionAuthority {
    /// Create a session authority with the standard 30 day lifetime
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_ttl(pool, Duration::days(TOKEN_TTL_DAYS))
    }

    /// Create a session authority with a custom token lifetime
    pub fn with_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Issue a fresh token for a user
    pub async fn issue(&self, user_id: UserId) -> CoreResult<Session> {
        self.issue_at(user_id, Utc::now()).await
    }

    /// Issue a fresh token stamped with an explicit issuance time
    pub async fn issue_at(&self, user_id: UserId, issued_at: DateTime<Utc>) -> CoreResult<Session> {
        // One retry on token collision
        for _ in 0..2 {
            let token = generate_token();

            let result =
                sqlx::query("INSERT INTO tokens (token, user_id, created_at) VALUES (?, ?, ?)")
                    .bind(&token)
                    .bind(user_id)
                    .bind(issued_at)
                    .execute(&self.pool)
                    .await;

            match result {
                Ok(_) => {
                    info!("Issued session token for user: {}", user_id);
                    return Ok(Session {
                        token,
                        user_id,
                        issued_at,
                    });
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!("Token collision while issuing for user: {}", user_id);
                }
                Err(e) if is_foreign_key_violation(&e) => return Err(CoreError::NotFound),
                Err(e) => return Err(CoreError::Database(DatabaseError::Query(e))),
            }
        }

        Err(CoreError::Internal("could not allocate a unique token".to_string()))
    }

    /// Resolve a token to its user if it is still valid
    pub async fn validate(&self, token: &str) -> CoreResult<Option<UserId>> {
        self.validate_at(token, Utc::now()).await
    }

    /// Resolve a token against an explicit current time
    ///
    /// Unknown, malformed and expired tokens all yield `None`.
    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> CoreResult<Option<UserId>> {
        if !is_well_formed(token) {
            debug!("Rejected malformed token");
            return Ok(None);
        }

        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at FROM tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session
            .filter(|session| now < session.issued_at + self.ttl)
            .map(|session| session.user_id))
    }

    /// Resolve an optional bearer string or fail with `Unauthorized`
    ///
    /// Missing, malformed, unknown and expired tokens are indistinguishable.
    pub async fn authenticate(&self, token: Option<&str>) -> CoreResult<UserId> {
        let token = token.map(str::trim).unwrap_or_default();
        self.validate(token).await?.ok_or(CoreError::Unauthorized)
    }

    /// Delete every token that expired before `now`
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let cutoff = now - self.ttl;
        let result = sqlx::query("DELETE FROM tokens WHERE created_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        info!("Purged {} expired tokens", result.rows_affected());
        Ok(result.rows_affected())
    }
}

/// Generate a new opaque token from the OS CSPRNG
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Cheap shape check that spares the datastore obviously bogus tokens
fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}
