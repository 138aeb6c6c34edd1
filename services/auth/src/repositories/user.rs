//! User repository: the credential store

use std::sync::{Arc, OnceLock};

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use chrono::Utc;
use common::error::is_unique_violation;
use common::{CoreError, CoreResult, DatabaseError, UserId};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::models::{User, UserSummary};
use crate::validation::{validate_secret, validate_username};

/// Secret hashed once to give unknown usernames the same verification cost
const DUMMY_SECRET: &str = "food-diary-dummy-secret";

/// User repository
///
/// Owns the `users` relation. Credentials are stored as salted Argon2id
/// PHC strings.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    argon2: Argon2<'static>,
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl UserRepository {
    /// Create a new user repository with the default Argon2id cost
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_params(pool, Params::default())
    }

    /// Create a user repository with explicit Argon2 cost parameters
    pub fn with_params(pool: SqlitePool, params: Params) -> Self {
        Self {
            pool,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Register a new user
    ///
    /// Fails with `DuplicateUsername` when the name is taken; the existing
    /// record is left untouched.
    pub async fn register(&self, username: &str, secret: &str) -> CoreResult<User> {
        let username = username.trim();
        validate_username(username).map_err(CoreError::Validation)?;
        validate_secret(secret).map_err(CoreError::Validation)?;

        info!("Creating new user: {}", username);

        let credential_hash = self.hash_secret(secret)?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, username_folded, credential_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, credential_hash, created_at
            "#,
        )
        .bind(username)
        .bind(fold_username(username))
        .bind(&credential_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                warn!("Registration rejected, username taken: {}", username);
                Err(CoreError::DuplicateUsername)
            }
            Err(e) => Err(CoreError::Database(DatabaseError::Query(e))),
        }
    }

    /// Check a username and secret pair
    ///
    /// Returns `None` both for an unknown username and for a wrong secret.
    pub async fn verify_credentials(
        &self,
        username: &str,
        secret: &str,
    ) -> CoreResult<Option<User>> {
        let user = self.find_by_username(username.trim()).await?;

        match user {
            Some(user) => {
                if self.verify_secret(&user.credential_hash, secret)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => {
                if let Some(dummy) = self.dummy_hash() {
                    let _ = self.verify_secret(dummy, secret);
                }
                Ok(None)
            }
        }
    }

    /// Find a user by exact username
    pub async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, credential_hash, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: UserId) -> CoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, credential_hash, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Case-insensitive substring search over usernames
    ///
    /// Both sides are compared in their Unicode lowercase form, so `ålice`
    /// finds `Ålice`. `exclude` is left out of the results; at most `limit` rows come back,
    /// ordered by id.
    pub async fn search(
        &self,
        query: &str,
        exclude: UserId,
        limit: u32,
    ) -> CoreResult<Vec<UserSummary>> {
        let pattern = format!("%{}%", escape_like(&fold_username(query.trim())));

        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username
            FROM users
            WHERE username_folded LIKE ? ESCAPE '\' AND id != ?
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(pattern)
        .bind(exclude)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    fn hash_secret(&self, secret: &str) -> CoreResult<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash password: {}", e);
                CoreError::Internal(format!("password hashing failed: {}", e))
            })
    }

    fn verify_secret(&self, credential_hash: &str, secret: &str) -> CoreResult<bool> {
        let parsed_hash = PasswordHash::new(credential_hash).map_err(|e| {
            error!("Stored credential hash is not a valid PHC string: {}", e);
            CoreError::Internal(format!("corrupt credential hash: {}", e))
        })?;

        Ok(self
            .argon2
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash
            .get_or_init(|| self.hash_secret(DUMMY_SECRET).ok())
            .as_deref()
    }
}

/// Case-folded form stored alongside the username for search
fn fold_username(username: &str) -> String {
    username.to_lowercase()
}

/// Escape LIKE wildcards so the query matches literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
