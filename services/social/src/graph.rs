//! Social graph: symmetric friendships stored as directed edge pairs
//!
//! Every friendship is two rows, `(a, b)` and `(b, a)`, written in one
//! transaction. The `(user_id, friend_id)` primary key is what decides the
//! winner when the same pair is added concurrently.

use auth::UserSummary;
use chrono::Utc;
use common::error::{is_foreign_key_violation, is_unique_violation};
use common::{CoreError, CoreResult, DatabaseError, UserId};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Social graph repository
#[derive(Clone)]
pub struct SocialGraph {
    pool: SqlitePool,
}

impl SocialGraph {
    /// Create a new social graph repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Make two users friends
    ///
    /// Both directed edges are inserted atomically. If either already exists
    /// the call fails with `AlreadyFriends` and nothing is written. An
    /// unknown `other_id` yields `NotFound`; befriending yourself is a
    /// validation error.
    pub async fn add_friend(&self, user_id: UserId, other_id: UserId) -> CoreResult<()> {
        if user_id == other_id {
            return Err(CoreError::validation("Cannot add yourself as a friend"));
        }

        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        for (from, to) in [(user_id, other_id), (other_id, user_id)] {
            let result = sqlx::query(
                "INSERT INTO friend_edges (user_id, friend_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(from)
            .bind(to)
            .bind(created_at)
            .execute(&mut *tx)
            .await;

            // Returning drops `tx`, which rolls back the first edge.
            match result {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    warn!("Friendship {} <-> {} already exists", user_id, other_id);
                    return Err(CoreError::AlreadyFriends);
                }
                Err(e) if is_foreign_key_violation(&e) => return Err(CoreError::NotFound),
                Err(e) => return Err(CoreError::Database(DatabaseError::Query(e))),
            }
        }

        tx.commit().await?;
        info!("Friendship created: {} <-> {}", user_id, other_id);
        Ok(())
    }

    /// Everyone `user_id` has an edge to, ordered by username
    pub async fn list_friends(&self, user_id: UserId) -> CoreResult<Vec<UserSummary>> {
        let friends = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username
            FROM friend_edges f
            JOIN users u ON u.id = f.friend_id
            WHERE f.user_id = ?
            ORDER BY u.username, u.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }

    /// Whether the directed edge `(requester, target)` exists
    pub async fn are_friends(&self, requester: UserId, target: UserId) -> CoreResult<bool> {
        let edge: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM friend_edges WHERE user_id = ? AND friend_id = ?")
                .bind(requester)
                .bind(target)
                .fetch_optional(&self.pool)
                .await?;

        Ok(edge.is_some())
    }
}
