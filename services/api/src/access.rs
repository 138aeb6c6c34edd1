//! Access-controlled queries
//!
//! Every operation resolves the bearer token through the session authority
//! first, either directly or by taking a [`Requester`] produced by
//! [`AccessService::resolve`]. Reads of another user's diary are gated on
//! the friend edge `(requester, target)` and the diary is never queried when
//! that check fails. The service holds no state of its own beyond the
//! component handles.

use std::collections::HashMap;

use auth::{SessionAuthority, UserRepository, UserSummary};
use chrono::{NaiveDate, Utc};
use common::{CoreError, CoreResult, EntryId, UserId};
use serde::Serialize;
use social::{DailyTotals, DiaryStore, FeedEntry, FoodEntry, NewFoodEntry, SocialGraph};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Feed length cap
pub const FEED_LIMIT: u32 = 50;

/// User search result cap
pub const SEARCH_LIMIT: u32 = 10;

/// Result of a successful register or login
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub username: String,
    pub user_id: UserId,
}

/// A caller whose bearer token has been validated
///
/// Only obtainable through [`AccessService::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    user_id: UserId,
}

impl Requester {
    pub fn user_id(self) -> UserId {
        self.user_id
    }
}

/// Composes the credential store, session authority, social graph and diary
#[derive(Clone)]
pub struct AccessService {
    users: UserRepository,
    sessions: SessionAuthority,
    graph: SocialGraph,
    diary: DiaryStore,
}

impl AccessService {
    /// Build every component on one pool
    pub fn new(pool: SqlitePool) -> Self {
        Self::from_parts(
            UserRepository::new(pool.clone()),
            SessionAuthority::new(pool.clone()),
            SocialGraph::new(pool.clone()),
            DiaryStore::new(pool),
        )
    }

    /// Build from already constructed components
    pub fn from_parts(
        users: UserRepository,
        sessions: SessionAuthority,
        graph: SocialGraph,
        diary: DiaryStore,
    ) -> Self {
        Self {
            users,
            sessions,
            graph,
            diary,
        }
    }

    /// Create an account and sign it in
    pub async fn register(&self, username: &str, secret: &str) -> CoreResult<AuthSession> {
        let user = self.users.register(username, secret).await?;
        let session = self.sessions.issue(user.id).await?;

        Ok(AuthSession {
            token: session.token,
            username: user.username,
            user_id: user.id,
        })
    }

    /// Exchange credentials for a fresh token
    pub async fn login(&self, username: &str, secret: &str) -> CoreResult<AuthSession> {
        if username.trim().is_empty() || secret.is_empty() {
            return Err(CoreError::InvalidCredentials);
        }

        let user = self
            .users
            .verify_credentials(username, secret)
            .await?
            .ok_or_else(|| {
                warn!("Failed login attempt for user: {}", username.trim());
                CoreError::InvalidCredentials
            })?;

        let session = self.sessions.issue(user.id).await?;
        info!("User {} logged in", user.id);

        Ok(AuthSession {
            token: session.token,
            username: user.username,
            user_id: user.id,
        })
    }

    /// Resolve a bearer token into the caller it belongs to
    ///
    /// Fails with `Unauthorized` for missing, malformed, unknown and expired
    /// tokens alike.
    pub async fn resolve(&self, token: &str) -> CoreResult<Requester> {
        let user_id = self.sessions.authenticate(Some(token)).await?;
        Ok(Requester { user_id })
    }

    /// Resolve a bearer token or fail with `Unauthorized`
    pub async fn authenticate(&self, token: &str) -> CoreResult<UserId> {
        Ok(self.resolve(token).await?.user_id())
    }

    pub async fn log_food(&self, token: &str, entry: NewFoodEntry) -> CoreResult<EntryId> {
        self.record_food(self.resolve(token).await?, entry).await
    }

    pub async fn get_own_diary(
        &self,
        token: &str,
        date: Option<NaiveDate>,
    ) -> CoreResult<Vec<FoodEntry>> {
        self.own_diary(self.resolve(token).await?, date).await
    }

    pub async fn daily_totals(
        &self,
        token: &str,
        date: Option<NaiveDate>,
    ) -> CoreResult<DailyTotals> {
        self.own_totals(self.resolve(token).await?, date).await
    }

    pub async fn get_friend_diary(
        &self,
        token: &str,
        friend_id: UserId,
        date: Option<NaiveDate>,
    ) -> CoreResult<Vec<FoodEntry>> {
        self.friend_diary(self.resolve(token).await?, friend_id, date).await
    }

    pub async fn get_feed(&self, token: &str) -> CoreResult<Vec<FeedEntry>> {
        self.feed(self.resolve(token).await?).await
    }

    pub async fn search_users(&self, token: &str, query: &str) -> CoreResult<Vec<UserSummary>> {
        self.find_users(self.resolve(token).await?, query).await
    }

    pub async fn add_friend(&self, token: &str, friend_id: UserId) -> CoreResult<()> {
        self.befriend(self.resolve(token).await?, friend_id).await
    }

    pub async fn list_friends(&self, token: &str) -> CoreResult<Vec<UserSummary>> {
        self.friends(self.resolve(token).await?).await
    }

    pub async fn record_food(
        &self,
        requester: Requester,
        entry: NewFoodEntry,
    ) -> CoreResult<EntryId> {
        self.diary.append(requester.user_id, entry).await
    }

    /// The requester's own entries; owners need no further authorization
    pub async fn own_diary(
        &self,
        requester: Requester,
        date: Option<NaiveDate>,
    ) -> CoreResult<Vec<FoodEntry>> {
        self.diary.list_for(requester.user_id, date).await
    }

    /// The requester's macro totals for a day, today (UTC) when unspecified
    pub async fn own_totals(
        &self,
        requester: Requester,
        date: Option<NaiveDate>,
    ) -> CoreResult<DailyTotals> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        self.diary.daily_totals(requester.user_id, date).await
    }

    /// A friend's entries
    ///
    /// Fails with `Forbidden` for anyone who is not a friend, whether or not
    /// that user exists or has entries.
    pub async fn friend_diary(
        &self,
        requester: Requester,
        friend_id: UserId,
        date: Option<NaiveDate>,
    ) -> CoreResult<Vec<FoodEntry>> {
        if !self.graph.are_friends(requester.user_id, friend_id).await? {
            warn!(
                "User {} denied access to diary of {}",
                requester.user_id, friend_id
            );
            return Err(CoreError::Forbidden);
        }

        self.diary.list_for(friend_id, date).await
    }

    /// Latest entries of every friend, newest first, with author usernames
    pub async fn feed(&self, requester: Requester) -> CoreResult<Vec<FeedEntry>> {
        let friends = self.graph.list_friends(requester.user_id).await?;
        if friends.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<UserId> = friends.iter().map(|f| f.id).collect();
        let names: HashMap<UserId, String> =
            friends.into_iter().map(|f| (f.id, f.username)).collect();

        let entries = self.diary.recent_for_users(&ids, FEED_LIMIT).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let username = names.get(&entry.user_id)?.clone();
                Some(FeedEntry { entry, username })
            })
            .collect())
    }

    /// Username discovery, open to any authenticated user
    pub async fn find_users(
        &self,
        requester: Requester,
        query: &str,
    ) -> CoreResult<Vec<UserSummary>> {
        self.users.search(query, requester.user_id, SEARCH_LIMIT).await
    }

    pub async fn befriend(&self, requester: Requester, friend_id: UserId) -> CoreResult<()> {
        self.graph.add_friend(requester.user_id, friend_id).await
    }

    pub async fn friends(&self, requester: Requester) -> CoreResult<Vec<UserSummary>> {
        self.graph.list_friends(requester.user_id).await
    }
}
