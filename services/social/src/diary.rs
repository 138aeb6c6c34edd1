//! Diary store: per-user append-only meal log

use chrono::{DateTime, NaiveDate, Utc};
use common::error::is_foreign_key_violation;
use common::{CoreError, CoreResult, DatabaseError, EntryId, UserId};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::models::{DailyTotals, FoodEntry, NewFoodEntry};

/// Entries returned when no date is given
pub const RECENT_LIMIT: u32 = 50;

const ENTRY_COLUMNS: &str =
    "id, user_id, meal_name, calories, protein, carbs, fats, notes, logged_at";

/// Diary repository
#[derive(Clone)]
pub struct DiaryStore {
    pool: SqlitePool,
}

impl DiaryStore {
    /// Create a new diary repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Log a meal, stamped with the current server time
    pub async fn append(&self, user_id: UserId, entry: NewFoodEntry) -> CoreResult<EntryId> {
        self.append_at(user_id, entry, Utc::now()).await
    }

    /// Log a meal with an explicit timestamp
    pub async fn append_at(
        &self,
        user_id: UserId,
        entry: NewFoodEntry,
        logged_at: DateTime<Utc>,
    ) -> CoreResult<EntryId> {
        let meal_name = entry.meal_name.trim();
        if meal_name.is_empty() {
            return Err(CoreError::validation("meal_name is required"));
        }

        let calories = entry
            .calories
            .ok_or_else(|| CoreError::validation("calories is required"))?;
        if calories < 0 {
            return Err(CoreError::validation("calories must not be negative"));
        }

        let protein = non_negative("protein", entry.protein)?;
        let carbs = non_negative("carbs", entry.carbs)?;
        let fats = non_negative("fats", entry.fats)?;

        let result = sqlx::query_scalar::<_, EntryId>(
            r#"
            INSERT INTO food_entries
                (user_id, meal_name, calories, protein, carbs, fats, notes, logged_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(meal_name)
        .bind(calories)
        .bind(protein)
        .bind(carbs)
        .bind(fats)
        .bind(entry.notes.unwrap_or_default())
        .bind(logged_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => {
                info!("User {} logged food entry {}", user_id, id);
                Ok(id)
            }
            Err(e) if is_foreign_key_violation(&e) => Err(CoreError::NotFound),
            Err(e) => Err(CoreError::Database(DatabaseError::Query(e))),
        }
    }

    /// A user's entries, newest first
    ///
    /// With a date, every entry logged on that UTC calendar day; without one,
    /// the most recent `RECENT_LIMIT` entries. Equal timestamps are ordered
    /// by descending id.
    pub async fn list_for(
        &self,
        user_id: UserId,
        date: Option<NaiveDate>,
    ) -> CoreResult<Vec<FoodEntry>> {
        let entries = match date {
            Some(date) => {
                sqlx::query_as::<_, FoodEntry>(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM food_entries \
                     WHERE user_id = ? AND date(logged_at) = date(?) \
                     ORDER BY logged_at DESC, id DESC"
                ))
                .bind(user_id)
                .bind(date)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, FoodEntry>(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM food_entries \
                     WHERE user_id = ? \
                     ORDER BY logged_at DESC, id DESC LIMIT ?"
                ))
                .bind(user_id)
                .bind(i64::from(RECENT_LIMIT))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(entries)
    }

    /// Most recent entries across several users, newest first
    pub async fn recent_for_users(
        &self,
        user_ids: &[UserId],
        limit: u32,
    ) -> CoreResult<Vec<FoodEntry>> {
        if user_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM food_entries WHERE user_id IN ("
        ));
        let mut ids = builder.separated(", ");
        for id in user_ids {
            ids.push_bind(*id);
        }
        builder.push(") ORDER BY logged_at DESC, id DESC LIMIT ");
        builder.push_bind(i64::from(limit));

        let entries = builder
            .build_query_as::<FoodEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Sum of every macro over a user's entries on one day
    ///
    /// A day with no entries sums to zero rather than failing.
    pub async fn daily_totals(&self, user_id: UserId, date: NaiveDate) -> CoreResult<DailyTotals> {
        let totals = sqlx::query_as::<_, DailyTotals>(
            r#"
            SELECT
                COALESCE(SUM(calories), 0) AS calories,
                TOTAL(protein) AS protein,
                TOTAL(carbs) AS carbs,
                TOTAL(fats) AS fats
            FROM food_entries
            WHERE user_id = ? AND date(logged_at) = date(?)
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }
}

fn non_negative(field: &str, value: Option<f64>) -> CoreResult<f64> {
    let value = value.unwrap_or(0.0);
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::validation(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::database::memory_pool;

    async fn store_with_user() -> (DiaryStore, UserId) {
        let pool = memory_pool().await.unwrap();
        let id: UserId = sqlx::query_scalar(
            "INSERT INTO users (username, username_folded, credential_hash, created_at) \
             VALUES ('alice', 'alice', 'x', ?) RETURNING id",
        )
        .bind(Utc::now())
        .fetch_one(&pool)
        .await
        .unwrap();
        (DiaryStore::new(pool), id)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[tokio::test]
    async fn test_append_defaults_macros_and_notes() {
        let (diary, user) = store_with_user().await;
        let id = diary
            .append_at(user, NewFoodEntry::new("Toast", 120), at(1, 8))
            .await
            .unwrap();

        let entries = diary.list_for(user, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.user_id, user);
        assert_eq!(entry.meal_name, "Toast");
        assert_eq!((entry.protein, entry.carbs, entry.fats), (0.0, 0.0, 0.0));
        assert_eq!(entry.notes, "");
        assert_eq!(entry.logged_at, at(1, 8));
    }

    #[tokio::test]
    async fn test_append_validates_input() {
        let (diary, user) = store_with_user().await;

        let cases = [
            NewFoodEntry::new("  ", 100),
            NewFoodEntry {
                meal_name: "Soup".into(),
                ..NewFoodEntry::default()
            },
            NewFoodEntry::new("Soup", -1),
            NewFoodEntry::new("Soup", 100).with_macros(-1.0, 0.0, 0.0),
            NewFoodEntry::new("Soup", 100).with_macros(0.0, f64::NAN, 0.0),
        ];

        for case in cases {
            assert!(matches!(
                diary.append(user, case).await,
                Err(CoreError::Validation(_))
            ));
        }
        assert!(diary.list_for(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_for_unknown_user_fails() {
        let (diary, user) = store_with_user().await;
        let err = diary
            .append(user + 7, NewFoodEntry::new("Ghost", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
    }

    #[tokio::test]
    async fn test_list_for_date_and_ordering() {
        let (diary, user) = store_with_user().await;
        diary.append_at(user, NewFoodEntry::new("Late dinner", 700), at(1, 23)).await.unwrap();
        let first = diary
            .append_at(user, NewFoodEntry::new("Lunch", 500), at(2, 12))
            .await
            .unwrap();
        let second = diary
            .append_at(user, NewFoodEntry::new("Snack", 100), at(2, 12))
            .await
            .unwrap();
        let breakfast = diary
            .append_at(user, NewFoodEntry::new("Breakfast", 300), at(2, 0))
            .await
            .unwrap();
        diary.append_at(user, NewFoodEntry::new("Next day", 50), at(3, 0)).await.unwrap();

        let ids: Vec<_> = diary
            .list_for(user, Some(march(2)))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![second, first, breakfast]);

        assert!(diary.list_for(user, Some(march(20))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_without_date_returns_latest_fifty() {
        let (diary, user) = store_with_user().await;
        let base = at(1, 0);
        for i in 0..60 {
            let when = base + chrono::Duration::minutes(i);
            diary
                .append_at(user, NewFoodEntry::new(format!("Meal {}", i), 10), when)
                .await
                .unwrap();
        }

        let entries = diary.list_for(user, None).await.unwrap();
        assert_eq!(entries.len(), RECENT_LIMIT as usize);
        assert_eq!(entries[0].meal_name, "Meal 59");
        assert_eq!(entries[49].meal_name, "Meal 10");
        assert!(entries.windows(2).all(|w| w[0].logged_at >= w[1].logged_at));
    }

    #[tokio::test]
    async fn test_daily_totals() {
        let (diary, user) = store_with_user().await;

        let empty = diary.daily_totals(user, march(5)).await.unwrap();
        assert_eq!(empty, DailyTotals::default());

        diary
            .append_at(
                user,
                NewFoodEntry::new("Salmon", 300).with_macros(22.0, 0.0, 13.0),
                at(5, 12),
            )
            .await
            .unwrap();
        diary
            .append_at(user, NewFoodEntry::new("Rice", 200).with_macros(2.5, 23.0, 0.9), at(5, 19))
            .await
            .unwrap();
        diary
            .append_at(user, NewFoodEntry::new("Other day", 999), at(6, 1))
            .await
            .unwrap();

        let totals = diary.daily_totals(user, march(5)).await.unwrap();
        assert_eq!(totals.calories, 500);
        assert!((totals.protein - 24.5).abs() < 1e-9);
        assert!((totals.carbs - 23.0).abs() < 1e-9);
        assert!((totals.fats - 13.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_recent_for_users_merges_and_caps() {
        let (diary, alice) = store_with_user().await;
        let bob: UserId = sqlx::query_scalar(
            "INSERT INTO users (username, username_folded, credential_hash, created_at) \
             VALUES ('bob', 'bob', 'x', ?) RETURNING id",
        )
        .bind(Utc::now())
        .fetch_one(&diary.pool)
        .await
        .unwrap();

        diary.append_at(alice, NewFoodEntry::new("a1", 1), at(1, 1)).await.unwrap();
        diary.append_at(bob, NewFoodEntry::new("b1", 1), at(1, 2)).await.unwrap();
        diary.append_at(alice, NewFoodEntry::new("a2", 1), at(1, 3)).await.unwrap();

        let names = |entries: Vec<FoodEntry>| -> Vec<String> {
            entries.into_iter().map(|e| e.meal_name).collect()
        };

        let everyone = diary.recent_for_users(&[alice, bob], 50).await.unwrap();
        assert_eq!(names(everyone), vec!["a2", "b1", "a1"]);

        let capped = diary.recent_for_users(&[alice, bob], 2).await.unwrap();
        assert_eq!(names(capped), vec!["a2", "b1"]);

        assert_eq!(names(diary.recent_for_users(&[bob], 50).await.unwrap()), vec!["b1"]);
        assert!(diary.recent_for_users(&[], 50).await.unwrap().is_empty());
    }
}
