//! Diary and feed models

use chrono::{DateTime, Utc};
use common::{EntryId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A logged meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FoodEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub meal_name: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub notes: String,
    pub logged_at: DateTime<Utc>,
}

/// Food entry creation payload
///
/// Only `meal_name` and `calories` are required; missing macros count as 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFoodEntry {
    #[serde(default)]
    pub meal_name: String,
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub notes: Option<String>,
}

impl NewFoodEntry {
    /// Convenience constructor for the two required fields
    pub fn new(meal_name: impl Into<String>, calories: i64) -> Self {
        Self {
            meal_name: meal_name.into(),
            calories: Some(calories),
            ..Self::default()
        }
    }

    pub fn with_macros(mut self, protein: f64, carbs: f64, fats: f64) -> Self {
        self.protein = Some(protein);
        self.carbs = Some(carbs);
        self.fats = Some(fats);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Per-day macro sums for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, FromRow)]
pub struct DailyTotals {
    #[serde(rename = "total_calories")]
    pub calories: i64,
    #[serde(rename = "total_protein")]
    pub protein: f64,
    #[serde(rename = "total_carbs")]
    pub carbs: f64,
    #[serde(rename = "total_fats")]
    pub fats: f64,
}

/// A friend's entry as shown in the activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub entry: FoodEntry,
    pub username: String,
}
