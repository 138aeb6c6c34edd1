//! Friendships and food diaries
//!
//! `SocialGraph` keeps friend edges symmetric; `DiaryStore` owns every
//! user's meal log and answers listing and per-day total queries. Neither
//! performs authorization; that is the caller's job.

pub mod diary;
pub mod graph;
pub mod models;

pub use diary::{DiaryStore, RECENT_LIMIT};
pub use graph::SocialGraph;
pub use models::{DailyTotals, FeedEntry, FoodEntry, NewFoodEntry};
