//! Application state shared across handlers

use sqlx::SqlitePool;

use crate::{access::AccessService, nutrition::NutritionSearch};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub access: AccessService,
    pub nutrition: NutritionSearch,
}
