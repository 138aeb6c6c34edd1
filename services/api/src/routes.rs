//! API service routes

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use common::{CoreError, UserId};
use serde::Deserialize;
use serde_json::json;
use social::NewFoodEntry;

use crate::{
    error::{ApiError, ApiResult},
    extract::AuthUser,
    state::AppState,
};

/// Request body for register and login
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for adding a friend
#[derive(Debug, Deserialize)]
pub struct AddFriendRequest {
    pub friend_id: Option<UserId>,
}

/// Optional `?date=YYYY-MM-DD`
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// `?q=` for user search
#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `?query=` or `?q=` for food search
#[derive(Debug, Default, Deserialize)]
pub struct FoodSearchQuery {
    pub query: Option<String>,
    pub q: Option<String>,
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/food", post(add_food).get(get_food))
        .route("/api/food/stats", get(get_stats))
        .route("/api/food/search", get(search_food))
        .route("/api/users/search", get(search_users))
        .route("/api/friends", post(add_friend).get(get_friends))
        .route("/api/friends/:friend_id/food", get(get_friend_food))
        .route("/api/feed", get(get_feed))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "food-diary-api"
        })),
    )
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let session = state
        .access
        .register(&payload.username, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let session = state
        .access
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(session))
}

pub async fn add_food(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    payload: Result<Json<NewFoodEntry>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let id = state.access.record_food(requester, payload).await?;

    Ok(Json(json!({
        "id": id,
        "message": "Food logged successfully"
    })))
}

pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let date = parse_date(query.date.as_deref())?;
    let entries = state.access.own_diary(requester, date).await?;

    Ok(Json(entries))
}

pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let date = parse_date(query.date.as_deref())?;
    let totals = state.access.own_totals(requester, date).await?;

    Ok(Json(totals))
}

/// Nutrition lookup; requires a valid session like every other data route
pub async fn search_food(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    query: Result<Query<FoodSearchQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let text = query.query.or(query.q).unwrap_or_default();
    let results = state.nutrition.search(&text).await;

    Ok(Json(json!({ "results": results })))
}

pub async fn search_users(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    query: Result<Query<UserSearchQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let users = state.access.find_users(requester, &query.q).await?;

    Ok(Json(users))
}

pub async fn add_friend(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    payload: Result<Json<AddFriendRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let friend_id = payload
        .friend_id
        .ok_or_else(|| CoreError::validation("friend_id is required"))?;
    state.access.befriend(requester, friend_id).await?;

    Ok(Json(json!({ "message": "Friend added" })))
}

pub async fn get_friends(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let friends = state.access.friends(requester).await?;

    Ok(Json(friends))
}

pub async fn get_friend_food(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    friend_id: Result<Path<UserId>, PathRejection>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(friend_id) = friend_id?;
    let Query(query) = query?;
    let date = parse_date(query.date.as_deref())?;
    let entries = state.access.friend_diary(requester, friend_id, date).await?;

    Ok(Json(entries))
}

pub async fn get_feed(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let feed = state.access.feed(requester).await?;

    Ok(Json(feed))
}

/// Parse an optional calendar date; blank means "no date"
fn parse_date(raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest("date must be formatted as YYYY-MM-DD".into())),
    }
}
