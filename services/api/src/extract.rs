//! Bearer token extraction

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use common::CoreError;

use crate::{access::Requester, error::ApiError, state::AppState};

/// Raw bearer token from the `Authorization` header
///
/// Accepts either `Bearer <token>` (scheme matched case-insensitively) or the
/// bare token. A missing or empty header is rejected with the same
/// `Unauthorized` error as an invalid token; validation itself happens in the
/// access service.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .map(str::trim)
            .filter(|header| !header.is_empty())
            .ok_or(ApiError::Core(CoreError::Unauthorized))?;

        let token = match header.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
            _ => header,
        };

        Ok(BearerToken(token.to_string()))
    }
}

/// The authenticated caller of a request
///
/// Handlers list this before any path, query or body extractor so an invalid
/// token is rejected before the rest of the request is looked at.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Requester);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_request_parts(parts, state).await?;
        let requester = state.access.resolve(token.as_str()).await?;

        Ok(AuthUser(requester))
    }
}
