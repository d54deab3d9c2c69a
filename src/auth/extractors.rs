use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{
    auth::{
        jwt::TokenError,
        role::{roles_for, PERMITTED_ROLE},
    },
    error::AppError,
    state::AppState,
};

/// Caller of a protected route: a live token whose subject is a stored user
/// holding the permitted role. Rejections happen before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::InvalidToken("Missing Authorization header".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidToken("Invalid auth scheme".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let subject = if state.tokens.validate(token) {
            state.tokens.subject_of(token)?
        } else {
            // Ask again only to tell an expired token from a bad one.
            let reason = state.tokens.check(token).err().unwrap_or(TokenError::Invalid);
            warn!(error = %reason, "rejected bearer token");
            return Err(reason.into());
        };

        let Some(user) = state.directory.find_by_username(&subject).await? else {
            warn!(%subject, "token subject has no account");
            return Err(AppError::InvalidToken("Unknown token subject".into()));
        };

        let roles = roles_for(&user);
        if !roles.contains(&PERMITTED_ROLE) {
            warn!(username = %user.username, ?roles, "caller lacks required role");
            return Err(AppError::Forbidden);
        }

        Ok(AuthUser {
            username: user.username,
        })
    }
}
