use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{JwtResponse, MessageResponse, SigninRequest, SignupRequest},
        jwt::TokenService,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::sign_up(state.directory.as_ref(), payload).await?;
    Ok(Json(MessageResponse {
        message: "User registered successfully!".into(),
    }))
}

#[instrument(skip(state, tokens, payload))]
pub async fn signin(
    State(state): State<AppState>,
    State(tokens): State<Arc<TokenService>>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<JwtResponse>, AppError> {
    let resp = services::sign_in(state.directory.as_ref(), &tokens, payload).await?;
    Ok(Json(resp))
}
