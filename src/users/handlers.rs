use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, services::is_valid_email},
    error::AppError,
    state::AppState,
    users::model::{User, UserUpdate},
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users)).route(
        "/users/:id",
        get(get_user).put(update_user).delete(delete_user),
    )
}

#[instrument(skip(state, auth), fields(caller = %auth.username))]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.directory.list().await?))
}

#[instrument(skip(state, auth), fields(caller = %auth.username))]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.directory.get(id).await?))
}

#[instrument(skip(state, auth, update), fields(caller = %auth.username))]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(mut update): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    if let Some(email) = update.email.as_mut() {
        *email = email.trim().to_string();
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Invalid email".into()));
        }
    }
    let user = state.directory.update(id, update).await?;
    info!(user_id = %user.id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state, auth), fields(caller = %auth.username))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.directory.delete(id).await?;
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::OK)
}
