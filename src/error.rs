use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::auth::jwt::TokenError;
use crate::users::repo::DirectoryError;

/// Every failure a request can end with. Each variant maps to its own status and message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error: Username is already taken!")]
    DuplicateUsername,

    #[error("Error: Email is already in use!")]
    DuplicateEmail,

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("{0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Insufficient role")]
    Forbidden,

    #[error("User not found")]
    NotFound,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateUsername | AppError::DuplicateEmail | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::AuthenticationFailed | AppError::InvalidToken(_) | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "request failed");
        }
        (self.status(), self.to_string()).into_response()
    }
}

impl From<DirectoryError> for AppError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::DuplicateUsername => AppError::DuplicateUsername,
            DirectoryError::DuplicateEmail => AppError::DuplicateEmail,
            DirectoryError::NotFound => AppError::NotFound,
            DirectoryError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::ExpiredToken,
            TokenError::Invalid => AppError::InvalidToken("Invalid token".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_has_its_own_status() {
        assert_eq!(AppError::DuplicateUsername.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AuthenticationFailed.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicates_stay_distinguishable() {
        assert_ne!(
            AppError::DuplicateUsername.to_string(),
            AppError::DuplicateEmail.to_string()
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn directory_and_token_errors_convert() {
        assert!(matches!(
            AppError::from(DirectoryError::NotFound),
            AppError::NotFound
        ));
        assert!(matches!(
            AppError::from(DirectoryError::DuplicateEmail),
            AppError::DuplicateEmail
        ));
        assert!(matches!(
            AppError::from(TokenError::Expired),
            AppError::ExpiredToken
        ));
        assert!(matches!(
            AppError::from(TokenError::Invalid),
            AppError::InvalidToken(_)
        ));
    }
}
