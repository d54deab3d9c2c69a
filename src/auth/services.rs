use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{JwtResponse, SigninRequest, SignupRequest},
        jwt::TokenService,
        password::{hash_password, verify_password},
    },
    error::AppError,
    users::{
        model::{NewUser, User},
        repo::UserDirectory,
    },
};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_signup(req: &SignupRequest) -> Result<(), AppError> {
    let len = req.username.chars().count();
    if !(3..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "Username must be between 3 and {MAX_USERNAME_LEN} characters"
        )));
    }
    if req.username.chars().any(char::is_whitespace) {
        return Err(AppError::BadRequest("Username must not contain spaces".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password too short".into()));
    }
    Ok(())
}

/// Registers a new account. Nothing is written when the username or email is taken.
pub async fn sign_up(directory: &dyn UserDirectory, mut req: SignupRequest) -> Result<User, AppError> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_string();
    req.name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    validate_signup(&req)?;

    if directory.find_by_username(&req.username).await?.is_some() {
        warn!(username = %req.username, "username already taken");
        return Err(AppError::DuplicateUsername);
    }
    if directory.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already in use");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password(&req.password)?;
    let user = directory
        .create(NewUser {
            name: req.name,
            username: req.username,
            email: req.email,
            address: None,
            phone: None,
            website: None,
            company: None,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials and issues a token whose subject is the username.
pub async fn sign_in(
    directory: &dyn UserDirectory,
    tokens: &TokenService,
    req: SigninRequest,
) -> Result<JwtResponse, AppError> {
    let username = req.username.trim();
    let Some(user) = directory.find_by_username(username).await? else {
        warn!(username, "sign-in for unknown username");
        return Err(AppError::AuthenticationFailed);
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(username, user_id = %user.id, "sign-in with wrong password");
        return Err(AppError::AuthenticationFailed);
    }

    let token = tokens.issue(&user.username, OffsetDateTime::now_utc())?;
    info!(user_id = %user.id, username, "user signed in");
    Ok(JwtResponse {
        token,
        token_type: "Bearer",
        username: user.username,
    })
}
