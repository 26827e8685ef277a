use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppJson;
use crate::utils::response::{created, empty_success, success};

pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let name = non_blank(payload.name);
    let email = non_blank(payload.email).map(|e| e.to_lowercase());
    let password = payload.password.filter(|p| !p.is_empty());

    let (name, email, password) = match (name, email, password) {
        (Some(name), Some(email), Some(password)) => (name, email, password),
        (name, email, password) => {
            let missing = [
                ("name", name.is_none()),
                ("email", email.is_none()),
                ("password", password.is_none()),
            ]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(field, _)| field.to_string())
            .collect();
            return Err(AppError::MissingFields(missing));
        }
    };

    if !email.contains('@') {
        return Err(AppError::ValidationError(
            "email must be a valid address".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(password, state.bcrypt_cost).await?;
    let user = User::new(name, email, password_hash, payload.role.unwrap_or_default());
    state.store.insert_user(&user).await?;

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok(created(AuthPayload { token, user }, "User registered successfully"))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Response, AppError> {
    let (email, password) = match (non_blank(payload.email), payload.password) {
        (Some(email), Some(password)) => (email, password),
        (email, password) => {
            let mut missing = Vec::new();
            if email.is_none() {
                missing.push("email".to_string());
            }
            if password.is_none() {
                missing.push("password".to_string());
            }
            return Err(AppError::MissingFields(missing));
        }
    };

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(success(AuthPayload { token, user }, "Login successful"))
}

pub async fn profile(CurrentUser(user): CurrentUser) -> Response {
    success(user, "Profile retrieved successfully")
}

/// Tokens are stateless; clients discard theirs.
pub async fn logout() -> Response {
    empty_success("Logged out successfully")
}
