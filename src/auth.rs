use crate::app::SharedState;
use crate::error::ApiError;
use crate::user_models::{CredentialsRequest, LoginResponse, User, UserProfile};
use anyhow::Context;
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

const MIN_PASSWORD_LEN: usize = 6;

/// The authenticated owner behind a request, resolved from its bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::AuthRequired)?;

        let user_id = state
            .users
            .session_user(token)
            .await
            .ok_or(ApiError::AuthRequired)?;

        Ok(AuthUser {
            user_id,
            token: token.to_string(),
        })
    }
}

pub async fn signup(
    State(state): State<SharedState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let username = payload.username.trim().to_string();

    if username.is_empty() {
        return Err(ApiError::BadRequest("Username cannot be empty".to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if state.users.get_user_by_username(&username).await.is_some() {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, state.password_cost)
        .context("Failed to hash password")
        .map_err(|e| ApiError::upstream("Failed to create account", e))?;

    let user = state
        .users
        .create_user(User::new(username, password_hash))
        .await
        .map_err(|e| ApiError::upstream("Failed to create account", e))?;

    info!(user_id = %user.id, username = %user.username, "account created");
    Ok((StatusCode::CREATED, Json(user.profile())))
}

pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let invalid = || ApiError::InvalidCredentials("Invalid username or password".to_string());

    let user = state
        .users
        .get_user_by_username(payload.username.trim())
        .await
        .ok_or_else(invalid)?;

    let valid = bcrypt::verify(&payload.password, &user.password_hash)
        .context("Failed to verify password")
        .map_err(|e| ApiError::upstream("Failed to log in", e))?;
    if !valid {
        return Err(invalid());
    }

    let token = state.users.start_session(&user.id).await;
    info!(user_id = %user.id, "session started");

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}

pub async fn logout(State(state): State<SharedState>, user: AuthUser) -> Json<Value> {
    state.users.end_session(&user.token).await;
    Json(json!({ "message": "Logged out" }))
}
