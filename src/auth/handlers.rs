use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, ProtectedResponse, RegisterRequest, RegisterResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::StoreError,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/protected", get(protected))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AppError> {
    let Json(payload) = payload?;
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::UserExists);
    }

    let hash = hash_password(&payload.password).context("hash password")?;

    // The lookup above can race a concurrent registration; the store's
    // uniqueness constraint decides.
    let new_user = match state.users.create(&payload.email, &hash).await {
        Ok(u) => u,
        Err(StoreError::Conflict) => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(AppError::UserExists);
        }
        Err(e) => return Err(e.into()),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(new_user.id).context("sign token")?;

    info!(user_id = %new_user.id, email = %new_user.email, "user registered");
    Ok(Json(RegisterResponse { new_user, token }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::UserNotFound);
    };

    if !verify_password(&payload.password, &user.password_hash).context("verify password")? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidPassword);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).context("sign token")?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse { token }))
}

#[instrument(skip(state))]
pub async fn protected(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProtectedResponse>, AppError> {
    let Some(user) = state.users.find_by_id(user_id).await? else {
        warn!(user_id = %user_id, "token bound to missing user");
        return Err(AppError::UserNotFound);
    };

    Ok(Json(ProtectedResponse {
        message: "Protected data",
        user,
    }))
}
