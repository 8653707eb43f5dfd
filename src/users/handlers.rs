use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        jwt::{AuthUser, JwtKeys},
        password::verify_password,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest},
        repo::User,
        service,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = service::register(&state.db, payload).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::from_user(&user, token)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = service::normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse::from_user(&user, token)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = service::update_profile(&state.db, user_id, payload).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    Ok(Json(AuthResponse::from_user(&user, token)))
}
