use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::{is_unique_violation, ApiError},
    state::AppState,
    users::repo::User,
    verification::{
        dto::{
            GenerateResponse, MyRequestIdResponse, NameAndEmail, RevokeResponse, UserSummary,
            VerifiedUser, VerifyResponse,
        },
        request_id,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/verification/generate-request-id",
            post(generate_request_id),
        )
        .route("/verification/my-request-id", get(my_request_id))
        .route("/verification/revoke-request-id", delete(revoke_request_id))
        .route("/verification/verify", get(verify_without_request_id))
        .route("/verification/verify/:request_id", get(verify_by_request_id))
}

/// POST /api/verification/generate-request-id
///
/// Issues a fresh request id for the authenticated user, overwriting any
/// previous one. Only verified users may hold a request id.
#[instrument(skip(state))]
pub async fn generate_request_id(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<GenerateResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !user.is_verified {
        return Err(ApiError::PreconditionFailed(
            "User must be verified before generating request ID".into(),
        ));
    }

    let new_request_id = request_id::generate();
    let user = match User::set_request_id(&state.db, user_id, Some(new_request_id.as_str())).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError::NotFound("User not found".into())),
        // Another user won the race for this exact token; the caller
        // retries and gets a fresh one.
        Err(e) if is_unique_violation(&e) => return Err(ApiError::Duplicate("requestId")),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, "request id rotated");
    Ok(Json(GenerateResponse {
        success: true,
        message: "Request ID generated successfully".into(),
        request_id: new_request_id,
        user: UserSummary::from_user(&user),
    }))
}

/// GET /api/verification/verify/:request_id
///
/// Public lookup for third parties. A revoked or never-issued id answers
/// identically.
#[instrument(skip(state))]
pub async fn verify_by_request_id(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let request_id = request_id.trim().to_string();
    if request_id.is_empty() {
        return Err(ApiError::BadRequest("Request ID is required".into()));
    }

    let user = User::find_by_request_id(&state.db, &request_id)
        .await?
        .ok_or(ApiError::UnknownRequestId)?;

    info!(user_id = %user.id, verified = user.is_verified, "request id lookup");
    Ok(Json(VerifyResponse {
        success: true,
        message: "User verification status retrieved successfully".into(),
        verified: user.is_verified,
        request_id,
        user: VerifiedUser {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            id_card_number: user.id_card_number,
            is_verified: user.is_verified,
            verified_at: user.is_verified.then_some(user.updated_at),
        },
        timestamp: OffsetDateTime::now_utc(),
    }))
}

/// GET /api/verification/verify with no id at all: still a 400, never a
/// bare router 404.
pub async fn verify_without_request_id() -> ApiError {
    ApiError::BadRequest("Request ID is required".into())
}

/// GET /api/verification/my-request-id
#[instrument(skip(state))]
pub async fn my_request_id(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MyRequestIdResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(MyRequestIdResponse {
        success: true,
        has_request_id: user.request_id.is_some(),
        request_id: user.request_id,
        is_verified: user.is_verified,
        user: NameAndEmail {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        },
    }))
}

/// DELETE /api/verification/revoke-request-id
///
/// Clears the stored request id; afterwards the old value looks up as if
/// it had never been issued.
#[instrument(skip(state))]
pub async fn revoke_request_id(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<RevokeResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let Some(revoked) = user.request_id else {
        return Err(ApiError::BadRequest("No request ID found to revoke".into()));
    };

    User::set_request_id(&state.db, user_id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user_id, "request id revoked");
    Ok(Json(RevokeResponse {
        success: true,
        message: "Request ID revoked successfully".into(),
        revoked_request_id: revoked,
    }))
}
