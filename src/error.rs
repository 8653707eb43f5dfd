use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy shared by every handler. Business failures carry a
/// stable message; anything unexpected falls through to `Internal`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid user data")]
    Validation(Vec<String>),

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    /// Public request-id lookup miss, rendered as a structured
    /// `{found: false}` body. A revoked id is indistinguishable from one
    /// that never existed.
    #[error("invalid request id or user not found")]
    UnknownRequestId,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// True when the error wraps a Postgres unique-index violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| match e {
            sqlx::Error::Database(db) => db.code().map(|c| c == "23505"),
            _ => None,
        })
        .unwrap_or(false)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified: Option<bool>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self {
            success: None,
            found: None,
            verified: None,
            message: message.into(),
            errors: None,
            error: None,
        }
    }
}

fn duplicate_message(field: &str) -> String {
    match field {
        "email" => "Email is already registered".into(),
        "idCardNumber" => "ID card number is already registered".into(),
        "requestId" => "Request ID is already in use".into(),
        other => format!("Duplicate value for {other}"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    errors: Some(errors),
                    ..ErrorBody::message("Invalid user data")
                },
            ),
            ApiError::Duplicate(field) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::message(duplicate_message(field)),
            ),
            ApiError::PreconditionFailed(msg) | ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorBody::message(msg))
            }
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::message("Invalid email or password"),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::message(msg)),
            ApiError::UnknownRequestId => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    success: Some(false),
                    found: Some(false),
                    verified: Some(false),
                    ..ErrorBody::message("Invalid request ID or user not found")
                },
            ),
            ApiError::Internal(err) => {
                error!(error = %err, "unhandled server error");
                let production = std::env::var("APP_ENV")
                    .map(|v| v == "production")
                    .unwrap_or(false);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: (!production).then(|| err.to_string()),
                        ..ErrorBody::message("Server error")
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        let cases = [
            (ApiError::Validation(vec!["x".into()]), 400),
            (ApiError::Duplicate("email"), 400),
            (ApiError::PreconditionFailed("nope".into()), 400),
            (ApiError::BadRequest("missing".into()), 400),
            (ApiError::InvalidCredentials, 401),
            (ApiError::NotFound("User not found".into()), 404),
            (ApiError::UnknownRequestId, 404),
            (ApiError::Internal(anyhow::anyhow!("boom")), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status().as_u16(), expected);
        }
    }

    #[tokio::test]
    async fn unknown_request_id_has_stable_shape() {
        let resp = ApiError::UnknownRequestId.into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["found"], false);
        assert_eq!(body["verified"], false);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn validation_lists_every_error() {
        let resp =
            ApiError::Validation(vec!["First name is required".into(), "Email is required".into()])
                .into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn duplicate_messages_are_field_specific() {
        assert!(duplicate_message("email").contains("Email"));
        assert!(duplicate_message("idCardNumber").contains("ID card"));
    }
}
