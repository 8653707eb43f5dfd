use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Redacted summary attached to generate/rotate responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_verified: bool,
}

impl UserSummary {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub request_id: String,
    pub user: UserSummary,
}

/// Projection handed to unauthenticated third parties. `verified_at` is
/// only present once the user has passed verification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub id_card_number: String,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub verified: bool,
    pub request_id: String,
    pub user: VerifiedUser,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRequestIdResponse {
    pub success: bool,
    pub request_id: Option<String>,
    pub is_verified: bool,
    pub has_request_id: bool,
    pub user: NameAndEmail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameAndEmail {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub success: bool,
    pub message: String,
    pub revoked_request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn verify_response_serializes_rfc3339_timestamps() {
        let response = VerifyResponse {
            success: true,
            message: "ok".into(),
            verified: true,
            request_id: "req_abc_def".into(),
            user: VerifiedUser {
                id: Uuid::new_v4(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                id_card_number: "12345678901".into(),
                is_verified: true,
                verified_at: Some(datetime!(2024-05-01 12:00 UTC)),
            },
            timestamp: datetime!(2024-05-02 08:30 UTC),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["requestId"], "req_abc_def");
        assert_eq!(value["user"]["verifiedAt"], "2024-05-01T12:00:00Z");
        assert_eq!(value["timestamp"], "2024-05-02T08:30:00Z");
    }

    #[test]
    fn unverified_lookup_has_null_verified_at() {
        let user = VerifiedUser {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            id_card_number: "12345678901".into(),
            is_verified: false,
            verified_at: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value["verifiedAt"].is_null());
    }

    #[test]
    fn my_request_id_response_reports_token_presence() {
        let response = MyRequestIdResponse {
            success: true,
            request_id: None,
            is_verified: false,
            has_request_id: false,
            user: NameAndEmail {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["requestId"].is_null());
        assert_eq!(value["hasRequestId"], false);
        assert_eq!(value["user"]["firstName"], "Ada");
    }
}
