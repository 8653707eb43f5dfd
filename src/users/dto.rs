use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description};
use uuid::Uuid;

use crate::users::repo::User;

/// Wire format for birth dates, e.g. `1994-07-23`.
pub static BIRTH_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Registration body. Every field is optional at the serde layer so that
/// validation can report all missing fields at once instead of failing on
/// the first deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub id_card_number: Option<String>,
    pub serial_number: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile update; omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub id_card_number: Option<String>,
    pub serial_number: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub is_verified: Option<bool>,
    pub id_card_face: Option<String>,
}

/// User projection returned from register/login/update, together with a
/// fresh bearer token. The password hash is never part of this shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub id_card_number: String,
    pub serial_number: String,
    pub birth_date: String,
    pub gender: Option<String>,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_card_face: Option<String>,
    pub token: String,
}

impl AuthResponse {
    pub fn from_user(user: &User, token: String) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            id_card_number: user.id_card_number.clone(),
            serial_number: user.serial_number.clone(),
            birth_date: user
                .birth_date
                .format(BIRTH_DATE_FORMAT)
                .unwrap_or_default(),
            gender: user.gender.clone(),
            is_verified: user.is_verified,
            id_card_face: user.id_card_face.clone(),
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$not-a-real-hash".into(),
            id_card_number: "12345678901".into(),
            serial_number: "A01B23456".into(),
            birth_date: date!(1990 - 01 - 02),
            gender: Some("female".into()),
            is_verified: false,
            request_id: Some("req_abc_def".into()),
            id_card_face: None,
            created_at: datetime!(2024-05-01 12:00 UTC),
            updated_at: datetime!(2024-05-01 12:00 UTC),
        }
    }

    #[test]
    fn auth_response_never_exposes_the_hash() {
        let json =
            serde_json::to_string(&AuthResponse::from_user(&sample_user(), "jwt".into())).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn auth_response_uses_camel_case_and_formats_the_date() {
        let value = serde_json::to_value(AuthResponse::from_user(&sample_user(), "jwt".into()))
            .unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["idCardNumber"], "12345678901");
        assert_eq!(value["birthDate"], "1990-01-02");
        assert_eq!(value["isVerified"], false);
        assert_eq!(value["token"], "jwt");
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(req.email.as_deref(), Some("a@b.c"));
        assert!(req.first_name.is_none());
        assert!(req.birth_date.is_none());
    }
}
