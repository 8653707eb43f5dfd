use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::{is_unique_violation, ApiError};
use crate::users::dto::{RegisterRequest, UpdateProfileRequest, BIRTH_DATE_FORMAT};
use crate::users::repo::{NewUser, ProfileChanges, User};
use crate::verification::request_id;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_valid_gender(gender: &str) -> bool {
    gender == "male" || gender == "female"
}

fn parse_birth_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), BIRTH_DATE_FORMAT).ok()
}

/// A registration request with every field checked and in storable form.
#[derive(Debug)]
struct ValidRegistration {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    id_card_number: String,
    serial_number: String,
    birth_date: Date,
    gender: Option<String>,
}

/// Checks every field and reports all problems at once.
fn validate_registration(req: &RegisterRequest) -> Result<ValidRegistration, ApiError> {
    let mut errors = Vec::new();

    let required = |value: &Option<String>, message: &str, errors: &mut Vec<String>| {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                errors.push(message.to_string());
                None
            }
        }
    };

    let first_name = required(&req.first_name, "First name is required", &mut errors);
    let last_name = required(&req.last_name, "Last name is required", &mut errors);
    let id_card_number = required(&req.id_card_number, "ID card number is required", &mut errors);
    let serial_number = required(&req.serial_number, "Serial number is required", &mut errors);

    let email = match req.email.as_deref().map(normalize_email) {
        Some(e) if !e.is_empty() => {
            if is_valid_email(&e) {
                Some(e)
            } else {
                errors.push("Please enter a valid email".to_string());
                None
            }
        }
        _ => {
            errors.push("Email is required".to_string());
            None
        }
    };

    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => {
            if p.len() >= MIN_PASSWORD_LEN {
                Some(p.to_string())
            } else {
                errors.push(format!(
                    "Password must be at least {MIN_PASSWORD_LEN} characters"
                ));
                None
            }
        }
        _ => {
            errors.push("Password is required".to_string());
            None
        }
    };

    let birth_date = match req.birth_date.as_deref() {
        Some(raw) if !raw.trim().is_empty() => match parse_birth_date(raw) {
            Some(date) => Some(date),
            None => {
                errors.push("Birth date must be formatted as YYYY-MM-DD".to_string());
                None
            }
        },
        _ => {
            errors.push("Birth date is required".to_string());
            None
        }
    };

    let gender = match req.gender.as_deref().map(str::trim) {
        Some(g) if !g.is_empty() => {
            if is_valid_gender(g) {
                Some(g.to_string())
            } else {
                errors.push("Gender must be male or female".to_string());
                None
            }
        }
        _ => None,
    };

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // All Nones produced an error above.
    match (
        first_name,
        last_name,
        email,
        password,
        id_card_number,
        serial_number,
        birth_date,
    ) {
        (Some(first_name), Some(last_name), Some(email), Some(password), Some(id_card_number), Some(serial_number), Some(birth_date)) => {
            Ok(ValidRegistration {
                first_name,
                last_name,
                email,
                password,
                id_card_number,
                serial_number,
                birth_date,
                gender,
            })
        }
        _ => Err(ApiError::Internal(anyhow::anyhow!(
            "validation passed with missing fields"
        ))),
    }
}

/// A fresh record gets a generated request id unless one was supplied;
/// updates never go through this path.
fn assign_request_id(supplied: Option<String>) -> String {
    supplied
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(request_id::generate)
}

/// Registration lifecycle: validate, duplicate-check field by field, hash
/// the password, assign the request id, then write once. The per-field
/// pre-checks are what give duplicate errors a deterministic field name.
pub async fn register(db: &PgPool, req: RegisterRequest) -> Result<User, ApiError> {
    let valid = validate_registration(&req)?;

    if User::email_taken(db, &valid.email, None).await? {
        return Err(ApiError::Duplicate("email"));
    }
    if User::id_card_taken(db, &valid.id_card_number, None).await? {
        return Err(ApiError::Duplicate("idCardNumber"));
    }

    let password_hash = hash_password(&valid.password)?;

    let new = NewUser {
        first_name: valid.first_name,
        last_name: valid.last_name,
        email: valid.email,
        password_hash,
        id_card_number: valid.id_card_number,
        serial_number: valid.serial_number,
        birth_date: valid.birth_date,
        gender: valid.gender,
        request_id: assign_request_id(None),
    };

    match User::create(db, &new).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok(user)
        }
        // Email and id card were checked above, so the surviving unique
        // constraint is the request id. The caller retries with a new one.
        Err(e) if is_unique_violation(&e) => Err(ApiError::Duplicate("requestId")),
        Err(e) => Err(e.into()),
    }
}

/// Profile update lifecycle: partial-field semantics, password re-hashed
/// only when supplied, request id left untouched.
pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<User, ApiError> {
    let mut errors = Vec::new();

    let email = match req.email.as_deref().map(normalize_email) {
        Some(e) if !e.is_empty() => {
            if is_valid_email(&e) {
                Some(e)
            } else {
                errors.push("Please enter a valid email".to_string());
                None
            }
        }
        _ => None,
    };

    if let Some(p) = req.password.as_deref() {
        if p.len() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
    }

    let birth_date = match req.birth_date.as_deref() {
        Some(raw) if !raw.trim().is_empty() => match parse_birth_date(raw) {
            Some(date) => Some(date),
            None => {
                errors.push("Birth date must be formatted as YYYY-MM-DD".to_string());
                None
            }
        },
        _ => None,
    };

    if let Some(g) = req.gender.as_deref().map(str::trim) {
        if !g.is_empty() && !is_valid_gender(g) {
            errors.push("Gender must be male or female".to_string());
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if User::find_by_id(db, user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    if let Some(email) = &email {
        if User::email_taken(db, email, Some(user_id)).await? {
            return Err(ApiError::Duplicate("email"));
        }
    }
    if let Some(id_card) = req.id_card_number.as_deref() {
        if User::id_card_taken(db, id_card, Some(user_id)).await? {
            return Err(ApiError::Duplicate("idCardNumber"));
        }
    }

    if req.is_verified.is_some() {
        // The verified flag is meant to be granted by the verification
        // flow, yet this endpoint accepts it from the client.
        warn!(user_id = %user_id, "profile update sets isVerified directly");
    }

    let password_hash = match req.password.as_deref() {
        Some(p) => Some(hash_password(p)?),
        None => None,
    };

    let changes = ProfileChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        email,
        password_hash,
        id_card_number: req.id_card_number,
        serial_number: req.serial_number,
        birth_date,
        gender: req.gender,
        is_verified: req.is_verified,
        id_card_face: req.id_card_face,
    };

    let user = User::update_profile(db, user_id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::request_id::looks_like_request_id;

    fn full_request() -> RegisterRequest {
        RegisterRequest {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            email: Some("Ada@Example.com ".into()),
            password: Some("hunter22".into()),
            id_card_number: Some("12345678901".into()),
            serial_number: Some("A01B23456".into()),
            birth_date: Some("1990-01-02".into()),
            gender: Some("female".into()),
        }
    }

    #[test]
    fn validation_accepts_a_complete_request() {
        let valid = validate_registration(&full_request()).expect("valid request");
        assert_eq!(valid.email, "ada@example.com");
        assert_eq!(valid.birth_date, time::macros::date!(1990 - 01 - 02));
    }

    #[test]
    fn validation_reports_every_missing_field() {
        let err = validate_registration(&RegisterRequest::default()).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        for expected in [
            "First name is required",
            "Last name is required",
            "Email is required",
            "Password is required",
            "ID card number is required",
            "Serial number is required",
            "Birth date is required",
        ] {
            assert!(errors.iter().any(|e| e == expected), "missing: {expected}");
        }
    }

    #[test]
    fn validation_rejects_bad_email_password_date_and_gender() {
        let req = RegisterRequest {
            email: Some("not-an-email".into()),
            password: Some("short".into()),
            birth_date: Some("02/01/1990".into()),
            gender: Some("other".into()),
            ..full_request()
        };
        let ApiError::Validation(errors) = validate_registration(&req).unwrap_err() else {
            panic!("expected a validation error");
        };
        assert!(errors.iter().any(|e| e.contains("valid email")));
        assert!(errors.iter().any(|e| e.contains("at least 6")));
        assert!(errors.iter().any(|e| e.contains("YYYY-MM-DD")));
        assert!(errors.iter().any(|e| e.contains("male or female")));
    }

    #[test]
    fn email_normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn assign_request_id_generates_only_when_absent() {
        let supplied = assign_request_id(Some("req_custom_token".into()));
        assert_eq!(supplied, "req_custom_token");

        let generated = assign_request_id(None);
        assert!(looks_like_request_id(&generated));

        let blank = assign_request_id(Some("   ".into()));
        assert!(looks_like_request_id(&blank));
    }
}
