use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database. The password hash never leaves the repo
/// layer except for login verification.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub id_card_number: String,
    pub serial_number: String,
    pub birth_date: Date,
    pub gender: Option<String>,
    pub is_verified: bool,
    pub request_id: Option<String>,
    pub id_card_face: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields persisted on first creation. `request_id` is already assigned by
/// the lifecycle layer at this point.
#[derive(Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub id_card_number: String,
    pub serial_number: String,
    pub birth_date: Date,
    pub gender: Option<String>,
    pub request_id: String,
}

/// Partial profile update. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub id_card_number: Option<String>,
    pub serial_number: Option<String>,
    pub birth_date: Option<Date>,
    pub gender: Option<String>,
    pub is_verified: Option<bool>,
    pub id_card_face: Option<String>,
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, id_card_number, \
     serial_number, birth_date, gender, is_verified, request_id, id_card_face, \
     created_at, updated_at";

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Email lookups expect a normalized (trimmed, lowercased) value.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_request_id(db: &PgPool, request_id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE request_id = $1"
        ))
        .bind(request_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn email_taken(
        db: &PgPool,
        email: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(db)
        .await?;
        Ok(taken)
    }

    pub async fn id_card_taken(
        db: &PgPool,
        id_card_number: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id_card_number = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(id_card_number)
        .bind(exclude)
        .fetch_one(db)
        .await?;
        Ok(taken)
    }

    pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, password_hash, id_card_number, \
             serial_number, birth_date, gender, request_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.id_card_number)
        .bind(&new.serial_number)
        .bind(new.birth_date)
        .bind(&new.gender)
        .bind(&new.request_id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Applies the present fields and bumps `updated_at`; the request id is
    /// deliberately not touched here.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                email = COALESCE($4, email), \
                password_hash = COALESCE($5, password_hash), \
                id_card_number = COALESCE($6, id_card_number), \
                serial_number = COALESCE($7, serial_number), \
                birth_date = COALESCE($8, birth_date), \
                gender = COALESCE($9, gender), \
                is_verified = COALESCE($10, is_verified), \
                id_card_face = COALESCE($11, id_card_face), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(&changes.id_card_number)
        .bind(&changes.serial_number)
        .bind(changes.birth_date)
        .bind(&changes.gender)
        .bind(changes.is_verified)
        .bind(&changes.id_card_face)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Overwrites the request id (Some to issue/rotate, None to revoke).
    pub async fn set_request_id(
        db: &PgPool,
        id: Uuid,
        request_id: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET request_id = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(request_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
