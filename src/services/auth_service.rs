//! Auth service - signup, login, password hashing and session tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{LoginRequest, SignupRequest, User, UserRole},
    validation,
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// JWT claims carried by session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Sign an HS256 session token for `user`, valid for `ttl_hours`.
pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
}

/// Verify signature and expiry of a session token.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("rejected session token: {}", e);
        AppError::unauthorized("Invalid or expired session")
    })
}

/// Validated signup input.
#[derive(Debug, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Validate a signup request and normalize its phone number.
pub fn validate_signup(request: &SignupRequest) -> Result<NewUser, AppError> {
    let name = validation::required_text("name", &request.name, 120)?;
    let phone = validation::validate_phone(&request.phone)?;
    let email = validation::optional_email(request.email.as_deref())?;

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(NewUser { name, phone, email })
}

/// Register a new customer.
///
/// # Errors
///
/// - `InvalidRequest`: a field failed validation
/// - `PhoneTaken`: the normalized phone is already registered
pub async fn signup(pool: &DbPool, request: SignupRequest) -> Result<User, AppError> {
    let new_user = validate_signup(&request)?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1)")
        .bind(&new_user.phone)
        .fetch_one(pool)
        .await?;
    if exists {
        return Err(AppError::PhoneTaken);
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?;

    // The unique index still guards against a concurrent signup racing past
    // the EXISTS check.
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, phone, email, password_hash)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (phone) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&new_user.name)
    .bind(&new_user.phone)
    .bind(&new_user.email)
    .bind(&password_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::PhoneTaken)?;

    tracing::info!(user_id = %user.id, "user signed up");
    Ok(user)
}

/// Check phone and password.
///
/// Unknown phones and wrong passwords produce the same 401.
pub async fn login(pool: &DbPool, request: LoginRequest) -> Result<User, AppError> {
    let phone = validation::normalize_phone(&request.phone);
    let invalid = || AppError::unauthorized("Phone number or password is incorrect");

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
        .bind(&phone)
        .fetch_optional(pool)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(request.password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .unwrap_or(false);

    if !matches {
        tracing::info!(user_id = %user.id, "failed login");
        return Err(invalid());
    }

    Ok(user)
}
