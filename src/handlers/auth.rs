//! Signup, login, and current-user handlers.
//!
//! - POST /api/auth/signup - Register a customer
//! - POST /api/auth/login - Exchange phone + password for a session token
//! - GET /api/auth/me - Current user

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{AuthResponse, LoginRequest, SignupRequest, User, UserResponse},
    services::auth_service,
    state::AppState,
};

/// Register a new customer.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Budi",
///   "phone": "081234567890",
///   "password": "hunter22",
///   "email": "budi@example.com"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: `{token, user}`
/// - **400**: validation failure, or `phone_taken` when the phone is registered
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::signup(&state.pool, request).await?;
    let response = session_for(&state, user)?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with phone and password.
///
/// # Response
///
/// - **200 OK**: `{token, user}`
/// - **401**: unknown phone or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = auth_service::login(&state.pool, request).await?;

    Ok(Json(session_for(&state, user)?))
}

/// Current user profile.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(user.into()))
}

fn session_for(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token = auth_service::issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}
