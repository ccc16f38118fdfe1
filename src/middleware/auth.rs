//! Session guards for customer and admin routes.
//!
//! `auth_middleware` turns a bearer JWT into an [`AuthContext`] request
//! extension; `require_admin` is layered inside it on admin routes.

use crate::{
    error::AppError,
    models::user::{User, UserRole},
    services::auth_service,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The signed-in user, read by handlers through `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Verify `Authorization: Bearer <jwt>` and load the user it names.
///
/// The role comes from the `users` row rather than the token claims, so a
/// demoted admin loses access on the next request. Any failure is a 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    let claims = auth_service::decode_token(token, &state.config.jwt_secret)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %claims.sub, "token for unknown user");
            AppError::unauthorized("Invalid session")
        })?;

    request.extensions_mut().insert(AuthContext {
        user_id: user.id,
        name: user.name,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Admin guard; must run after [`auth_middleware`].
///
/// Returns 403 Forbidden for authenticated non-admin users.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    if !auth.is_admin() {
        tracing::warn!(user_id = %auth.user_id, "non-admin tried an admin route");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}
