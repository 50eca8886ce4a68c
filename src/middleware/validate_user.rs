use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::models::{Role, User};
use crate::database::Repository;
use crate::error::ApiError;
use crate::state::AppState;

/// The requester as currently stored, so role changes and deleted accounts
/// take effect without waiting for the token to expire
#[derive(Clone, Debug, Serialize)]
pub struct ValidatedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl ValidatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<User> for ValidatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Middleware that re-loads the JWT subject from the users table.
/// Must run after `jwt_auth_middleware`.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = Repository::<User>::new(state.pool.clone())
        .load(auth_user.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("User validation failed: user {} no longer exists", auth_user.user_id);
            ApiError::unauthorized("User no longer exists")
        })?;

    if user.role != auth_user.role {
        tracing::debug!(
            "Role for {} changed since token was issued ({} -> {})",
            user.username,
            auth_user.role,
            user.role
        );
    }

    let validated_user = ValidatedUser::from(user);
    tracing::debug!("User validation successful: {} ({})", validated_user.username, validated_user.role);

    request.extensions_mut().insert(validated_user);

    Ok(next.run(request).await)
}
