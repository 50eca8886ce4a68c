// POST /api/users/register and POST /api/users/login

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::access::ProtectRole;
use crate::auth::{issue_token, verify_password};
use crate::config::config;
use crate::controllers::user::HashPassword;
use crate::controllers::{Insert, Show};
use crate::database::models::{user, Provider, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pipeline::{Pipeline, RequestContext};
use crate::state::AppState;

static REGISTER: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("POST /users/register")
        .stage(ProtectRole)
        .stage(HashPassword { required: true })
        .stage(Insert::<User>::new())
        .stage(Show::<User>::new())
});

/// Anonymous requests are never admin, so `role` is always dropped
pub async fn register(State(state): State<AppState>, body: Bytes) -> Response {
    match RequestContext::anonymous().with_body(&body) {
        Ok(ctx) => REGISTER.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

const BAD_CREDENTIALS: &str = "Invalid email or password";

pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<LoginResponse> {
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid login request: {}", e)))?;

    let found = user::find_by_email(&state.pool, &request.email)
        .await
        .map_err(crate::database::DatabaseError::from)?;

    let Some(account) = found else {
        tracing::warn!("Login failed: no account for {}", request.email);
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    let hash = match (&account.provider, &account.password_hash) {
        (Provider::Local, Some(hash)) => hash.clone(),
        _ => {
            tracing::warn!("Login failed: {} has no local password", account.username);
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };

    let password = request.password;
    let verified = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| ApiError::datastore(e.to_string()))?;

    if !verified {
        tracing::warn!("Login failed: wrong password for {}", account.username);
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let token = issue_token(account.id, account.role, &config().security)?;
    tracing::info!("User {} logged in", account.username);

    Ok(ApiResponse::success(LoginResponse { token, user: account }))
}
