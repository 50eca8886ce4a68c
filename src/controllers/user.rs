use async_trait::async_trait;
use serde_json::Value;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::pipeline::{Flow, RequestContext, Stage};
use crate::state::AppState;

/// Replaces a plaintext `password` in the body with `password_hash`.
/// A client-supplied `password_hash` is always discarded.
pub struct HashPassword {
    pub required: bool,
}

#[async_trait]
impl Stage for HashPassword {
    fn name(&self) -> &'static str {
        "hashPassword"
    }

    async fn execute(&self, _state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        ctx.body.remove("password_hash");

        let password = match ctx.body.remove("password") {
            Some(Value::String(p)) if !p.is_empty() => p,
            Some(Value::String(_)) | None if !self.required => return Ok(Flow::Continue),
            Some(Value::String(_)) | None => return Err(ApiError::bad_request("password is required")),
            Some(_) => return Err(ApiError::bad_request("password must be a string")),
        };

        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ApiError::datastore(e.to_string()))?
            .map_err(|e| ApiError::datastore(e.to_string()))?;

        ctx.body.insert("password_hash".to_string(), Value::String(hash));
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config;
    use crate::database::DatabaseManager;
    use serde_json::json;

    fn state() -> AppState {
        AppState::new(DatabaseManager::connect_lazy(&config().database).unwrap())
    }

    fn ctx(body: Value) -> RequestContext {
        RequestContext::anonymous()
            .with_body(body.to_string().as_bytes())
            .unwrap()
    }

    #[tokio::test]
    async fn password_becomes_hash() {
        let mut ctx = ctx(json!({ "password": "verysecret", "password_hash": "forged" }));
        HashPassword { required: true }.execute(&state(), &mut ctx).await.unwrap();

        assert!(ctx.body.get("password").is_none());
        let hash = ctx.body["password_hash"].as_str().unwrap();
        assert_ne!(hash, "forged");
        assert!(crate::auth::verify_password(hash, "verysecret"));
    }

    #[tokio::test]
    async fn missing_password_only_matters_when_required() {
        let mut optional = ctx(json!({ "email": "bob@travellog.com", "password_hash": "forged" }));
        HashPassword { required: false }.execute(&state(), &mut optional).await.unwrap();
        assert!(optional.body.get("password_hash").is_none());

        let mut required = ctx(json!({ "email": "bob@travellog.com" }));
        let err = HashPassword { required: true }
            .execute(&state(), &mut required)
            .await
            .err()
            .unwrap();
        assert_eq!(err.message(), "password is required");
    }
}
