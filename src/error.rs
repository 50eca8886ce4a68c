// HTTP API Error Types
use axum::{extract::rejection::QueryRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;

/// HTTP API error with appropriate status codes and client-facing messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden (sent without a body)
    Forbidden,

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error, message echoes the datastore failure
    Datastore(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Datastore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden => "Forbidden",
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::Datastore(msg) => msg,
        }
    }

    /// JSON body for the response, `None` for bare status responses
    pub fn to_json(&self) -> Option<Value> {
        match self {
            ApiError::Forbidden => None,
            _ => Some(json!({ "message": self.message() })),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn datastore(message: impl Into<String>) -> Self {
        ApiError::Datastore(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::Invalid(msg) => ApiError::bad_request(msg),
            other => {
                tracing::error!("Datastore failure: {}", other);
                ApiError::datastore(other.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<crate::auth::JwtError> for ApiError {
    fn from(err: crate::auth::JwtError) -> Self {
        match err {
            crate::auth::JwtError::InvalidToken(msg) => ApiError::unauthorized(msg),
            other => {
                tracing::error!("Token error: {}", other);
                ApiError::datastore(other.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code().as_u16(), self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        match self.to_json() {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_has_no_body() {
        let err = ApiError::Forbidden;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.to_json().is_none());
    }

    #[test]
    fn datastore_failure_echoes_message() {
        let err: ApiError = DatabaseError::QueryError("relation \"trips\" does not exist".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_json().unwrap();
        assert!(body["message"].as_str().unwrap().contains("relation \"trips\" does not exist"));
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = DatabaseError::NotFound("trip 1 not found".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_json().unwrap()["message"], "trip 1 not found");
    }

    #[test]
    fn conflict_maps_to_409() {
        let err: ApiError = DatabaseError::Conflict("username already taken".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    fn store_call() -> Result<u64, sqlx::Error> {
        Err(sqlx::Error::RowNotFound)
    }

    fn stage_like() -> Result<u64, ApiError> {
        Ok(store_call()?)
    }

    #[test]
    fn sqlx_errors_convert_with_question_mark() {
        let err = stage_like().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_row_maps_to_400() {
        let err: ApiError = DatabaseError::Invalid("end must not be before begin".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "end must not be before begin");
    }

    #[test]
    fn duplicate_query_key_is_json_400() {
        use axum::extract::Query;
        use crate::database::PageQuery;

        let uri: axum::http::Uri = "/api/trips?page=1&page=2".parse().unwrap();
        let rejection = Query::<PageQuery>::try_from_uri(&uri).unwrap_err();
        let err = ApiError::from(rejection);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_json().unwrap()["message"].as_str().unwrap().contains("duplicate field"));
    }
}
