use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Issue a token for a user using the configured expiry
pub fn issue_token(user_id: Uuid, role: Role, security: &SecurityConfig) -> Result<String, JwtError> {
    generate_jwt(&Claims::new(user_id, role, security.jwt_expiry_hours), security)
}

/// Validate a bearer token's signature and expiry and return its claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(format!("Invalid JWT token: {}", e)))
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

#[tracing::instrument(name = "Hashing user password", skip(password))]
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// False for malformed hashes as well as mismatches
#[tracing::instrument(name = "Verifying user password", skip(hash, password))]
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        let mut security = AppConfig::from_env().security;
        security.jwt_secret = "unit-test-secret".to_string();
        security
    }

    #[test]
    fn token_round_trip_preserves_identity_and_role() {
        let security = security();
        let id = Uuid::new_v4();

        let token = issue_token(id, Role::Admin, &security).unwrap();
        let claims = validate_jwt(&token, &security).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let security = security();
        let mut other = security.clone();
        other.jwt_secret = "someone-else".to_string();

        let token = issue_token(Uuid::new_v4(), Role::User, &other).unwrap();
        assert!(matches!(validate_jwt(&token, &security), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = security();
        let mut claims = Claims::new(Uuid::new_v4(), Role::User, 1);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;

        let token = generate_jwt(&claims, &security).unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = security();
        security.jwt_secret.clear();
        assert!(matches!(
            issue_token(Uuid::new_v4(), Role::User, &security),
            Err(JwtError::InvalidSecret)
        ));
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("verysecret").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "verysecret"));
        assert!(!verify_password(&hash, "verysecreta"));
        assert!(!verify_password("not-a-hash", "verysecret"));
    }

    #[test]
    fn each_hash_gets_a_fresh_salt() {
        let first = hash_password("verysecret").unwrap();
        let second = hash_password("verysecret").unwrap();

        assert_ne!(first, second);
        let salt = |hash: &str| PasswordHash::new(hash).unwrap().salt.unwrap().to_string();
        assert_ne!(salt(&first), salt(&second));
        assert!(verify_password(&second, "verysecret"));
    }
}
