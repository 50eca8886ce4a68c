use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use super::{parse_column, require_text, Provider, Role};
use crate::database::repository::{Projection, Resource, Validate};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub provider: Provider,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let provider: String = row.try_get("provider")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: parse_column("role", &role)?,
            provider: parse_column("provider", &provider)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Projection for User {
    const SELECT: &'static str =
        "SELECT u.id, u.username, u.email, u.password_hash, u.role, u.provider, u.created_at FROM users u";
    const ALIAS: &'static str = "u";
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub provider: Provider,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), String> {
        require_text("username", &self.username)?;
        validate_email(&self.email)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl Validate for UserChanges {
    fn validate(&self) -> Result<(), String> {
        if let Some(username) = &self.username {
            require_text("username", username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), String> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(format!("'{}' is not a valid email address", email)),
    }
}

#[async_trait]
impl Resource for User {
    const TABLE: &'static str = "users";
    const KIND: &'static str = "user";

    type New = NewUser;
    type Changes = UserChanges;

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(pool: &PgPool, new: NewUser) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, provider)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(new.username.trim())
        .bind(new.email.trim().to_lowercase())
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .bind(new.provider.as_str())
        .execute(pool)
        .await?;
        Ok(id)
    }

    async fn update(pool: &PgPool, id: Uuid, changes: UserChanges) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role)
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.username.as_deref().map(str::trim))
        .bind(changes.email.map(|e| e.trim().to_lowercase()))
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("{} WHERE u.email = $1", User::SELECT);
    sqlx::query_as::<_, User>(&sql)
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("{} WHERE u.username = $1", User::SELECT);
    sqlx::query_as::<_, User>(&sql)
        .bind(username.trim())
        .fetch_optional(pool)
        .await
}

/// Direct role assignment for operator tooling; `false` when no such user
pub async fn set_role(pool: &PgPool, username: &str, role: Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = $2 WHERE username = $1")
        .bind(username.trim())
        .bind(role.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_user_defaults_to_local_user_role() {
        let new: NewUser = serde_json::from_value(json!({
            "username": "BobMcDonald",
            "email": "BobMcDonald@travellog.com",
            "password_hash": "$argon2id$..."
        }))
        .unwrap();

        assert_eq!(new.role, Role::User);
        assert_eq!(new.provider, Provider::Local);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn bad_email_is_rejected() {
        let changes = UserChanges {
            email: Some("bob.travellog.com".into()),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
        assert!(validate_email("@travellog.com").is_err());
        assert!(validate_email("bob@").is_err());
    }

    #[test]
    fn password_hash_never_serializes() {
        let user = User {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: "bob@travellog.com".into(),
            password_hash: Some("secret-hash".into()),
            role: Role::User,
            provider: Provider::Local,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], "user");
    }
}
