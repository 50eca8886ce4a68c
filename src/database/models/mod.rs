pub mod cat;
pub mod poi;
pub mod trip;
pub mod user;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{postgres::PgRow, Row};
use uuid::Uuid;

pub use cat::{Cat, CatChanges, NewCat};
pub use poi::{GeoPoint, NewPoi, Poi, PoiChanges};
pub use trip::{NewTrip, Trip, TripChanges, TripSummary};
pub use user::{NewUser, User, UserChanges};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the account's credentials live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Local,
    Remote,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Remote => "remote",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Provider::Local),
            "remote" => Ok(Provider::Remote),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// The owning user, populated on every resource that has a `creator`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl Creator {
    /// Reads the `creator_*` columns a resource query selects when it joins
    /// `users u` on its owner column
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("creator_role")?;
        Ok(Self {
            id: row.try_get("creator_id")?,
            username: row.try_get("creator_username")?,
            email: row.try_get("creator_email")?,
            role: parse_column("creator_role", &role)?,
        })
    }
}

/// Decode a text column into an enum
pub(crate) fn parse_column<T>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

/// Shared rule for required text fields
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(())
}

/// Keeps an explicit `null` apart from a missing key: `Some(None)` clears
/// the column, `None` leaves it alone
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_and_serializes_lowercase() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    }

    #[test]
    fn provider_defaults_to_local() {
        assert_eq!(Provider::default(), Provider::Local);
        assert_eq!("remote".parse::<Provider>().unwrap(), Provider::Remote);
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text("name", "  ").is_err());
        assert!(require_text("name", "Tahiti").is_ok());
    }
}
