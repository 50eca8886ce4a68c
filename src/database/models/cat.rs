use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use super::{require_text, Creator};
use crate::database::repository::{Projection, Resource, Validate};

#[derive(Debug, Clone, Serialize)]
pub struct Cat {
    pub id: Uuid,
    pub name: String,
    pub weight: Option<f64>,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub creator: Creator,
}

impl<'r> FromRow<'r, PgRow> for Cat {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            weight: row.try_get("weight")?,
            age: row.try_get("age")?,
            created_at: row.try_get("created_at")?,
            creator: Creator::from_row(row)?,
        })
    }
}

impl Projection for Cat {
    const SELECT: &'static str = concat!(
        "SELECT c.id, c.name, c.weight, c.age, c.created_at, ",
        "u.id AS creator_id, u.username AS creator_username, u.email AS creator_email, u.role AS creator_role ",
        "FROM cats c JOIN users u ON u.id = c.creator"
    );
    const ALIAS: &'static str = "c";
    const OWNER_COLUMN: Option<&'static str> = Some("creator");
}

#[derive(Debug, Deserialize)]
pub struct NewCat {
    pub name: String,
    pub weight: Option<f64>,
    pub age: Option<i32>,
    pub creator: Uuid,
}

impl Validate for NewCat {
    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        validate_measurements(self.weight, self.age)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CatChanges {
    pub name: Option<String>,
    pub weight: Option<f64>,
    pub age: Option<i32>,
}

impl Validate for CatChanges {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        validate_measurements(self.weight, self.age)
    }
}

fn validate_measurements(weight: Option<f64>, age: Option<i32>) -> Result<(), String> {
    if matches!(weight, Some(w) if !w.is_finite() || w < 0.0) {
        return Err("weight must be a non-negative number".to_string());
    }
    if matches!(age, Some(a) if a < 0) {
        return Err("age must not be negative".to_string());
    }
    Ok(())
}

#[async_trait]
impl Resource for Cat {
    const TABLE: &'static str = "cats";
    const KIND: &'static str = "cat";

    type New = NewCat;
    type Changes = CatChanges;

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(pool: &PgPool, new: NewCat) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO cats (id, name, weight, age, creator)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(new.name.trim())
        .bind(new.weight)
        .bind(new.age)
        .bind(new.creator)
        .execute(pool)
        .await?;
        Ok(id)
    }

    async fn update(pool: &PgPool, id: Uuid, changes: CatChanges) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cats SET
                name = COALESCE($2, name),
                weight = COALESCE($3, weight),
                age = COALESCE($4, age)
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.weight)
        .bind(changes.age)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_measurements_are_rejected() {
        let changes = CatChanges {
            weight: Some(-1.0),
            ..Default::default()
        };
        assert!(changes.validate().is_err());

        let changes = CatChanges {
            age: Some(-2),
            ..Default::default()
        };
        assert!(changes.validate().is_err());
    }

    #[test]
    fn blank_name_is_rejected() {
        let new = NewCat {
            name: " ".into(),
            weight: Some(4.2),
            age: Some(3),
            creator: Uuid::new_v4(),
        };
        assert_eq!(new.validate().unwrap_err(), "name must not be empty");
    }
}
