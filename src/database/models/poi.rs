use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use super::{require_text, Creator};
use crate::database::repository::{Projection, Resource, Validate};

pub const POINT: &str = "Point";

/// GeoJSON point, `[lng, lat]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

fn point_type() -> String {
    POINT.to_string()
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            kind: point_type(),
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.kind != POINT {
            return Err(format!("loc.type must be '{}', got '{}'", POINT, self.kind));
        }
        let (lng, lat) = (self.lng(), self.lat());
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("longitude {} is out of range", lng));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {} is out of range", lat));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Poi {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub loc: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub creator: Creator,
}

impl<'r> FromRow<'r, PgRow> for Poi {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            loc: GeoPoint::new(row.try_get("lng")?, row.try_get("lat")?),
            created_at: row.try_get("created_at")?,
            creator: Creator::from_row(row)?,
        })
    }
}

impl Projection for Poi {
    const SELECT: &'static str = concat!(
        "SELECT p.id, p.name, p.description, p.lng, p.lat, p.created_at, ",
        "u.id AS creator_id, u.username AS creator_username, u.email AS creator_email, u.role AS creator_role ",
        "FROM pois p JOIN users u ON u.id = p.creator"
    );
    const ALIAS: &'static str = "p";
    const OWNER_COLUMN: Option<&'static str> = Some("creator");
}

#[derive(Debug, Deserialize)]
pub struct NewPoi {
    pub name: String,
    pub description: Option<String>,
    pub loc: GeoPoint,
    pub creator: Uuid,
}

impl Validate for NewPoi {
    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        self.loc.validate()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PoiChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub loc: Option<GeoPoint>,
}

impl Validate for PoiChanges {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        match &self.loc {
            Some(loc) => loc.validate(),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Resource for Poi {
    const TABLE: &'static str = "pois";
    const KIND: &'static str = "poi";

    type New = NewPoi;
    type Changes = PoiChanges;

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(pool: &PgPool, new: NewPoi) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO pois (id, name, description, lng, lat, creator)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(new.name.trim())
        .bind(new.description)
        .bind(new.loc.lng())
        .bind(new.loc.lat())
        .bind(new.creator)
        .execute(pool)
        .await?;
        Ok(id)
    }

    async fn update(pool: &PgPool, id: Uuid, changes: PoiChanges) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pois SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                lng = COALESCE($5, lng),
                lat = COALESCE($6, lat)
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.description.is_some())
        .bind(changes.description.flatten())
        .bind(changes.loc.as_ref().map(GeoPoint::lng))
        .bind(changes.loc.as_ref().map(GeoPoint::lat))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Delete every listed POI; returns how many rows went away
pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM pois WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
