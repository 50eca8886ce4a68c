use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use super::{require_text, Creator};
use crate::database::repository::{Projection, Resource, Validate};

/// A trip with its creator populated and its POI references
#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub creator: Creator,
    pub pois: Vec<Uuid>,
}

/// Listing shape: everything but `pois`
#[derive(Debug, Clone, Serialize)]
pub struct TripSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub creator: Creator,
}

impl<'r> FromRow<'r, PgRow> for Trip {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            begin: row.try_get("begin_at")?,
            end: row.try_get("end_at")?,
            created_at: row.try_get("created_at")?,
            creator: Creator::from_row(row)?,
            pois: row.try_get("pois")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for TripSummary {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            begin: row.try_get("begin_at")?,
            end: row.try_get("end_at")?,
            created_at: row.try_get("created_at")?,
            creator: Creator::from_row(row)?,
        })
    }
}

impl Projection for Trip {
    const SELECT: &'static str = concat!(
        "SELECT t.id, t.name, t.description, t.begin_at, t.end_at, t.created_at, t.pois, ",
        "u.id AS creator_id, u.username AS creator_username, u.email AS creator_email, u.role AS creator_role ",
        "FROM trips t JOIN users u ON u.id = t.creator"
    );
    const ALIAS: &'static str = "t";
    const OWNER_COLUMN: Option<&'static str> = Some("creator");
}

impl Projection for TripSummary {
    const SELECT: &'static str = concat!(
        "SELECT t.id, t.name, t.description, t.begin_at, t.end_at, t.created_at, ",
        "u.id AS creator_id, u.username AS creator_username, u.email AS creator_email, u.role AS creator_role ",
        "FROM trips t JOIN users u ON u.id = t.creator"
    );
    const ALIAS: &'static str = "t";
    const OWNER_COLUMN: Option<&'static str> = Some("creator");
}

#[derive(Debug, Deserialize)]
pub struct NewTrip {
    pub name: String,
    pub description: Option<String>,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub creator: Uuid,
}

impl Validate for NewTrip {
    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        validate_dates(self.begin, self.end)
    }
}

/// Mutable trip fields; `creator` and `pois` are deliberately absent
#[derive(Debug, Default, Deserialize)]
pub struct TripChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Validate for TripChanges {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        validate_dates(self.begin, self.end)
    }
}

fn validate_dates(begin: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), String> {
    match (begin, end) {
        (Some(begin), Some(end)) if end < begin => Err("end must not be before begin".to_string()),
        _ => Ok(()),
    }
}

#[async_trait]
impl Resource for Trip {
    const TABLE: &'static str = "trips";
    const KIND: &'static str = "trip";

    type New = NewTrip;
    type Changes = TripChanges;

    fn id(&self) -> Uuid {
        self.id
    }

    fn check_changes(&self, changes: &TripChanges) -> Result<(), String> {
        validate_dates(changes.begin.or(self.begin), changes.end.or(self.end))
    }

    async fn insert(pool: &PgPool, new: NewTrip) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO trips (id, name, description, begin_at, end_at, creator)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(new.name.trim())
        .bind(new.description)
        .bind(new.begin)
        .bind(new.end)
        .bind(new.creator)
        .execute(pool)
        .await?;
        Ok(id)
    }

    async fn update(pool: &PgPool, id: Uuid, changes: TripChanges) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE trips SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                begin_at = COALESCE($5, begin_at),
                end_at = COALESCE($6, end_at)
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.description.is_some())
        .bind(changes.description.flatten())
        .bind(changes.begin)
        .bind(changes.end)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Set-add of a POI reference, evaluated against the current row inside the
/// single UPDATE so concurrent adds cannot duplicate it. `false` when the
/// trip does not exist.
pub async fn add_poi(pool: &PgPool, trip_id: Uuid, poi_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE trips
         SET pois = CASE WHEN $2 = ANY(pois) THEN pois ELSE array_append(pois, $2) END
         WHERE id = $1",
    )
    .bind(trip_id)
    .bind(poi_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes every occurrence of the POI reference. `false` when the trip
/// does not exist.
pub async fn remove_poi(pool: &PgPool, trip_id: Uuid, poi_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE trips SET pois = array_remove(pois, $2) WHERE id = $1")
        .bind(trip_id)
        .bind(poi_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop a POI reference from every trip holding it; returns trips touched
pub async fn detach_poi_everywhere(pool: &PgPool, poi_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE trips SET pois = array_remove(pois, $1) WHERE $1 = ANY(pois)")
        .bind(poi_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn new_trip_requires_creator_in_payload() {
        let result = serde_json::from_value::<NewTrip>(json!({ "name": "Tahiti" }));
        assert!(result.is_err());
    }

    #[test]
    fn end_before_begin_is_rejected() {
        let trip = NewTrip {
            name: "Tahiti".into(),
            description: None,
            begin: Some(Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            creator: Uuid::new_v4(),
        };
        assert_eq!(trip.validate().unwrap_err(), "end must not be before begin");
    }

    #[test]
    fn changes_ignore_creator_and_pois() {
        let changes: TripChanges = serde_json::from_value(json!({
            "name": "Bora Bora",
            "creator": Uuid::new_v4(),
            "pois": [Uuid::new_v4()]
        }))
        .unwrap();

        assert_eq!(changes.name.as_deref(), Some("Bora Bora"));
        assert!(changes.validate().is_ok());
    }

    #[test]
    fn summary_projection_never_selects_pois() {
        assert!(!TripSummary::SELECT.contains("pois"));
        assert!(Trip::SELECT.contains("t.pois"));
    }

    fn stored(begin: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            name: "Tahiti".into(),
            description: Some("Lagoons".into()),
            begin,
            end,
            created_at: Utc::now(),
            creator: crate::database::models::Creator {
                id: Uuid::new_v4(),
                username: "bob".into(),
                email: "bob@travellog.com".into(),
                role: crate::database::models::Role::User,
            },
            pois: Vec::new(),
        }
    }

    #[test]
    fn partial_date_change_is_checked_against_stored_dates() {
        let may = |day| Some(Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap());
        let trip = stored(may(10), may(20));

        let early_end = TripChanges { end: may(1), ..Default::default() };
        assert!(early_end.validate().is_ok());
        assert_eq!(trip.check_changes(&early_end).unwrap_err(), "end must not be before begin");

        let late_begin = TripChanges { begin: may(25), ..Default::default() };
        assert!(trip.check_changes(&late_begin).is_err());

        let both = TripChanges { begin: may(1), end: may(5), ..Default::default() };
        assert!(trip.check_changes(&both).is_ok());

        assert!(stored(None, None).check_changes(&early_end).is_ok());
    }

    #[test]
    fn explicit_null_description_clears() {
        let cleared: TripChanges = serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(cleared.description, Some(None));

        let untouched: TripChanges = serde_json::from_value(json!({ "name": "Moorea" })).unwrap();
        assert_eq!(untouched.description, None);
    }
}
