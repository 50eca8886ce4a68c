use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::page::PageRequest;

/// A row shape that can be selected from the store.
///
/// `SELECT` is the full `SELECT ... FROM ...` clause (joins included) without
/// any `WHERE`/`ORDER BY`; the repository appends those. Every projection
/// selects from a table aliased `ALIAS` that carries `id` and `created_at`.
pub trait Projection: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin {
    const SELECT: &'static str;
    const ALIAS: &'static str;
    /// Column holding the owning user's id, if the table has one
    const OWNER_COLUMN: Option<&'static str> = None;
}

/// Checks on client-supplied payloads that serde alone cannot express
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A stored document kind with create and partial-update support
#[async_trait]
pub trait Resource: Projection + Clone + Sync {
    /// Table / collection name
    const TABLE: &'static str;
    /// Singular name used in messages
    const KIND: &'static str;

    type New: DeserializeOwned + Validate + Send;
    type Changes: DeserializeOwned + Validate + Send;

    fn id(&self) -> Uuid;

    /// Checks that need the stored document, run against the state the
    /// update would produce
    fn check_changes(&self, _changes: &Self::Changes) -> Result<(), String> {
        Ok(())
    }

    /// Insert and return the new id
    async fn insert(pool: &PgPool, new: Self::New) -> Result<Uuid, sqlx::Error>;

    /// Apply the provided fields; `false` when no row has this id
    async fn update(pool: &PgPool, id: Uuid, changes: Self::Changes) -> Result<bool, sqlx::Error>;
}

/// Which documents a count covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    OwnedBy(Uuid),
}

/// Generic CRUD access for one resource kind
pub struct Repository<R> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<R>,
}

impl<R: Resource> Repository<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn load(&self, id: Uuid) -> Result<Option<R>, DatabaseError> {
        let sql = format!("{} WHERE {}.id = $1", R::SELECT, R::ALIAS);
        let row = sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn load_404(&self, id: Uuid) -> Result<R, DatabaseError> {
        self.load(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", R::KIND, id)))
    }

    /// Insert and return the stored document, populated like a regular load
    pub async fn insert(&self, new: R::New) -> Result<R, DatabaseError> {
        let id = R::insert(&self.pool, new).await?;
        tracing::debug!("Inserted {} {}", R::KIND, id);
        self.load_404(id).await
    }

    /// Apply a partial update and return the post-update document
    pub async fn update(&self, id: Uuid, changes: R::Changes) -> Result<R, DatabaseError> {
        if !R::update(&self.pool, id, changes).await? {
            return Err(DatabaseError::NotFound(format!("{} {} not found", R::KIND, id)));
        }
        self.load_404(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", R::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {} not found", R::KIND, id)));
        }
        tracing::debug!("Deleted {} {}", R::KIND, id);
        Ok(())
    }

    /// Count documents; an owner scope is ignored for kinds without an owner
    pub async fn count(&self, scope: Scope) -> Result<i64, DatabaseError> {
        let count = match (scope, R::OWNER_COLUMN) {
            (Scope::OwnedBy(owner), Some(column)) => {
                let sql = format!("SELECT COUNT(*) FROM \"{}\" WHERE {} = $1", R::TABLE, column);
                sqlx::query_scalar::<_, i64>(&sql)
                    .bind(owner)
                    .fetch_one(&self.pool)
                    .await?
            }
            _ => {
                let sql = format!("SELECT COUNT(*) FROM \"{}\"", R::TABLE);
                sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?
            }
        };
        Ok(count)
    }

    /// One page of documents in insertion order, shaped as `P`
    pub async fn page<P: Projection>(&self, page: PageRequest) -> Result<Vec<P>, DatabaseError> {
        let sql = format!(
            "{} ORDER BY {alias}.created_at, {alias}.id LIMIT $1 OFFSET $2",
            P::SELECT,
            alias = P::ALIAS
        );
        let rows = sqlx::query_as::<_, P>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Every document created by `owner`, shaped as `P`
    pub async fn list_owned<P: Projection>(&self, owner: Uuid) -> Result<Vec<P>, DatabaseError> {
        let column = P::OWNER_COLUMN.ok_or_else(|| {
            DatabaseError::QueryError(format!("{} has no owner column", R::TABLE))
        })?;
        let sql = format!(
            "{} WHERE {alias}.{column} = $1 ORDER BY {alias}.created_at, {alias}.id",
            P::SELECT,
            alias = P::ALIAS,
            column = column
        );
        let rows = sqlx::query_as::<_, P>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
