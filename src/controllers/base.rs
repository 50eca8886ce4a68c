// Generic CRUD stages shared by every resource kind

use std::marker::PhantomData;

use async_trait::async_trait;
use axum::{http::StatusCode, response::IntoResponse};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::database::repository::Validate;
use crate::database::{Projection, Repository, Resource};
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::pipeline::context::parse_id;
use crate::pipeline::{Flow, Loaded, RequestContext, Stage};
use crate::state::AppState;

/// Decode the request body into a typed payload and run its checks
pub fn decode<T: DeserializeOwned + Validate>(kind: &str, body: &Map<String, Value>) -> Result<T, ApiError> {
    let payload: T = serde_json::from_value(Value::Object(body.clone()))
        .map_err(|e| ApiError::bad_request(format!("invalid {}: {}", kind, e)))?;
    payload.validate().map_err(ApiError::bad_request)?;
    Ok(payload)
}

fn loaded<R: Loaded>(ctx: &RequestContext) -> Result<&R, ApiError> {
    R::slot(ctx).ok_or_else(|| ApiError::not_found(format!("{} not found", R::KIND)))
}

/// Resolve the kind's path parameter into its context slot; 404 when absent
pub struct Load<R>(PhantomData<fn() -> R>);

impl<R> Load<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Loaded> Stage for Load<R> {
    fn name(&self) -> &'static str {
        "load"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let raw = R::param(&ctx.params)
            .ok_or_else(|| ApiError::not_found(format!("{} id missing", R::KIND)))?;
        let id = parse_id::<R>(raw)?;

        let found = Repository::<R>::new(state.pool.clone()).load_404(id).await?;
        *R::slot_mut(ctx) = Some(found);
        Ok(Flow::Continue)
    }
}

/// Create from the body and leave the stored document in the slot
pub struct Insert<R>(PhantomData<fn() -> R>);

impl<R> Insert<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Loaded> Stage for Insert<R> {
    fn name(&self) -> &'static str {
        "insert"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let new: R::New = decode(R::KIND, &ctx.body)?;
        let stored = Repository::<R>::new(state.pool.clone()).insert(new).await?;
        tracing::info!("Created {} {}", R::KIND, stored.id());
        *R::slot_mut(ctx) = Some(stored);
        Ok(Flow::Continue)
    }
}

/// Partial update of the loaded document; the slot ends up holding the
/// post-update state
pub struct Update<R>(PhantomData<fn() -> R>);

impl<R> Update<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Loaded> Stage for Update<R> {
    fn name(&self) -> &'static str {
        "update"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let current = loaded::<R>(ctx)?;
        let id = current.id();
        let changes: R::Changes = decode(R::KIND, &ctx.body)?;
        current.check_changes(&changes).map_err(ApiError::bad_request)?;
        let updated = Repository::<R>::new(state.pool.clone()).update(id, changes).await?;
        *R::slot_mut(ctx) = Some(updated);
        Ok(Flow::Continue)
    }
}

/// Respond with whatever the chain left in the slot
pub struct Show<R>(PhantomData<fn() -> R>);

impl<R> Show<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Loaded> Stage for Show<R> {
    fn name(&self) -> &'static str {
        "show"
    }

    async fn execute(&self, _state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let doc = loaded::<R>(ctx)?;
        Ok(Flow::Respond(ApiResponse::success(doc).into_response()))
    }
}

pub struct Delete<R>(PhantomData<fn() -> R>);

impl<R> Delete<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Loaded> Stage for Delete<R> {
    fn name(&self) -> &'static str {
        "delete"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let id = loaded::<R>(ctx)?.id();
        Repository::<R>::new(state.pool.clone()).delete(id).await?;
        tracing::info!("Deleted {} {}", R::KIND, id);
        *R::slot_mut(ctx) = None;
        Ok(Flow::Respond(ApiResponse::empty(StatusCode::OK).into_response()))
    }
}

/// Respond with the number of documents in the context's scope
pub struct Count<R>(PhantomData<fn() -> R>);

impl<R> Count<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Resource> Stage for Count<R> {
    fn name(&self) -> &'static str {
        "count"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let count = Repository::<R>::new(state.pool.clone()).count(ctx.scope).await?;
        Ok(Flow::Respond(ApiResponse::success(count).into_response()))
    }
}

/// One page of `R`, shaped as `P`
pub struct Paginate<R, P = R>(PhantomData<fn() -> (R, P)>);

impl<R, P> Paginate<R, P> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Resource, P: Projection + 'static> Stage for Paginate<R, P> {
    fn name(&self) -> &'static str {
        "paginate"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let items = Repository::<R>::new(state.pool.clone()).page::<P>(ctx.page).await?;
        Ok(Flow::Respond(ApiResponse::success(items).into_response()))
    }
}

/// Every `R` the requester created, shaped as `P`
pub struct ListOwned<R, P = R>(PhantomData<fn() -> (R, P)>);

impl<R, P> ListOwned<R, P> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: Resource, P: Projection + 'static> Stage for ListOwned<R, P> {
    fn name(&self) -> &'static str {
        "ownList"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let owner = ctx.requester()?.id;
        let items = Repository::<R>::new(state.pool.clone()).list_owned::<P>(owner).await?;
        Ok(Flow::Respond(ApiResponse::success(items).into_response()))
    }
}
