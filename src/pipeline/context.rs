use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::models::{Cat, Poi, Trip, User};
use crate::database::{PageRequest, Resource, Scope};
use crate::error::ApiError;
use crate::middleware::ValidatedUser;

/// Raw path parameters; loaders parse them so a malformed id reads as
/// "not found" instead of a routing error
#[derive(Debug, Default, Clone)]
pub struct PathParams {
    pub trip_id: Option<String>,
    pub poi_id: Option<String>,
    pub user_id: Option<String>,
    pub cat_id: Option<String>,
}

/// Per-request state that flows through a pipeline. Each resource kind a
/// chain may load has its own typed slot.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub requester: Option<ValidatedUser>,
    pub params: PathParams,
    pub page: PageRequest,
    pub scope: Scope,
    pub body: Map<String, Value>,

    pub trip: Option<Trip>,
    pub poi: Option<Poi>,
    pub user: Option<User>,
    pub cat: Option<Cat>,
}

impl RequestContext {
    pub fn new(requester: ValidatedUser) -> Self {
        Self {
            requester: Some(requester),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_trip_id(mut self, id: String) -> Self {
        self.params.trip_id = Some(id);
        self
    }

    pub fn with_poi_id(mut self, id: String) -> Self {
        self.params.poi_id = Some(id);
        self
    }

    pub fn with_user_id(mut self, id: String) -> Self {
        self.params.user_id = Some(id);
        self
    }

    pub fn with_cat_id(mut self, id: String) -> Self {
        self.params.cat_id = Some(id);
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Attach a mutation body. An empty body is an empty object; anything
    /// that is not a JSON object is rejected.
    pub fn with_body(mut self, raw: &[u8]) -> Result<Self, ApiError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(self);
        }
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(map)) => {
                self.body = map;
                Ok(self)
            }
            Ok(_) => Err(ApiError::bad_request("request body must be a JSON object")),
            Err(e) => Err(ApiError::bad_request(format!("malformed JSON body: {}", e))),
        }
    }

    pub fn requester(&self) -> Result<&ValidatedUser, ApiError> {
        self.requester
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }

    pub fn is_admin(&self) -> bool {
        self.requester.as_ref().is_some_and(ValidatedUser::is_admin)
    }
}

/// Binds a resource kind to its path parameter and context slot
pub trait Loaded: Resource {
    fn param(params: &PathParams) -> Option<&str>;
    fn slot(ctx: &RequestContext) -> Option<&Self>;
    fn slot_mut(ctx: &mut RequestContext) -> &mut Option<Self>;
}

impl Loaded for Trip {
    fn param(params: &PathParams) -> Option<&str> {
        params.trip_id.as_deref()
    }

    fn slot(ctx: &RequestContext) -> Option<&Self> {
        ctx.trip.as_ref()
    }

    fn slot_mut(ctx: &mut RequestContext) -> &mut Option<Self> {
        &mut ctx.trip
    }
}

impl Loaded for Poi {
    fn param(params: &PathParams) -> Option<&str> {
        params.poi_id.as_deref()
    }

    fn slot(ctx: &RequestContext) -> Option<&Self> {
        ctx.poi.as_ref()
    }

    fn slot_mut(ctx: &mut RequestContext) -> &mut Option<Self> {
        &mut ctx.poi
    }
}

impl Loaded for User {
    fn param(params: &PathParams) -> Option<&str> {
        params.user_id.as_deref()
    }

    fn slot(ctx: &RequestContext) -> Option<&Self> {
        ctx.user.as_ref()
    }

    fn slot_mut(ctx: &mut RequestContext) -> &mut Option<Self> {
        &mut ctx.user
    }
}

impl Loaded for Cat {
    fn param(params: &PathParams) -> Option<&str> {
        params.cat_id.as_deref()
    }

    fn slot(ctx: &RequestContext) -> Option<&Self> {
        ctx.cat.as_ref()
    }

    fn slot_mut(ctx: &mut RequestContext) -> &mut Option<Self> {
        &mut ctx.cat
    }
}

/// Resolve a raw id, treating anything unparsable as a missing document
pub fn parse_id<R: Resource>(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::not_found(format!("{} {} not found", R::KIND, raw)))
}
