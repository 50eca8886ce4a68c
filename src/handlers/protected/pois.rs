// /api/pois

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;

use super::{count_scope, page_request, PageParams};
use crate::access::{poi_owner, CheckPermission, Permission};
use crate::controllers::poi::{DetachFromTrips, SetCreatorAndLocType};
use crate::controllers::{Count, Delete, Insert, ListOwned, Load, Paginate, Show, Update};
use crate::database::models::Poi;
use crate::error::ApiError;
use crate::middleware::ValidatedUser;
use crate::pipeline::{Pipeline, RequestContext};
use crate::state::AppState;

static LIST: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /pois").stage(Paginate::<Poi>::new()));

static COUNT: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /pois/count").stage(Count::<Poi>::new()));

static MINE: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /pois/mine").stage(ListOwned::<Poi>::new()));

static CREATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("POST /pois")
        .stage(SetCreatorAndLocType)
        .stage(Insert::<Poi>::new())
        .stage(Show::<Poi>::new())
});

static SHOW: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /pois/:poiId")
        .stage(Load::<Poi>::new())
        .stage(Show::<Poi>::new())
});

static UPDATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("PUT /pois/:poiId")
        .stage(Load::<Poi>::new())
        .stage(CheckPermission(Permission::is_owner(poi_owner)))
        .stage(SetCreatorAndLocType)
        .stage(Update::<Poi>::new())
        .stage(Show::<Poi>::new())
});

static DELETE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("DELETE /pois/:poiId")
        .stage(Load::<Poi>::new())
        .stage(CheckPermission(Permission::is_admin_or_owner(poi_owner)))
        .stage(DetachFromTrips)
        .stage(Delete::<Poi>::new())
});

pub async fn pois_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let page = page_request(query)?;
    Ok(LIST.run(&state, RequestContext::new(user).with_page(page)).await)
}

pub async fn pois_count(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let scope = count_scope(query, &user)?;
    Ok(COUNT.run(&state, RequestContext::new(user).with_scope(scope)).await)
}

pub async fn pois_mine(State(state): State<AppState>, Extension(user): Extension<ValidatedUser>) -> Response {
    MINE.run(&state, RequestContext::new(user)).await
}

pub async fn pois_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_body(&body) {
        Ok(ctx) => CREATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn poi_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(poi_id): Path<String>,
) -> Response {
    SHOW.run(&state, RequestContext::new(user).with_poi_id(poi_id)).await
}

pub async fn poi_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(poi_id): Path<String>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_poi_id(poi_id).with_body(&body) {
        Ok(ctx) => UPDATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn poi_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(poi_id): Path<String>,
) -> Response {
    DELETE.run(&state, RequestContext::new(user).with_poi_id(poi_id)).await
}
