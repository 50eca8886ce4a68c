// /api/trips
//
// Every chain runs behind JWT + user validation; the tripId/poiId loaders
// come first so a missing document is a 404 before any permission check.

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;

use super::{count_scope, page_request, PageParams};
use crate::access::{trip_owner, CheckPermission, Permission, SetCreator};
use crate::controllers::poi::{RemoveTripPois, SetCreatorAndLocType};
use crate::controllers::trip::{AddPoi, OwnTrips, RemovePoi, TripPage};
use crate::controllers::{Count, Delete, Insert, Load, Show, Update};
use crate::database::models::{Poi, Trip};
use crate::error::ApiError;
use crate::middleware::ValidatedUser;
use crate::pipeline::{Pipeline, RequestContext};
use crate::state::AppState;

static CREATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("POST /trips")
        .stage(SetCreator)
        .stage(Insert::<Trip>::new())
        .stage(Show::<Trip>::new())
});

static LIST: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /trips").stage(TripPage::new()));

static MINE: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /trips/mine").stage(OwnTrips::new()));

static COUNT: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /trips/count").stage(Count::<Trip>::new()));

static ADD_POI: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("POST /trips/:tripId/addPOI")
        .stage(Load::<Trip>::new())
        .stage(CheckPermission(Permission::is_owner(trip_owner)))
        .stage(SetCreatorAndLocType)
        .stage(Insert::<Poi>::new())
        .stage(AddPoi)
        .stage(Show::<Trip>::new())
});

static UPDATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("PUT /trips/:tripId")
        .stage(Load::<Trip>::new())
        .stage(CheckPermission(Permission::is_owner(trip_owner)))
        .stage(SetCreator)
        .stage(Update::<Trip>::new())
        .stage(Show::<Trip>::new())
});

static SHOW: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /trips/:tripId")
        .stage(Load::<Trip>::new())
        .stage(Show::<Trip>::new())
});

static REMOVE_POI: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("DELETE /trips/:tripId/:poiId")
        .stage(Load::<Trip>::new())
        .stage(Load::<Poi>::new())
        .stage(CheckPermission(Permission::is_owner(trip_owner)))
        .stage(RemovePoi)
        .stage(Show::<Trip>::new())
});

static DELETE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("DELETE /trips/:tripId")
        .stage(Load::<Trip>::new())
        .stage(CheckPermission(Permission::is_admin_or_owner(trip_owner)))
        .stage(RemoveTripPois)
        .stage(Delete::<Trip>::new())
});

pub async fn trips_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_body(&body) {
        Ok(ctx) => CREATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn trips_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let page = page_request(query)?;
    Ok(LIST.run(&state, RequestContext::new(user).with_page(page)).await)
}

pub async fn trips_mine(State(state): State<AppState>, Extension(user): Extension<ValidatedUser>) -> Response {
    MINE.run(&state, RequestContext::new(user)).await
}

pub async fn trips_count(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let scope = count_scope(query, &user)?;
    Ok(COUNT.run(&state, RequestContext::new(user).with_scope(scope)).await)
}

pub async fn trip_add_poi(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(trip_id): Path<String>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_trip_id(trip_id).with_body(&body) {
        Ok(ctx) => ADD_POI.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn trip_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(trip_id): Path<String>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_trip_id(trip_id).with_body(&body) {
        Ok(ctx) => UPDATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn trip_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(trip_id): Path<String>,
) -> Response {
    SHOW.run(&state, RequestContext::new(user).with_trip_id(trip_id)).await
}

pub async fn trip_remove_poi(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path((trip_id, poi_id)): Path<(String, String)>,
) -> Response {
    let ctx = RequestContext::new(user).with_trip_id(trip_id).with_poi_id(poi_id);
    REMOVE_POI.run(&state, ctx).await
}

pub async fn trip_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(trip_id): Path<String>,
) -> Response {
    DELETE.run(&state, RequestContext::new(user).with_trip_id(trip_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_keep_route_order() {
        assert_eq!(CREATE.stage_names(), ["setCreator", "insert", "show"]);
        assert_eq!(
            ADD_POI.stage_names(),
            ["load", "checkPermission", "setCreatorAndLocType", "insert", "addPoi", "show"]
        );
        assert_eq!(UPDATE.stage_names(), ["load", "checkPermission", "setCreator", "update", "show"]);
        assert_eq!(REMOVE_POI.stage_names(), ["load", "load", "checkPermission", "removePoi", "show"]);
        assert_eq!(DELETE.stage_names(), ["load", "checkPermission", "removeTripPois", "delete"]);
        assert_eq!(LIST.stage_names(), ["paginate"]);
        assert_eq!(MINE.stage_names(), ["ownList"]);
    }
}
