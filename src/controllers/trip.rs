// Trip operations beyond generic CRUD: POI membership and listing shapes.
//
// AddPoi and RemovePoi are chain-intermediate: they update the membership
// set in one atomic statement, re-load the trip the same way Load does and
// leave it in the trip slot for the stage that follows.

use async_trait::async_trait;
use uuid::Uuid;

use super::base::{ListOwned, Paginate};
use crate::database::models::{trip, Poi, Trip, TripSummary};
use crate::database::Repository;
use crate::error::ApiError;
use crate::pipeline::{Flow, RequestContext, Stage};
use crate::state::AppState;

/// Paginated trips without their `pois`
pub type TripPage = Paginate<Trip, TripSummary>;

/// The requester's trips without their `pois`
pub type OwnTrips = ListOwned<Trip, TripSummary>;

fn membership(ctx: &RequestContext) -> Result<(Uuid, Uuid), ApiError> {
    let trip = ctx.trip.as_ref().ok_or_else(|| ApiError::not_found("trip not found"))?;
    let poi: &Poi = ctx.poi.as_ref().ok_or_else(|| ApiError::not_found("poi not found"))?;
    Ok((trip.id, poi.id))
}

async fn reload(state: &AppState, ctx: &mut RequestContext, trip_id: Uuid) -> Result<Flow, ApiError> {
    let trip = Repository::<Trip>::new(state.pool.clone()).load_404(trip_id).await?;
    ctx.trip = Some(trip);
    Ok(Flow::Continue)
}

/// Set-add of the POI in the poi slot to the trip in the trip slot
pub struct AddPoi;

#[async_trait]
impl Stage for AddPoi {
    fn name(&self) -> &'static str {
        "addPoi"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let (trip_id, poi_id) = membership(ctx)?;
        if !trip::add_poi(&state.pool, trip_id, poi_id).await? {
            return Err(ApiError::not_found(format!("trip {} not found", trip_id)));
        }
        tracing::debug!("Attached poi {} to trip {}", poi_id, trip_id);
        reload(state, ctx, trip_id).await
    }
}

/// Exact-remove of the POI in the poi slot; absent ids are a no-op
pub struct RemovePoi;

#[async_trait]
impl Stage for RemovePoi {
    fn name(&self) -> &'static str {
        "removePoi"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let (trip_id, poi_id) = membership(ctx)?;
        if !trip::remove_poi(&state.pool, trip_id, poi_id).await? {
            return Err(ApiError::not_found(format!("trip {} not found", trip_id)));
        }
        tracing::debug!("Detached poi {} from trip {}", poi_id, trip_id);
        reload(state, ctx, trip_id).await
    }
}
