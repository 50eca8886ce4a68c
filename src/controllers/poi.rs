use async_trait::async_trait;
use serde_json::Value;

use crate::access::set_creator;
use crate::database::models::{poi, trip};
use crate::error::ApiError;
use crate::pipeline::{Flow, RequestContext, Stage};
use crate::state::AppState;

/// Forces `creator` to the requester and `loc.type` to `Point`
pub struct SetCreatorAndLocType;

#[async_trait]
impl Stage for SetCreatorAndLocType {
    fn name(&self) -> &'static str {
        "setCreatorAndLocType"
    }

    async fn execute(&self, _state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let id = ctx.requester()?.id;
        set_creator(&mut ctx.body, id);
        force_point_type(&mut ctx.body);
        Ok(Flow::Continue)
    }
}

fn force_point_type(body: &mut serde_json::Map<String, Value>) {
    if let Some(Value::Object(loc)) = body.get_mut("loc") {
        loc.insert("type".to_string(), Value::String(poi::POINT.to_string()));
    }
}

/// Deletes every POI of the trip in the trip slot, ahead of the trip itself
pub struct RemoveTripPois;

#[async_trait]
impl Stage for RemoveTripPois {
    fn name(&self) -> &'static str {
        "removeTripPois"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let trip = ctx.trip.as_ref().ok_or_else(|| ApiError::not_found("trip not found"))?;
        let removed = poi::delete_many(&state.pool, &trip.pois).await?;
        tracing::debug!("Removed {} pois of trip {}", removed, trip.id);
        Ok(Flow::Continue)
    }
}

/// Drops the POI in the poi slot from every trip that references it
pub struct DetachFromTrips;

#[async_trait]
impl Stage for DetachFromTrips {
    fn name(&self) -> &'static str {
        "detachFromTrips"
    }

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let poi = ctx.poi.as_ref().ok_or_else(|| ApiError::not_found("poi not found"))?;
        let touched = trip::detach_poi_everywhere(&state.pool, poi.id).await?;
        tracing::debug!("Detached poi {} from {} trips", poi.id, touched);
        Ok(Flow::Continue)
    }
}
