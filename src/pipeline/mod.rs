// Ordered request pipeline: each route is a fixed list of stages that read
// and extend a RequestContext until one of them produces the response.

pub mod context;

use std::time::Instant;

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

pub use context::{Loaded, PathParams, RequestContext};

/// What a stage tells the pipeline to do next
pub enum Flow {
    /// Hand the context to the next stage
    Continue,
    /// Stop here and send this response
    Respond(Response),
}

/// One step of a route chain
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logging and debugging
    fn name(&self) -> &'static str;

    async fn execute(&self, state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError>;
}

pub struct Pipeline {
    route: &'static str,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(route: &'static str) -> Self {
        Self {
            route,
            stages: Vec::new(),
        }
    }

    /// Append a stage; stages run in the order they are added
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn route(&self) -> &'static str {
        self.route
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage until one responds or fails. A chain that runs out of
    /// stages without responding is a wiring bug and answers 500.
    pub async fn run(&self, state: &AppState, mut ctx: RequestContext) -> Response {
        let start = Instant::now();
        tracing::debug!("Pipeline starting: route={}, stages={:?}", self.route, self.stage_names());

        for stage in &self.stages {
            match stage.execute(state, &mut ctx).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Respond(response)) => {
                    tracing::debug!(
                        "Pipeline {} answered by '{}' in {:?}",
                        self.route,
                        stage.name(),
                        start.elapsed()
                    );
                    return response;
                }
                Err(err) => {
                    tracing::warn!("Pipeline {} stopped at '{}': {}", self.route, stage.name(), err);
                    return err.into_response();
                }
            }
        }

        tracing::error!("Pipeline {} ran out of stages without a response", self.route);
        ApiError::datastore(format!("{} produced no response", self.route)).into_response()
    }
}
