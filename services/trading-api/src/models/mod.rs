//! Typed records for every entity the API manages, plus request bodies.

pub mod agent;
pub mod strategy;
pub mod swarm;
pub mod user;

use serde::Serialize;
use validator::ValidationError;

pub use agent::{Agent, AgentChanges, AgentInput};
pub use strategy::{Strategy, StrategyChanges, StrategyInput};
pub use swarm::{Swarm, SwarmChanges, SwarmInput};
pub use user::{User, UserChanges, UserInput, UserUpdate, UserView};

/// `configuration` and `parameters_schema` must be JSON objects when present.
pub(crate) fn validate_json_object(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("must be a JSON object"))
    }
}

/// Body returned by every DELETE endpoint
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Body returned by `GET /`
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}
