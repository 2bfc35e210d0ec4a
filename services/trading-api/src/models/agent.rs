use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validate_json_object;
use crate::store::postgres::{Columns, PgEntity};
use crate::store::Entity;

/// Trading agent: one strategy run on behalf of a user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub strategy_id: Uuid,
    pub configuration: Option<Value>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /agents` and `PUT /agents/{id}`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AgentInput {
    /// Caller-chosen id, honoured on create only
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub strategy_id: Uuid,
    #[validate(custom = "validate_json_object")]
    pub configuration: Option<Value>,
    #[validate(length(min = 1, max = 50))]
    pub status: String,
}

/// Editable agent columns
#[derive(Debug, Clone)]
pub struct AgentChanges {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub strategy_id: Uuid,
    pub configuration: Option<Value>,
    pub status: String,
}

impl AgentInput {
    pub fn into_agent(self) -> Agent {
        Agent {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            strategy_id: self.strategy_id,
            configuration: self.configuration,
            status: self.status,
            created_at: Utc::now(),
        }
    }

    pub fn into_changes(self) -> AgentChanges {
        AgentChanges {
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            strategy_id: self.strategy_id,
            configuration: self.configuration,
            status: self.status,
        }
    }
}

impl From<&Agent> for AgentChanges {
    fn from(agent: &Agent) -> Self {
        Self {
            user_id: agent.user_id,
            name: agent.name.clone(),
            description: agent.description.clone(),
            strategy_id: agent.strategy_id,
            configuration: agent.configuration.clone(),
            status: agent.status.clone(),
        }
    }
}

impl Entity for Agent {
    type Changes = AgentChanges;

    const TABLE: &'static str = "trading_agents";
    const KIND: &'static str = "agent";
    const TOPIC: &'static str = "agents";

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, changes: AgentChanges) {
        self.user_id = changes.user_id;
        self.name = changes.name;
        self.description = changes.description;
        self.strategy_id = changes.strategy_id;
        self.configuration = changes.configuration;
        self.status = changes.status;
    }
}

impl PgEntity for Agent {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "description",
        "strategy_id",
        "configuration",
        "status",
        "created_at",
    ];

    fn push_values(&self, values: &mut Columns<'_, '_>) {
        values
            .push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.name.clone())
            .push_bind(self.description.clone())
            .push_bind(self.strategy_id)
            .push_bind(self.configuration.clone())
            .push_bind(self.status.clone())
            .push_bind(self.created_at);
    }

    fn push_changes(changes: AgentChanges, assignments: &mut Columns<'_, '_>) {
        assignments.push("user_id = ").push_bind_unseparated(changes.user_id);
        assignments.push("name = ").push_bind_unseparated(changes.name);
        assignments.push("description = ").push_bind_unseparated(changes.description);
        assignments.push("strategy_id = ").push_bind_unseparated(changes.strategy_id);
        assignments.push("configuration = ").push_bind_unseparated(changes.configuration);
        assignments.push("status = ").push_bind_unseparated(changes.status);
    }
}
