use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validate_json_object;
use crate::store::postgres::{Columns, PgEntity};
use crate::store::Entity;

/// A group of agents coordinated under one architecture
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Swarm {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub architecture: String,
    pub configuration: Option<Value>,
    pub status: String,
}

/// Body of `POST /swarms` and `PUT /swarms/{id}`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SwarmInput {
    /// Caller-chosen id, honoured on create only
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub architecture: String,
    #[validate(custom = "validate_json_object")]
    pub configuration: Option<Value>,
    #[validate(length(min = 1, max = 50))]
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct SwarmChanges {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub architecture: String,
    pub configuration: Option<Value>,
    pub status: String,
}

impl SwarmInput {
    pub fn into_swarm(self) -> Swarm {
        Swarm {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            architecture: self.architecture,
            configuration: self.configuration,
            status: self.status,
        }
    }

    pub fn into_changes(self) -> SwarmChanges {
        SwarmChanges {
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            architecture: self.architecture,
            configuration: self.configuration,
            status: self.status,
        }
    }
}

impl Entity for Swarm {
    type Changes = SwarmChanges;

    const TABLE: &'static str = "swarms";
    const KIND: &'static str = "swarm";
    const TOPIC: &'static str = "swarms";

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, changes: SwarmChanges) {
        self.user_id = changes.user_id;
        self.name = changes.name;
        self.description = changes.description;
        self.architecture = changes.architecture;
        self.configuration = changes.configuration;
        self.status = changes.status;
    }
}

impl PgEntity for Swarm {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "name",
        "description",
        "architecture",
        "configuration",
        "status",
    ];

    fn push_values(&self, values: &mut Columns<'_, '_>) {
        values
            .push_bind(self.id)
            .push_bind(self.user_id)
            .push_bind(self.name.clone())
            .push_bind(self.description.clone())
            .push_bind(self.architecture.clone())
            .push_bind(self.configuration.clone())
            .push_bind(self.status.clone());
    }

    fn push_changes(changes: SwarmChanges, assignments: &mut Columns<'_, '_>) {
        assignments.push("user_id = ").push_bind_unseparated(changes.user_id);
        assignments.push("name = ").push_bind_unseparated(changes.name);
        assignments.push("description = ").push_bind_unseparated(changes.description);
        assignments.push("architecture = ").push_bind_unseparated(changes.architecture);
        assignments.push("configuration = ").push_bind_unseparated(changes.configuration);
        assignments.push("status = ").push_bind_unseparated(changes.status);
    }
}
