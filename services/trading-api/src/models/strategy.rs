use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::validate_json_object;
use crate::store::postgres::{Columns, PgEntity};
use crate::store::Entity;

/// Strategy source plus the schema of the parameters it accepts
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub code: String,
    pub parameters_schema: Option<Value>,
}

/// Body of `POST /strategies` and `PUT /strategies/{id}`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StrategyInput {
    /// Caller-chosen id, honoured on create only
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(custom = "validate_json_object")]
    pub parameters_schema: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct StrategyChanges {
    pub name: String,
    pub description: Option<String>,
    pub code: String,
    pub parameters_schema: Option<Value>,
}

impl StrategyInput {
    pub fn into_strategy(self) -> Strategy {
        Strategy {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            description: self.description,
            code: self.code,
            parameters_schema: self.parameters_schema,
        }
    }

    pub fn into_changes(self) -> StrategyChanges {
        StrategyChanges {
            name: self.name,
            description: self.description,
            code: self.code,
            parameters_schema: self.parameters_schema,
        }
    }
}

impl Entity for Strategy {
    type Changes = StrategyChanges;

    const TABLE: &'static str = "strategies";
    const KIND: &'static str = "strategy";
    const TOPIC: &'static str = "strategies";

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, changes: StrategyChanges) {
        self.name = changes.name;
        self.description = changes.description;
        self.code = changes.code;
        self.parameters_schema = changes.parameters_schema;
    }
}

impl PgEntity for Strategy {
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "description", "code", "parameters_schema"];

    fn push_values(&self, values: &mut Columns<'_, '_>) {
        values
            .push_bind(self.id)
            .push_bind(self.name.clone())
            .push_bind(self.description.clone())
            .push_bind(self.code.clone())
            .push_bind(self.parameters_schema.clone());
    }

    fn push_changes(changes: StrategyChanges, assignments: &mut Columns<'_, '_>) {
        assignments.push("name = ").push_bind_unseparated(changes.name);
        assignments.push("description = ").push_bind_unseparated(changes.description);
        assignments.push("code = ").push_bind_unseparated(changes.code);
        assignments
            .push("parameters_schema = ")
            .push_bind_unseparated(changes.parameters_schema);
    }
}
