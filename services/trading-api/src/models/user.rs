use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::store::postgres::{Columns, PgEntity};
use crate::store::Entity;

/// User row as stored. Carries the password hash, so it is never returned
/// over HTTP or placed in events; see [`UserView`].
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Body of `POST /users`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Body of `PUT /users/{id}`. Without a password the stored hash is kept.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for User {
    type Changes = UserChanges;

    const TABLE: &'static str = "users";
    const KIND: &'static str = "user";
    const TOPIC: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, changes: UserChanges) {
        self.username = changes.username;
        self.email = changes.email;
        if let Some(hash) = changes.password_hash {
            self.password_hash = hash;
        }
        self.updated_at = changes.updated_at;
    }

    fn event_snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(UserView::from(self))
    }
}

impl PgEntity for User {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "username",
        "email",
        "password_hash",
        "created_at",
        "updated_at",
    ];

    fn push_values(&self, values: &mut Columns<'_, '_>) {
        values
            .push_bind(self.id)
            .push_bind(self.username.clone())
            .push_bind(self.email.clone())
            .push_bind(self.password_hash.clone())
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }

    fn push_changes(changes: UserChanges, assignments: &mut Columns<'_, '_>) {
        assignments.push("username = ").push_bind_unseparated(changes.username);
        assignments.push("email = ").push_bind_unseparated(changes.email);
        if let Some(hash) = changes.password_hash {
            assignments.push("password_hash = ").push_bind_unseparated(hash);
        }
        assignments.push("updated_at = ").push_bind_unseparated(changes.updated_at);
    }
}
