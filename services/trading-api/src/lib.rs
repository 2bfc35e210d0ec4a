pub mod config;
pub mod consumer;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod health;
pub mod models;
pub mod observability;
pub mod passwords;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use db::Db;
pub use error::ApiError;
pub use events::{EventBus, MutationNotifier};
pub use models::*;
pub use observability::MetricsCollector;
pub use store::{MemoryStore, PgStore, TradingStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TradingStore>,
    pub notifier: MutationNotifier,
    pub metrics: MetricsCollector,
}

impl AppState {
    pub fn new(store: Arc<dyn TradingStore>, bus: Arc<dyn EventBus>, publish_timeout: Duration) -> Self {
        let metrics = MetricsCollector::new();
        Self {
            store,
            notifier: MutationNotifier::new(bus, publish_timeout, metrics.clone()),
            metrics,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the API router
pub fn app(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    use handlers::{agents, strategies, swarms, users};

    Router::new()
        .route("/", get(handlers::root))
        .route("/agents", get(agents::list_agents).post(agents::create_agent))
        .route(
            "/agents/{id}",
            get(agents::get_agent)
                .put(agents::update_agent)
                .delete(agents::delete_agent),
        )
        .route("/strategies", get(strategies::list_strategies).post(strategies::create_strategy))
        .route(
            "/strategies/{id}",
            get(strategies::get_strategy)
                .put(strategies::update_strategy)
                .delete(strategies::delete_strategy),
        )
        .route("/swarms", get(swarms::list_swarms).post(swarms::create_swarm))
        .route(
            "/swarms/{id}",
            get(swarms::get_swarm)
                .put(swarms::update_swarm)
                .delete(swarms::delete_swarm),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/health", get(health::health_detail))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
