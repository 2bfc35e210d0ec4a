//! Replicates `agents` topic events into the `agents` table.

use std::sync::Arc;

use anyhow::Context;
use rdkafka::consumer::{CommitMode, Consumer};
use rdkafka::Message;
use tracing::{error, info, warn};

use trading_api::config::{Settings, StoreBackend};
use trading_api::consumer::{AgentEventConsumer, AgentReplica};
use trading_api::events::kafka;
use trading_api::models::Agent;
use trading_api::observability::metrics;
use trading_api::store::{EntityStore, Entity, MemoryStore, PgStore};
use trading_api::{db, MetricsCollector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;

    trading_api::observability::init_tracing(settings.log_level());

    let brokers = settings
        .kafka_brokers()
        .context("KAFKA_BOOTSTRAP_SERVERS must be set for the agent consumer")?;

    let store: Arc<dyn EntityStore<AgentReplica>> = match settings.store_backend {
        StoreBackend::Postgres => {
            let pool = db::init_db(&settings.database_url, settings.db_max_connections).await?;
            db::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    let handler = AgentEventConsumer::new(store);
    let counters = MetricsCollector::new();
    let consumer = kafka::subscribe(brokers, &settings.kafka_group_id, &[Agent::TOPIC])?;

    info!("Agent consumer started");

    loop {
        let message = tokio::select! {
            received = consumer.recv() => received,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Failed to receive message");
                continue;
            }
        };

        match message.payload() {
            Some(payload) => match handler.handle_payload(payload).await {
                Ok(applied) => {
                    info!(offset = message.offset(), applied = ?applied, "Agent event processed");
                    counters.increment(metrics::EVENTS_CONSUMED, 1).await;
                }
                Err(e) => {
                    warn!(offset = message.offset(), error = %e, "Skipping agent event");
                    counters.increment(metrics::EVENTS_SKIPPED, 1).await;
                }
            },
            None => {
                warn!(offset = message.offset(), "Skipping message with no payload");
                counters.increment(metrics::EVENTS_SKIPPED, 1).await;
            }
        }

        if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
            warn!(offset = message.offset(), error = %e, "Failed to commit offset");
        }
    }

    info!(
        consumed = counters.get_counter(metrics::EVENTS_CONSUMED).await,
        skipped = counters.get_counter(metrics::EVENTS_SKIPPED).await,
        "Agent consumer stopped"
    );
    Ok(())
}
