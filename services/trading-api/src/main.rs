use std::sync::Arc;

use tracing::{info, warn};

use trading_api::config::{Settings, StoreBackend};
use trading_api::events::{EventBus, InMemoryEventBus, KafkaEventBus};
use trading_api::store::{MemoryStore, PgStore, TradingStore};
use trading_api::{db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;

    trading_api::observability::init_tracing(settings.log_level());

    info!("Starting Trading Bot API...");

    let store: Arc<dyn TradingStore> = match settings.store_backend {
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = db::init_db(&settings.database_url, settings.db_max_connections).await?;
            info!("Database connected");

            info!("Running migrations...");
            db::migrate(&pool).await?;
            info!("Migrations applied");

            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let bus: Arc<dyn EventBus> = match settings.kafka_brokers() {
        Some(brokers) => Arc::new(KafkaEventBus::new(
            brokers,
            &settings.kafka_client_id,
            settings.publish_timeout(),
        )?),
        None => {
            warn!("KAFKA_BOOTSTRAP_SERVERS not set; change events stay in process");
            Arc::new(InMemoryEventBus::new())
        }
    };

    let state = Arc::new(AppState::new(store, bus.clone(), settings.publish_timeout()));
    let app = trading_api::app(state, &settings.cors_origins());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("Trading Bot API listening on port {}", settings.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, flushing event bus");
    bus.flush().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
