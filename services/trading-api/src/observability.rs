//! Observability: in-process counters and log setup

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Counters exposed through the detailed health check
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

struct MetricsInner {
    counters: HashMap<String, u64>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner {
                counters: HashMap::new(),
                start_time: Instant::now(),
            })),
        }
    }

    /// Increment a counter
    pub async fn increment(&self, name: &str, value: u64) {
        let mut inner = self.inner.write().await;
        let counter = inner.counters.entry(name.to_string()).or_insert(0);
        *counter += value;
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;
        MetricsSnapshot {
            counters: inner.counters.clone(),
            uptime_secs: inner.start_time.elapsed().as_secs(),
        }
    }

    /// Get specific counter
    pub async fn get_counter(&self, name: &str) -> u64 {
        let inner = self.inner.read().await;
        inner.counters.get(name).copied().unwrap_or(0)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub uptime_secs: u64,
}

/// Install the global fmt subscriber at `level`.
pub fn init_tracing(level: tracing::Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Predefined metric names
pub mod metrics {
    // Change events
    pub const EVENTS_PUBLISHED: &str = "events_published_total";
    pub const EVENTS_PUBLISH_FAILED: &str = "events_publish_failed_total";

    // Replica consumer
    pub const EVENTS_CONSUMED: &str = "events_consumed_total";
    pub const EVENTS_SKIPPED: &str = "events_skipped_total";

    /// Per-entity mutation counter, e.g. `agent_created_total`
    pub fn mutation(kind: &str, operation: crate::events::Operation) -> String {
        format!("{}_{}_total", kind, operation)
    }
}
