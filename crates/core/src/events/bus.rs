use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    events::{BusConfig, BusMetrics, EnrichedEvent, Event},
    routes::Routes,
};

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    session_id: Uuid,
    next_ingest_seq: AtomicU64,
    routes: Routes,
    metrics: Arc<BusMetrics>,
    strict_routing: bool,
}

impl EventBus {
    pub fn new(cfg: BusConfig, routes: Routes, metrics: Arc<BusMetrics>) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                session_id: cfg.session_id,
                next_ingest_seq: AtomicU64::new(0),
                routes,
                metrics,
                strict_routing: cfg.strict_routing,
            }),
        }
    }

    /// A bus with no subscribers. Everything published is counted as unrouted.
    pub fn detached() -> Self {
        Self::new(
            BusConfig::default(),
            Routes::default(),
            Arc::new(BusMetrics::new()),
        )
    }

    pub fn publish(&self, event: Arc<dyn Event>) {
        let ingest_seq = self.inner.next_ingest_seq.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type();

        let enriched_event = Arc::new(EnrichedEvent {
            event,
            session_id: self.inner.session_id,
            ingest_seq,
            ingested_at: Instant::now(),
        });

        let Some(routes) = self.inner.routes.for_event_type(event_type) else {
            self.inner.metrics.record_unrouted(event_type);
            if self.inner.strict_routing {
                warn!(event_type, "Published event has no subscribers");
            } else {
                debug!(event_type, "Unrouted event dropped");
            }
            return;
        };

        for route in routes {
            if !route.deliver(Arc::clone(&enriched_event)) {
                warn!(
                    event_type,
                    subscriber = route.subscriber_id,
                    "Subscriber inbox full, event dropped"
                );
            }
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn published_total(&self) -> u64 {
        self.inner.next_ingest_seq.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &BusMetrics {
        &self.inner.metrics
    }

    /// Events dropped on the way to `subscriber_id` across all its inputs.
    pub fn drops_for(&self, subscriber_id: &str) -> u64 {
        self.inner.routes.drops_for(subscriber_id)
    }
}
