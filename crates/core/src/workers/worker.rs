use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    events::{EnrichedEvent, EventBus},
    workers::{SnapshotUpdate, SubscriptionSpec, WorkerBatch, WorkerFailed, WorkerInputs},
};

/// A bus subscriber. `run` drives the inputs until shutdown; a failing
/// handler is reported as [`WorkerFailed`] and the loop keeps going.
#[async_trait]
pub trait Worker: Send + Sized + 'static {
    const SUBSCRIBER_ID: &'static str;

    fn subscription() -> SubscriptionSpec;

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> Result<()>;

    /// Latest1 inputs arrive batched; by default each is handled in turn.
    async fn handle_snapshots(&mut self, updates: Vec<SnapshotUpdate>, bus: &EventBus) -> Result<()> {
        for update in updates {
            self.handle(update.event, bus).await?;
        }
        Ok(())
    }

    async fn run(
        mut self,
        mut inputs: WorkerInputs,
        bus: Arc<EventBus>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        debug!(subscriber = Self::SUBSCRIBER_ID, "Worker started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(subscriber = Self::SUBSCRIBER_ID, "Worker stopping");
                    return Ok(());
                }
                batch = inputs.next() => match batch {
                    WorkerBatch::Snapshots(updates) => {
                        let cause = updates.last().map(|u| Arc::clone(&u.event.event));
                        if let Err(e) = self.handle_snapshots(updates, &bus).await {
                            if let Some(cause) = cause {
                                self.report(&bus, &cause, e);
                            }
                        }
                    }
                    WorkerBatch::FifoItem { event, .. } => {
                        let cause = Arc::clone(&event.event);
                        if let Err(e) = self.handle(event, &bus).await {
                            self.report(&bus, &cause, e);
                        }
                    }
                }
            }
        }
    }

    fn report(&self, bus: &EventBus, cause: &Arc<dyn crate::events::Event>, error: anyhow::Error) {
        warn!(subscriber = Self::SUBSCRIBER_ID, event_type = cause.event_type(), error = %error, "Worker failed to handle event");
        // a failure handling a failure would loop forever
        if cause.event_type() != WorkerFailed::EVENT_TYPE {
            bus.publish(Arc::new(WorkerFailed::new(
                cause,
                Self::SUBSCRIBER_ID,
                format!("{error:#}"),
            )));
        }
    }
}
