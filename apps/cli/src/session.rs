use std::{sync::Arc, time::Duration};

use anyhow::Result;
use microreel_core::{
    events::{BusConfig, EventBus, EventBusBuilder},
    workers::Worker,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, warn};

use crate::workers::{
    notice_sink::NoticeSinkWorker,
    status_sink::StatusSinkWorker,
    watched_sink::{ProgressTarget, WatchedSinkWorker},
};

/// Grace period for sinks to drain queued events before shutdown.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

pub struct SessionHandle {
    pub bus: Arc<EventBus>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<JoinHandle<Result<()>>>,
}

impl SessionHandle {
    pub async fn shutdown(self) -> Result<()> {
        tokio::time::sleep(DRAIN_GRACE).await;
        // receivers may already be gone
        let _ = self.shutdown_tx.send(());
        for worker in self.workers {
            if let Err(e) = worker.await? {
                warn!(error = %e, "Worker exited with error");
            }
        }
        debug!(
            published = self.bus.published_total(),
            unrouted = self.bus.metrics().unrouted_total(),
            "Session closed"
        );
        Ok(())
    }
}

pub fn start_session(bus_config: BusConfig, progress: Option<ProgressTarget>) -> Result<SessionHandle> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let builder = EventBusBuilder::new(bus_config)
        .subscribe(NoticeSinkWorker::subscription())
        .subscribe(StatusSinkWorker::subscription())
        .subscribe(WatchedSinkWorker::subscription());

    let (bus, mut wiring, tasks) = builder.build()?;
    let bus = Arc::new(bus);

    // isolated drain tasks must run before anything publishes
    tasks.spawn_all();

    let workers = vec![
        tokio::spawn(NoticeSinkWorker.run(
            wiring.claim(NoticeSinkWorker::SUBSCRIBER_ID)?,
            Arc::clone(&bus),
            shutdown_rx.resubscribe(),
        )),
        tokio::spawn(StatusSinkWorker::default().run(
            wiring.claim(StatusSinkWorker::SUBSCRIBER_ID)?,
            Arc::clone(&bus),
            shutdown_rx.resubscribe(),
        )),
        tokio::spawn(WatchedSinkWorker::new(progress).run(
            wiring.claim(WatchedSinkWorker::SUBSCRIBER_ID)?,
            Arc::clone(&bus),
            shutdown_rx,
        )),
    ];
    debug!(session_id = %bus.session_id(), "Session workers started");

    Ok(SessionHandle {
        bus,
        shutdown_tx,
        workers,
    })
}
