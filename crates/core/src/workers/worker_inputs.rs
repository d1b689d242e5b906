use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::{events::EnrichedEvent, queues::FifoDropOldestReceiver, routes::LessonSnapshots};

pub struct Latest1Input {
    pub event_type: &'static str,
    pub queue: Arc<LessonSnapshots>,
}

pub enum FifoReceiver {
    FifoDropOldest(FifoDropOldestReceiver<Arc<EnrichedEvent>>),
    Isolated(mpsc::Receiver<Arc<EnrichedEvent>>),
}

impl FifoReceiver {
    fn try_recv(&mut self) -> Option<Arc<EnrichedEvent>> {
        match self {
            FifoReceiver::FifoDropOldest(r) => r.try_recv(),
            FifoReceiver::Isolated(r) => r.try_recv().ok(),
        }
    }
}

pub struct FifoInput {
    pub event_type: &'static str,
    pub receiver: FifoReceiver,
}

/// Everything one worker reads from, woken by a shared notifier.
pub struct WorkerInputs {
    pub latest: Vec<Latest1Input>,
    pub fifos: Vec<FifoInput>,
    pub notify_any: Arc<Notify>,
    pub fifo_index: usize,
}

pub enum WorkerBatch {
    /// Newest unread snapshot of every lesson, across all Latest1 inputs.
    Snapshots(Vec<SnapshotUpdate>),
    FifoItem {
        event_type: &'static str,
        event: Arc<EnrichedEvent>,
    },
}

pub struct SnapshotUpdate {
    pub event_type: &'static str,
    pub event: Arc<EnrichedEvent>,
}

impl SnapshotUpdate {
    pub fn lesson_id(&self) -> Option<&str> {
        self.event.event.lesson_id()
    }
}

impl WorkerInputs {
    /// Wait for the next batch. Pending snapshots win over FIFO items.
    pub async fn next(&mut self) -> WorkerBatch {
        loop {
            let snapshots = self.take_snapshots();
            if !snapshots.is_empty() {
                return WorkerBatch::Snapshots(snapshots);
            }
            if let Some(item) = self.take_fifo_item() {
                return item;
            }
            self.notify_any.notified().await;
        }
    }

    fn take_snapshots(&self) -> Vec<SnapshotUpdate> {
        self.latest
            .iter()
            .flat_map(|input| {
                input.queue.drain().into_iter().map(move |event| SnapshotUpdate {
                    event_type: input.event_type,
                    event,
                })
            })
            .collect()
    }

    /// Round-robin across FIFO inputs, one item per call.
    fn take_fifo_item(&mut self) -> Option<WorkerBatch> {
        let count = self.fifos.len();
        for _ in 0..count {
            let i = self.fifo_index;
            self.fifo_index = (i + 1) % count;
            let fifo = &mut self.fifos[i];
            if let Some(event) = fifo.receiver.try_recv() {
                return Some(WorkerBatch::FifoItem {
                    event_type: fifo.event_type,
                    event,
                });
            }
        }
        None
    }
}
