use std::collections::HashMap;

use crate::{queues::QueueKind, workers::WorkerInputs};

pub struct SubscriptionSpec {
    pub subscriber_id: &'static str,
    pub inputs: Vec<InputSpec>,
}

pub struct InputSpec {
    pub event_type: &'static str,
    pub queue_kind: QueueKind,
}

impl InputSpec {
    pub fn new(event_type: &'static str, queue_kind: QueueKind) -> Self {
        Self {
            event_type,
            queue_kind,
        }
    }
}

/// Per-subscriber inputs produced by the bus builder, claimed once by each worker.
pub struct WorkerWiring {
    inputs: HashMap<&'static str, WorkerInputs>,
}

impl WorkerWiring {
    pub fn new(inputs: HashMap<&'static str, WorkerInputs>) -> Self {
        Self { inputs }
    }

    pub fn take(&mut self, subscriber_id: &'static str) -> Option<WorkerInputs> {
        self.inputs.remove(subscriber_id)
    }

    /// Like [`take`](Self::take) but an error when the subscriber was never registered.
    pub fn claim(&mut self, subscriber_id: &'static str) -> anyhow::Result<WorkerInputs> {
        self.take(subscriber_id)
            .ok_or_else(|| anyhow::anyhow!("no wiring for subscriber_id={subscriber_id}"))
    }

    pub fn unclaimed(&self) -> impl Iterator<Item = &&'static str> {
        self.inputs.keys()
    }
}
