use std::{any::Any, sync::Arc, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::events::{Event, EventHeader};

/// A worker's handler returned an error for `failed_event_type`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerFailed {
    pub header: EventHeader,
    pub subscriber_id: &'static str,
    pub failed_event_type: &'static str,
    pub lesson_id: Option<String>,
    pub message: String,
}

impl WorkerFailed {
    pub const EVENT_TYPE: &'static str = "worker.failed";

    pub fn new(cause: &Arc<dyn Event>, subscriber_id: &'static str, message: String) -> Self {
        Self {
            header: EventHeader::with_parents(vec![cause.event_id()]),
            subscriber_id,
            failed_event_type: cause.event_type(),
            lesson_id: cause.lesson_id().map(str::to_string),
            message,
        }
    }
}

impl Event for WorkerFailed {
    fn event_id(&self) -> Uuid {
        self.header.event_id
    }

    fn parent_ids(&self) -> &[Uuid] {
        &self.header.parent_ids
    }

    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> SystemTime {
        self.header.timestamp
    }

    fn lesson_id(&self) -> Option<&str> {
        self.lesson_id.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self as &dyn Any
    }
}
