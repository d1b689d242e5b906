use std::{any::Any, sync::Arc, time::SystemTime};

use erased_serde::Serialize as ErasedSerialize;
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

pub trait Event: Send + Sync + ErasedSerialize + 'static {
    fn event_id(&self) -> Uuid;
    fn parent_ids(&self) -> &[Uuid];
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> SystemTime;

    /// Lesson the event concerns, when there is one.
    fn lesson_id(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

erased_serde::serialize_trait_object!(Event);

/// Common fields every playback event carries.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    pub event_id: Uuid,
    pub parent_ids: Vec<Uuid>,
    pub timestamp: SystemTime,
}

impl EventHeader {
    pub fn new() -> Self {
        Self::with_parents(Vec::new())
    }

    pub fn with_parents(parent_ids: Vec<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            parent_ids,
            timestamp: SystemTime::now(),
        }
    }
}

impl Default for EventHeader {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EnrichedEvent {
    pub event: Arc<dyn Event>,
    pub ingest_seq: u64,
    pub session_id: Uuid,
    pub ingested_at: Instant,
}

pub fn downcast_ref<T: 'static>(e: &Arc<dyn Event>) -> Option<&T> {
    e.as_any().downcast_ref::<T>()
}

pub fn expect<'a, T: 'static>(
    e: &'a Arc<dyn Event>,
    expected_event_type: &'static str,
) -> anyhow::Result<&'a T> {
    downcast_ref::<T>(e).ok_or_else(|| {
        anyhow::anyhow!(
            "expected event_type={}, got={}",
            expected_event_type,
            e.event_type()
        )
    })
}

/// Serialize any event to a JSON value, tagged with its type.
pub fn to_json(e: &dyn Event) -> anyhow::Result<serde_json::Value> {
    let mut value = serde_json::to_value(e)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("type".to_string(), e.event_type().into());
    }
    Ok(value)
}
