//! Events the playback layer publishes for hosts to render or persist.

use std::{any::Any, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    captions::CaptionTier,
    events::{Event, EventHeader},
    policy::{PlaybackState, PresentationTier},
};

macro_rules! impl_lesson_event {
    ($ty:ty) => {
        impl Event for $ty {
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
                Some(&self.lesson_id)
            }

            fn as_any(&self) -> &dyn Any {
                self as &dyn Any
            }
        }
    };
}

/// The watch clock crossed the threshold. Published once per lesson mount.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonWatched {
    pub header: EventHeader,
    pub lesson_id: String,
    pub at_seconds: f64,
    pub threshold_seconds: f64,
}

impl LessonWatched {
    pub const EVENT_TYPE: &'static str = "lesson.watched";

    pub fn new(lesson_id: impl Into<String>, at_seconds: f64, threshold_seconds: f64) -> Self {
        Self {
            header: EventHeader::new(),
            lesson_id: lesson_id.into(),
            at_seconds,
            threshold_seconds,
        }
    }
}

impl_lesson_event!(LessonWatched);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
    /// The user can fix it, e.g. by tapping to enable sound.
    Action,
}

/// A short user-facing toast.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackNotice {
    pub header: EventHeader,
    pub lesson_id: String,
    pub kind: NoticeKind,
    pub message: String,
}

impl PlaybackNotice {
    pub const EVENT_TYPE: &'static str = "playback.notice";

    pub fn new(lesson_id: impl Into<String>, kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            header: EventHeader::new(),
            lesson_id: lesson_id.into(),
            kind,
            message: message.into(),
        }
    }
}

impl_lesson_event!(PlaybackNotice);

/// Snapshot of a card's presentation after every state change.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub header: EventHeader,
    pub lesson_id: String,
    pub state: PlaybackState,
    pub tier: PresentationTier,
    pub caption_tier: CaptionTier,
    pub caption: String,
    pub audio_muted: bool,
    pub clock_seconds: f64,
}

impl PlaybackStatus {
    pub const EVENT_TYPE: &'static str = "playback.status";
}

impl_lesson_event!(PlaybackStatus);
