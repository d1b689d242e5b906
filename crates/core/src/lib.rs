pub mod api;
pub mod arbiter;
pub mod captions;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod feed;
pub mod fetch;
pub mod format;
pub mod media;
pub mod policy;
pub mod probe;
pub mod queues;
pub mod resolver;
pub mod routes;
pub mod settings;
pub mod slug;
pub mod types;
pub mod workers;

pub use api::{ApiClient, HealthStatus, LessonSource, ProgressUpdate};
pub use arbiter::PlaybackArbiter;
pub use captions::{CaptionLoader, CaptionSynchronizer, CaptionTier, CaptionTrack, active_cue};
pub use catalog::demo_lessons;
pub use config::{ApiBase, RuntimeConfig};
pub use diagnostics::{MediaDiagnostics, PlaybackProbe, probe_playback, run_endpoint_diagnostics};
pub use error::{MediaError, Result};
pub use events::EventBus;
pub use feed::{LessonFeed, select_active};
pub use fetch::{AssetFetcher, HttpFetcher, MemoryFetcher};
pub use format::{
    format_cues_with_timestamps, format_diagnostics_readable, format_media_set_readable,
    format_timestamp,
};
pub use media::{
    HandleId, MediaElement, MediaElementFactory, MediaKind, MediaSignal, PlaybackRejection,
    RejectionKind, SimulatedElement, SimulatedFactory,
};
pub use policy::{PlaybackPolicy, PlaybackState, PresentationTier, WatchedLatch, prepare};
pub use probe::{AssetProber, ContentTypeCheck, first_success};
pub use resolver::{LegacyAudioIndex, MediaResolver};
pub use settings::{PlaybackSettings, SettingsPatch, SettingsStore};
pub use slug::{AliasTable, SlugResolver, to_slug};
pub use types::{AssetKind, Cue, Lesson, ResolvedMediaSet};
