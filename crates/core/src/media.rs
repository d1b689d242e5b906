//! Abstract media elements and the signals they report.
//!
//! Hosts wrap whatever actually plays media (a browser element, a native
//! player, a simulation) behind [`MediaElement`] and forward its events to the
//! playback policy as [`MediaSignal`] values.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(u64);

impl HandleId {
    pub fn next() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// Events a media element reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSignal {
    /// Playback clock advanced to this position, in seconds.
    Tick(f64),
    /// The element actually started playing.
    Started,
    Ended,
    CanPlay,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionKind {
    /// The host refused to start without a user gesture.
    PolicyBlocked,
    LoadFailure,
}

/// A refused `play()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRejection {
    pub message: String,
}

impl PlaybackRejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> RejectionKind {
        let msg = self.message.to_ascii_lowercase();
        if ["gesture", "autoplay", "user", "notallowed"]
            .iter()
            .any(|hint| msg.contains(hint))
        {
            RejectionKind::PolicyBlocked
        } else {
            RejectionKind::LoadFailure
        }
    }
}

pub trait MediaElement: Send + Sync {
    fn id(&self) -> HandleId;

    fn kind(&self) -> MediaKind;

    fn play(&self) -> Result<(), PlaybackRejection>;

    /// Pausing is expected to be safe; implementations swallow failures.
    fn pause(&self);

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
}

/// Creates elements for resolved URLs.
pub trait MediaElementFactory: Send + Sync {
    fn create(&self, kind: MediaKind, url: &str) -> Arc<dyn MediaElement>;
}

#[derive(Debug, Default)]
struct SimulatedState {
    playing: bool,
    muted: bool,
    position: f64,
    /// Consecutive `play()` calls to refuse, with the message to refuse with.
    refusals: Vec<String>,
    /// Unmuted playback is refused until a gesture is registered.
    requires_gesture_for_sound: bool,
    gesture_seen: bool,
    play_calls: usize,
}

/// Deterministic in-memory element for offline runs and tests.
#[derive(Debug)]
pub struct SimulatedElement {
    id: HandleId,
    kind: MediaKind,
    url: String,
    state: Mutex<SimulatedState>,
}

impl SimulatedElement {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            id: HandleId::next(),
            kind,
            url: url.into(),
            state: Mutex::new(SimulatedState::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Refuse the next `play()` with `message`.
    pub fn refuse_next_play(&self, message: impl Into<String>) {
        self.lock().refusals.push(message.into());
    }

    /// Mimic a browser autoplay policy: sound needs a prior gesture.
    pub fn require_gesture_for_sound(&self) {
        self.lock().requires_gesture_for_sound = true;
    }

    pub fn register_gesture(&self) {
        self.lock().gesture_seen = true;
    }

    /// Advance the clock while playing; returns the new position.
    pub fn advance(&self, seconds: f64) -> f64 {
        let mut state = self.lock();
        if state.playing {
            state.position += seconds;
        }
        state.position
    }

    pub fn seek(&self, position: f64) {
        self.lock().position = position.max(0.0);
    }

    pub fn play_calls(&self) -> usize {
        self.lock().play_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().expect("SimulatedElement poisoned")
    }
}

impl MediaElement for SimulatedElement {
    fn id(&self) -> HandleId {
        self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn play(&self) -> Result<(), PlaybackRejection> {
        let mut state = self.lock();
        state.play_calls += 1;
        if !state.refusals.is_empty() {
            let message = state.refusals.remove(0);
            return Err(PlaybackRejection::new(message));
        }
        if state.requires_gesture_for_sound && !state.muted && !state.gesture_seen {
            return Err(PlaybackRejection::new(
                "NotAllowedError: play() failed because the user didn't interact with the document first",
            ));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) {
        self.lock().playing = false;
    }

    fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.lock().muted
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn current_time(&self) -> f64 {
        self.lock().position
    }
}

/// Factory handing out [`SimulatedElement`]s and remembering them so a
/// driver can advance their clocks.
#[derive(Default)]
pub struct SimulatedFactory {
    created: Mutex<Vec<Arc<SimulatedElement>>>,
    gesture_policy: bool,
}

impl SimulatedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Created elements refuse unmuted playback until a gesture.
    pub fn with_gesture_policy(mut self) -> Self {
        self.gesture_policy = true;
        self
    }

    pub fn created(&self) -> Vec<Arc<SimulatedElement>> {
        self.created.lock().expect("SimulatedFactory poisoned").clone()
    }

    pub fn find(&self, url: &str) -> Option<Arc<SimulatedElement>> {
        self.created()
            .into_iter()
            .find(|element| element.url() == url)
    }
}

impl MediaElementFactory for SimulatedFactory {
    fn create(&self, kind: MediaKind, url: &str) -> Arc<dyn MediaElement> {
        let element = Arc::new(SimulatedElement::new(kind, url));
        if self.gesture_policy {
            element.require_gesture_for_sound();
        }
        self.created
            .lock()
            .expect("SimulatedFactory poisoned")
            .push(Arc::clone(&element));
        element
    }
}
