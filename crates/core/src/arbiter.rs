//! Single-playback arbitration: at most one registered element plays.
//!
//! The arbiter is an ordinary value owned by the application root and shared
//! through `Arc`, so each test or feed gets its own registry.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use tracing::{debug, trace};

use crate::media::{HandleId, MediaElement, PlaybackRejection};

#[derive(Default)]
struct ArbiterState {
    handles: BTreeMap<HandleId, Arc<dyn MediaElement>>,
    current: Option<HandleId>,
}

#[derive(Default)]
pub struct PlaybackArbiter {
    state: Mutex<ArbiterState>,
}

impl PlaybackArbiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ArbiterState> {
        self.state.lock().expect("PlaybackArbiter poisoned")
    }

    /// Add `handle` to the registry. With `play_now` every other handle is
    /// paused first and `handle` is asked to play. Registering twice is a no-op
    /// apart from the optional play.
    pub fn register(
        &self,
        handle: Arc<dyn MediaElement>,
        play_now: bool,
    ) -> Result<(), PlaybackRejection> {
        let id = handle.id();
        self.lock().handles.insert(id, Arc::clone(&handle));
        trace!(handle = id.get(), play_now, "Registered media handle");

        if !play_now {
            return Ok(());
        }
        self.pause_all_except(id);
        let result = handle.play();
        if result.is_err() {
            let mut state = self.lock();
            if state.current == Some(id) {
                state.current = None;
            }
        }
        result
    }

    /// Remove `id`. It is never paused or played on its behalf again.
    pub fn unregister(&self, id: HandleId) {
        let mut state = self.lock();
        state.handles.remove(&id);
        if state.current == Some(id) {
            state.current = None;
        }
    }

    /// Pause every registered handle except `id`, which becomes current if registered.
    pub fn pause_all_except(&self, id: HandleId) {
        let others: Vec<Arc<dyn MediaElement>> = {
            let mut state = self.lock();
            state.current = state.handles.contains_key(&id).then_some(id);
            state
                .handles
                .iter()
                .filter(|(other, _)| **other != id)
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        for handle in others {
            handle.pause();
        }
    }

    pub fn pause_all(&self) {
        let all: Vec<Arc<dyn MediaElement>> = {
            let mut state = self.lock();
            state.current = None;
            state.handles.values().cloned().collect()
        };
        for handle in all {
            handle.pause();
        }
    }

    /// A registered handle started playing on its own; silence the rest.
    /// Unknown handles are ignored.
    pub fn notify_started(&self, id: HandleId) {
        if !self.is_registered(id) {
            debug!(handle = id.get(), "Play event from unregistered handle ignored");
            return;
        }
        self.pause_all_except(id);
    }

    pub fn notify_ended(&self, id: HandleId) {
        let mut state = self.lock();
        if state.current == Some(id) {
            state.current = None;
        }
    }

    pub fn is_registered(&self, id: HandleId) -> bool {
        self.lock().handles.contains_key(&id)
    }

    pub fn current(&self) -> Option<HandleId> {
        self.lock().current
    }

    pub fn len(&self) -> usize {
        self.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().handles.is_empty()
    }

    pub fn playing_count(&self) -> usize {
        let handles: Vec<Arc<dyn MediaElement>> = self.lock().handles.values().cloned().collect();
        handles.iter().filter(|h| h.is_playing()).count()
    }

    /// True when no more than one registered handle is playing.
    pub fn exclusivity_holds(&self) -> bool {
        self.playing_count() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaKind, SimulatedElement};

    fn element() -> Arc<SimulatedElement> {
        Arc::new(SimulatedElement::new(MediaKind::Audio, "/a.mp3"))
    }

    #[test]
    fn register_with_play_pauses_the_others() {
        let arbiter = PlaybackArbiter::new();
        let a = element();
        let b = element();

        arbiter.register(a.clone(), true).unwrap();
        assert!(a.is_playing());

        arbiter.register(b.clone(), true).unwrap();
        assert!(!a.is_playing());
        assert!(b.is_playing());
        assert_eq!(arbiter.current(), Some(b.id()));
        assert!(arbiter.exclusivity_holds());
    }

    #[test]
    fn natural_play_event_enforces_exclusivity() {
        let arbiter = PlaybackArbiter::new();
        let a = element();
        let b = element();
        arbiter.register(a.clone(), true).unwrap();
        arbiter.register(b.clone(), false).unwrap();

        // b starts through its own controls, briefly overlapping a
        b.play().unwrap();
        assert_eq!(arbiter.playing_count(), 2);

        arbiter.notify_started(b.id());
        assert!(!a.is_playing());
        assert!(b.is_playing());
        assert_eq!(arbiter.playing_count(), 1);
    }

    #[test]
    fn unregistered_handle_is_left_alone() {
        let arbiter = PlaybackArbiter::new();
        let a = element();
        let b = element();
        arbiter.register(a.clone(), false).unwrap();
        arbiter.register(b.clone(), true).unwrap();
        arbiter.unregister(b.id());
        assert_eq!(arbiter.current(), None);

        a.play().unwrap();
        arbiter.notify_started(b.id());
        assert!(a.is_playing(), "stale event must not pause others");

        arbiter.pause_all_except(b.id());
        assert_eq!(arbiter.current(), None);
        assert!(b.is_playing(), "unregistered handle is not touched");
    }

    #[test]
    fn rejected_play_leaves_no_current() {
        let arbiter = PlaybackArbiter::new();
        let a = element();
        a.refuse_next_play("NotAllowedError: autoplay blocked");
        let err = arbiter.register(a.clone(), true).unwrap_err();
        assert!(err.message.contains("autoplay"));
        assert_eq!(arbiter.current(), None);
        assert!(arbiter.is_registered(a.id()));
    }

    #[test]
    fn pause_all_and_ended_clear_current() {
        let arbiter = PlaybackArbiter::new();
        let a = element();
        arbiter.register(a.clone(), true).unwrap();
        arbiter.notify_ended(a.id());
        assert_eq!(arbiter.current(), None);

        arbiter.register(a.clone(), true).unwrap();
        arbiter.pause_all();
        assert!(!a.is_playing());
        assert_eq!(arbiter.current(), None);
        assert_eq!(arbiter.len(), 1);
    }
}
