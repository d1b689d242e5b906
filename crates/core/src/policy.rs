//! Per-card playback state machine.
//!
//! `Idle -> Resolving -> Ready -> {Playing, Paused} -> (Error -> Degraded)`.
//! Hosts drive it with visibility changes, media signals and user toggles;
//! it drives the media elements, the arbiter and the outbound events.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    arbiter::PlaybackArbiter,
    captions::{CaptionFetchFailure, CaptionLoader, CaptionSynchronizer, CaptionTier, CaptionTrack},
    events::{EventBus, EventHeader, LessonWatched, NoticeKind, PlaybackNotice, PlaybackStatus},
    media::{MediaElement, MediaElementFactory, MediaKind, MediaSignal, PlaybackRejection, RejectionKind},
    resolver::MediaResolver,
    settings::PlaybackSettings,
    types::{Lesson, ResolvedMediaSet},
};

/// Lessons without a usable duration are treated as this long.
pub const DEFAULT_LESSON_SECONDS: f64 = 45.0;
/// The watched event never waits longer than this.
pub const WATCHED_CAP_SECONDS: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Resolving,
    Ready,
    Playing,
    Paused,
    Error,
    Degraded,
}

/// What the card presents, widest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationTier {
    Video,
    AudioWithCaptions,
    CaptionsOnly,
    Placeholder,
}

impl PresentationTier {
    /// The widest tier the remaining assets support.
    pub fn choose(available: &Availability) -> Self {
        let strategies: [(PresentationTier, bool); 3] = [
            (PresentationTier::Video, available.video),
            (PresentationTier::AudioWithCaptions, available.audio),
            (PresentationTier::CaptionsOnly, available.captions),
        ];
        strategies
            .into_iter()
            .find_map(|(tier, ok)| ok.then_some(tier))
            .unwrap_or(PresentationTier::Placeholder)
    }
}

/// Which presentation inputs are still usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Availability {
    pub video: bool,
    pub audio: bool,
    pub captions: bool,
}

/// Fires once when the clock first reaches the threshold.
#[derive(Debug, Clone)]
pub struct WatchedLatch {
    threshold: f64,
    fired: bool,
}

impl WatchedLatch {
    pub fn for_duration(duration_seconds: Option<f64>) -> Self {
        let duration = duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(DEFAULT_LESSON_SECONDS);
        Self {
            threshold: duration.min(WATCHED_CAP_SECONDS),
            fired: false,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// True exactly once, on the first observation at or past the threshold.
    pub fn observe(&mut self, t: f64) -> bool {
        if self.fired || t < self.threshold {
            return false;
        }
        self.fired = true;
        true
    }
}

/// Identifies one resolution run. Results from a stale ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: u64,
}

/// Everything a card needs once resolution settles.
pub struct PreparedMedia {
    pub media: Arc<ResolvedMediaSet>,
    pub track: CaptionTrack,
    pub failures: Vec<CaptionFetchFailure>,
}

/// Resolve media and load captions for `lesson`. Never fails; missing
/// assets come back as `None` and caption fetch failures are listed.
pub async fn prepare(resolver: &MediaResolver, lesson: &Lesson) -> PreparedMedia {
    let media = resolver.resolve(lesson).await;
    let fetcher = resolver.prober().fetcher();
    let (track, failures) = CaptionLoader::new(fetcher.as_ref()).load(lesson, &media).await;
    PreparedMedia {
        media,
        track,
        failures,
    }
}

pub struct PlaybackPolicy {
    lesson: Lesson,
    settings: PlaybackSettings,
    arbiter: Arc<PlaybackArbiter>,
    bus: EventBus,

    state: PlaybackState,
    tier: PresentationTier,
    generation: u64,
    active: bool,
    degraded: bool,
    blocked_by_policy: bool,
    audio_muted: bool,

    media: Option<Arc<ResolvedMediaSet>>,
    video: Option<Arc<dyn MediaElement>>,
    audio: Option<Arc<dyn MediaElement>>,
    video_failed: bool,
    audio_failed: bool,

    captions: CaptionSynchronizer,
    watched: WatchedLatch,
    clock: f64,
}

impl PlaybackPolicy {
    pub fn new(
        lesson: Lesson,
        settings: PlaybackSettings,
        arbiter: Arc<PlaybackArbiter>,
        bus: EventBus,
    ) -> Self {
        let watched = WatchedLatch::for_duration(lesson.duration_seconds);
        Self {
            lesson,
            settings,
            arbiter,
            bus,
            state: PlaybackState::Idle,
            tier: PresentationTier::Placeholder,
            generation: 0,
            active: false,
            degraded: false,
            blocked_by_policy: false,
            audio_muted: settings.muted_by_default,
            media: None,
            video: None,
            audio: None,
            video_failed: false,
            audio_failed: false,
            captions: CaptionSynchronizer::new(CaptionTrack::none()),
            watched,
            clock: 0.0,
        }
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn tier(&self) -> PresentationTier {
        self.tier
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn media(&self) -> Option<&Arc<ResolvedMediaSet>> {
        self.media.as_ref()
    }

    pub fn video(&self) -> Option<&Arc<dyn MediaElement>> {
        self.video.as_ref()
    }

    pub fn audio(&self) -> Option<&Arc<dyn MediaElement>> {
        self.audio.as_ref()
    }

    pub fn caption_tier(&self) -> CaptionTier {
        self.captions.track().tier
    }

    /// Caption to display now; empty when captions are switched off.
    pub fn caption(&self) -> &str {
        if self.settings.captions_on {
            self.captions.current()
        } else {
            ""
        }
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn audio_muted(&self) -> bool {
        self.audio_muted
    }

    pub fn watched(&self) -> bool {
        self.watched.has_fired()
    }

    pub fn watched_threshold(&self) -> f64 {
        self.watched.threshold()
    }

    pub fn is_blocked_by_policy(&self) -> bool {
        self.blocked_by_policy
    }

    /// Start a resolution run. Any earlier run is cancelled.
    pub fn begin_resolution(&mut self) -> ResolutionTicket {
        self.generation += 1;
        self.set_state(PlaybackState::Resolving);
        ResolutionTicket {
            generation: self.generation,
        }
    }

    /// Commit a finished resolution. Returns false, changing nothing, when
    /// the ticket was superseded or the card was disposed meanwhile.
    pub fn complete_resolution(
        &mut self,
        ticket: ResolutionTicket,
        prepared: PreparedMedia,
        factory: &dyn MediaElementFactory,
    ) -> bool {
        if ticket.generation != self.generation || self.state != PlaybackState::Resolving {
            debug!(lesson_id = %self.lesson.id, "Discarding stale resolution result");
            return false;
        }

        self.release_elements();
        let PreparedMedia {
            media,
            track,
            failures,
        } = prepared;

        if !failures.is_empty() {
            self.notify(NoticeKind::Warning, "Captions failed to load");
        }

        self.video = media
            .video_url
            .as_deref()
            .map(|url| factory.create(MediaKind::Video, url));
        self.audio = media
            .audio_url
            .as_deref()
            .filter(|_| self.settings.audio_on)
            .map(|url| factory.create(MediaKind::Audio, url));

        if let Some(video) = &self.video {
            video.set_muted(true);
        }
        if let Some(audio) = &self.audio {
            audio.set_muted(self.audio_muted);
            // registered on mount; played only once the card is active
            let _ = self.arbiter.register(Arc::clone(audio), false);
        }

        self.media = Some(media);
        self.captions.replace_track(track);
        self.video_failed = false;
        self.audio_failed = false;
        self.degraded = false;
        self.tier = PresentationTier::choose(&self.availability());
        if self.tier == PresentationTier::Placeholder {
            self.notify(NoticeKind::Info, "Waiting for media");
        }

        self.set_state(PlaybackState::Ready);
        if self.active {
            self.start();
        }
        true
    }

    /// Resolve, load captions and commit in one go.
    pub async fn mount(&mut self, resolver: &MediaResolver, factory: &dyn MediaElementFactory) {
        let ticket = self.begin_resolution();
        let prepared = prepare(resolver, &self.lesson).await;
        self.complete_resolution(ticket, prepared, factory);
    }

    /// The card became (or stopped being) the most visible one.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if active {
            if self.is_settled() {
                self.start();
            }
        } else {
            self.stop();
        }
    }

    fn is_settled(&self) -> bool {
        !matches!(self.state, PlaybackState::Idle | PlaybackState::Resolving)
    }

    fn start(&mut self) {
        if self.tier == PresentationTier::Video {
            if let Some(video) = self.video.clone() {
                video.set_muted(true);
                if let Err(rejection) = video.play() {
                    self.on_rejection(MediaKind::Video, rejection);
                }
            }
        }

        if let Some(audio) = self.audio.clone() {
            if self.settings.audio_autoplay() && !self.audio_failed {
                audio.set_muted(self.audio_muted);
                if let Err(rejection) = self.arbiter.register(Arc::clone(&audio), true) {
                    self.on_rejection(MediaKind::Audio, rejection);
                }
            }
        }

        self.settle_running_state();
    }

    fn stop(&mut self) {
        if let Some(video) = &self.video {
            video.pause();
        }
        if let Some(audio) = &self.audio {
            audio.pause();
        }
        if self.is_settled() {
            self.set_state(PlaybackState::Paused);
        }
    }

    fn settle_running_state(&mut self) {
        if !self.active || self.tier == PresentationTier::Placeholder {
            return;
        }
        let next = if self.degraded || self.clock_source().is_none() {
            PlaybackState::Degraded
        } else {
            PlaybackState::Playing
        };
        self.set_state(next);
    }

    /// Feed a signal from one of this card's elements. Returns the new
    /// caption text when it changed.
    pub fn on_signal(&mut self, kind: MediaKind, signal: MediaSignal) -> Option<String> {
        match signal {
            MediaSignal::Tick(t) => {
                if kind == self.clock_source()? {
                    return self.advance_clock_to(t);
                }
                None
            }
            MediaSignal::Started => {
                if kind == MediaKind::Audio {
                    if let Some(audio) = &self.audio {
                        self.arbiter.notify_started(audio.id());
                    }
                    if self.blocked_by_policy {
                        self.blocked_by_policy = false;
                        self.degraded = self.video_failed;
                    }
                    self.settle_running_state();
                }
                None
            }
            MediaSignal::Ended => {
                if let (MediaKind::Audio, Some(audio)) = (kind, &self.audio) {
                    self.arbiter.notify_ended(audio.id());
                }
                None
            }
            MediaSignal::CanPlay => {
                debug!(lesson_id = %self.lesson.id, ?kind, "Media can play");
                None
            }
            MediaSignal::Error(message) => {
                self.on_rejection(kind, PlaybackRejection::new(message));
                self.settle_running_state();
                None
            }
        }
    }

    /// Running element whose clock drives captions and the watched latch:
    /// video when it is presented, else audio. `None` while nothing plays.
    fn clock_source(&self) -> Option<MediaKind> {
        let playing = |e: &Option<Arc<dyn MediaElement>>| e.as_ref().is_some_and(|e| e.is_playing());
        if self.tier == PresentationTier::Video && playing(&self.video) {
            Some(MediaKind::Video)
        } else if !self.audio_failed && !self.blocked_by_policy && playing(&self.audio) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    /// Advance the caption clock when no element is running: the
    /// captions-only tier, audio refused by the autoplay policy, or audio
    /// left paused with autoplay off.
    pub fn advance_unattended(&mut self, seconds: f64) -> Option<String> {
        if self.clock_source().is_some() || !self.active {
            return None;
        }
        self.advance_clock_to(self.clock + seconds)
    }

    fn advance_clock_to(&mut self, t: f64) -> Option<String> {
        self.clock = t;
        if self.watched.observe(t) {
            info!(lesson_id = %self.lesson.id, at = t, "Lesson watched");
            self.bus.publish(Arc::new(LessonWatched::new(
                self.lesson.id.clone(),
                t,
                self.watched.threshold(),
            )));
        }
        let changed = self.captions.on_tick(t).map(str::to_string)?;
        self.publish_status();
        self.settings.captions_on.then_some(changed)
    }

    fn on_rejection(&mut self, kind: MediaKind, rejection: PlaybackRejection) {
        let category = rejection.kind();
        info!(
            lesson_id = %self.lesson.id,
            ?kind,
            ?category,
            message = %rejection.message,
            "Playback rejected"
        );
        self.set_state(PlaybackState::Error);

        match category {
            RejectionKind::PolicyBlocked => {
                self.blocked_by_policy = true;
                let message = match kind {
                    MediaKind::Audio => "Tap to enable sound",
                    MediaKind::Video => "Tap to play",
                };
                self.notify(NoticeKind::Action, message);
            }
            RejectionKind::LoadFailure => {
                match kind {
                    MediaKind::Video => self.video_failed = true,
                    MediaKind::Audio => self.audio_failed = true,
                }
                if let Some(element) = self.element(kind) {
                    element.pause();
                }
                let previous = self.tier;
                self.tier = PresentationTier::choose(&self.availability());
                let message = match self.tier {
                    PresentationTier::Video => "Audio unavailable, playing video",
                    PresentationTier::AudioWithCaptions => {
                        "Video unavailable, playing audio with captions"
                    }
                    PresentationTier::CaptionsOnly => "Media unavailable, showing captions only",
                    PresentationTier::Placeholder => "Media unavailable",
                };
                warn!(lesson_id = %self.lesson.id, ?previous, tier = ?self.tier, "Presentation downgraded");
                self.notify(NoticeKind::Error, message);
            }
        }

        self.degraded = true;
        self.set_state(PlaybackState::Degraded);
    }

    /// User flipped the sound toggle. Unmuting counts as a gesture, so a
    /// policy-blocked card retries playback. Returns the new muted flag.
    pub fn toggle_mute(&mut self) -> bool {
        self.audio_muted = !self.audio_muted;
        let Some(audio) = self.audio.clone() else {
            if let Some(video) = &self.video {
                video.set_muted(self.audio_muted);
            }
            self.publish_status();
            return self.audio_muted;
        };

        audio.set_muted(self.audio_muted);
        let retry = !self.audio_muted
            && self.active
            && !self.audio_failed
            && (self.blocked_by_policy || !audio.is_playing());
        if retry {
            match self.arbiter.register(Arc::clone(&audio), true) {
                Ok(()) => {
                    self.blocked_by_policy = false;
                    self.degraded = self.video_failed;
                    self.settle_running_state();
                }
                Err(rejection) => self.on_rejection(MediaKind::Audio, rejection),
            }
        }
        self.publish_status();
        self.audio_muted
    }

    /// Tear down: cancel in-flight resolution, leave the arbiter, stop media.
    pub fn dispose(&mut self) {
        self.generation += 1;
        self.active = false;
        self.release_elements();
        self.set_state(PlaybackState::Idle);
    }

    fn release_elements(&mut self) {
        if let Some(audio) = self.audio.take() {
            audio.pause();
            self.arbiter.unregister(audio.id());
        }
        if let Some(video) = self.video.take() {
            video.pause();
        }
    }

    fn element(&self, kind: MediaKind) -> Option<&Arc<dyn MediaElement>> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
        }
    }

    fn availability(&self) -> Availability {
        Availability {
            video: self.video.is_some() && !self.video_failed,
            audio: self.audio.is_some() && !self.audio_failed,
            captions: self.settings.captions_on && !self.captions.track().is_empty(),
        }
    }

    fn set_state(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        debug!(lesson_id = %self.lesson.id, from = ?self.state, to = ?next, "Playback state");
        self.state = next;
        self.publish_status();
    }

    fn notify(&self, kind: NoticeKind, message: &str) {
        self.bus
            .publish(Arc::new(PlaybackNotice::new(self.lesson.id.clone(), kind, message)));
    }

    fn publish_status(&self) {
        self.bus.publish(Arc::new(PlaybackStatus {
            header: EventHeader::new(),
            lesson_id: self.lesson.id.clone(),
            state: self.state,
            tier: self.tier,
            caption_tier: self.caption_tier(),
            caption: self.caption().to_string(),
            audio_muted: self.audio_muted,
            clock_seconds: self.clock,
        }));
    }
}

impl Drop for PlaybackPolicy {
    fn drop(&mut self) {
        self.release_elements();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        media::SimulatedFactory,
        types::Cue,
    };

    fn prepared(media: ResolvedMediaSet, cues: Vec<Cue>) -> PreparedMedia {
        PreparedMedia {
            media: Arc::new(media),
            track: if cues.is_empty() {
                CaptionTrack::none()
            } else {
                CaptionTrack::structured(cues)
            },
            failures: Vec::new(),
        }
    }

    fn full_media() -> ResolvedMediaSet {
        ResolvedMediaSet {
            slug: "quick-inbox-zero".into(),
            video_url: Some("/v.mp4".into()),
            audio_url: Some("/a.mp3".into()),
            ..Default::default()
        }
    }

    fn policy(arbiter: &Arc<PlaybackArbiter>, settings: PlaybackSettings) -> PlaybackPolicy {
        PlaybackPolicy::new(
            Lesson::new("inbox-zero", "Inbox Zero in Minutes").with_duration(100.0),
            settings,
            Arc::clone(arbiter),
            EventBus::detached(),
        )
    }

    fn ready(
        arbiter: &Arc<PlaybackArbiter>,
        factory: &SimulatedFactory,
        media: ResolvedMediaSet,
        settings: PlaybackSettings,
    ) -> PlaybackPolicy {
        let mut p = policy(arbiter, settings);
        let ticket = p.begin_resolution();
        assert!(p.complete_resolution(ticket, prepared(media, vec![Cue::new(0.0, 3.0, "a")]), factory));
        p
    }

    #[test]
    fn watched_threshold_caps_at_twenty_and_defaults_short_lessons() {
        assert_eq!(WatchedLatch::for_duration(Some(100.0)).threshold(), 20.0);
        assert_eq!(WatchedLatch::for_duration(Some(12.0)).threshold(), 12.0);
        assert_eq!(WatchedLatch::for_duration(None).threshold(), 20.0);
        assert_eq!(WatchedLatch::for_duration(Some(0.0)).threshold(), 20.0);
    }

    #[test]
    fn latch_fires_once_per_mount() {
        let mut latch = WatchedLatch::for_duration(Some(100.0));
        assert!(!latch.observe(19.9));
        assert!(latch.observe(20.0));
        assert!(!latch.observe(0.0));
        assert!(!latch.observe(25.0));
    }

    #[test]
    fn tier_choice_prefers_widest() {
        let all = Availability { video: true, audio: true, captions: true };
        assert_eq!(PresentationTier::choose(&all), PresentationTier::Video);
        let no_video = Availability { video: false, ..all };
        assert_eq!(PresentationTier::choose(&no_video), PresentationTier::AudioWithCaptions);
        let captions = Availability { captions: true, ..Default::default() };
        assert_eq!(PresentationTier::choose(&captions), PresentationTier::CaptionsOnly);
        assert_eq!(PresentationTier::choose(&Availability::default()), PresentationTier::Placeholder);
    }

    #[test]
    fn activation_plays_muted_video_and_arbitrated_audio() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = ready(&arbiter, &factory, full_media(), PlaybackSettings::default());
        assert_eq!(p.state(), PlaybackState::Ready);
        assert_eq!(arbiter.len(), 1);

        p.set_active(true);
        assert_eq!(p.state(), PlaybackState::Playing);
        let video = factory.find("/v.mp4").unwrap();
        let audio = factory.find("/a.mp3").unwrap();
        assert!(video.is_playing() && video.is_muted());
        assert!(audio.is_playing());
        assert_eq!(arbiter.current(), Some(audio.id()));

        p.set_active(false);
        assert_eq!(p.state(), PlaybackState::Paused);
        assert!(!video.is_playing() && !audio.is_playing());
    }

    #[test]
    fn audio_autoplay_respects_settings() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let settings = PlaybackSettings {
            autoplay_on: false,
            ..Default::default()
        };
        let mut p = ready(&arbiter, &factory, full_media(), settings);
        p.set_active(true);
        assert!(!factory.find("/a.mp3").unwrap().is_playing());
        assert!(factory.find("/v.mp4").unwrap().is_playing());
    }

    #[test]
    fn activation_during_resolution_starts_once_ready() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = policy(&arbiter, PlaybackSettings::default());
        let ticket = p.begin_resolution();
        p.set_active(true);
        assert_eq!(p.state(), PlaybackState::Resolving);

        p.complete_resolution(ticket, prepared(full_media(), vec![]), &factory);
        assert_eq!(p.state(), PlaybackState::Playing);
    }

    #[test]
    fn stale_and_disposed_resolutions_are_ignored() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = policy(&arbiter, PlaybackSettings::default());

        let first = p.begin_resolution();
        let second = p.begin_resolution();
        assert!(!p.complete_resolution(first, prepared(full_media(), vec![]), &factory));
        assert!(factory.created().is_empty());

        p.dispose();
        assert!(!p.complete_resolution(second, prepared(full_media(), vec![]), &factory));
        assert_eq!(p.state(), PlaybackState::Idle);
        assert!(arbiter.is_empty());
    }

    #[test]
    fn dispose_unregisters_audio() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = ready(&arbiter, &factory, full_media(), PlaybackSettings::default());
        p.set_active(true);
        p.dispose();
        assert!(arbiter.is_empty());
        assert!(!factory.find("/a.mp3").unwrap().is_playing());
    }

    #[test]
    fn clock_prefers_video_and_latches_watched() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = ready(&arbiter, &factory, full_media(), PlaybackSettings::default());
        p.set_active(true);

        assert_eq!(p.on_signal(MediaKind::Video, MediaSignal::Tick(1.0)).as_deref(), Some("a"));
        assert_eq!(p.on_signal(MediaKind::Audio, MediaSignal::Tick(25.0)), None);
        assert!(!p.watched());

        p.on_signal(MediaKind::Video, MediaSignal::Tick(20.5));
        assert!(p.watched());
        assert_eq!(p.caption(), "");
    }

    #[test]
    fn policy_blocked_audio_asks_for_a_tap_then_recovers_on_unmute() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new().with_gesture_policy();
        let settings = PlaybackSettings {
            muted_by_default: false,
            ..Default::default()
        };
        let mut p = ready(&arbiter, &factory, full_media(), settings);
        p.set_active(true);
        assert!(p.is_blocked_by_policy());
        assert_eq!(p.state(), PlaybackState::Degraded);
        assert_eq!(p.tier(), PresentationTier::Video);

        let audio = factory.find("/a.mp3").unwrap();
        assert!(p.toggle_mute(), "first toggle mutes");
        audio.register_gesture();
        assert!(!p.toggle_mute());
        assert!(audio.is_playing());
        assert!(!p.is_blocked_by_policy());
        assert_eq!(p.state(), PlaybackState::Playing);
    }

    fn audio_only(url: &str) -> ResolvedMediaSet {
        ResolvedMediaSet {
            slug: "quick-inbox-zero".into(),
            audio_url: Some(url.into()),
            ..Default::default()
        }
    }

    #[test]
    fn refused_audio_only_card_keeps_captions_moving() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new().with_gesture_policy();
        let settings = PlaybackSettings {
            muted_by_default: false,
            ..Default::default()
        };
        let mut p = ready(&arbiter, &factory, audio_only("/a.mp3"), settings);
        p.set_active(true);
        assert!(p.is_blocked_by_policy());
        assert_eq!(p.tier(), PresentationTier::AudioWithCaptions);
        assert_eq!(p.state(), PlaybackState::Degraded);
        assert!(!factory.find("/a.mp3").unwrap().is_playing());

        assert_eq!(p.advance_unattended(1.0).as_deref(), Some("a"));
        for _ in 0..20 {
            p.advance_unattended(1.0);
        }
        assert!(p.watched());
    }

    #[test]
    fn paused_audio_with_autoplay_off_is_not_reported_playing() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let settings = PlaybackSettings {
            autoplay_on: false,
            ..Default::default()
        };
        let mut p = ready(&arbiter, &factory, audio_only("/a.mp3"), settings);
        p.set_active(true);
        let audio = factory.find("/a.mp3").unwrap();
        assert!(!audio.is_playing());
        assert_eq!(p.state(), PlaybackState::Degraded);
        assert_eq!(p.advance_unattended(1.0).as_deref(), Some("a"));

        // the user starts the audio from its own controls
        audio.play().unwrap();
        p.on_signal(MediaKind::Audio, MediaSignal::Started);
        assert_eq!(p.state(), PlaybackState::Playing);
        assert_eq!(p.advance_unattended(1.0), None);
        assert_eq!(p.on_signal(MediaKind::Audio, MediaSignal::Tick(4.0)).as_deref(), Some(""));
    }

    #[test]
    fn dropping_a_card_silences_its_audio() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut first = ready(&arbiter, &factory, audio_only("/a.mp3"), PlaybackSettings::default());
        first.set_active(true);
        let a = factory.find("/a.mp3").unwrap();
        assert!(a.is_playing());

        drop(first);
        assert!(!a.is_playing());
        assert!(arbiter.is_empty());

        let mut second = ready(&arbiter, &factory, audio_only("/b.mp3"), PlaybackSettings::default());
        second.set_active(true);
        let playing: Vec<_> = factory.created().into_iter().filter(|e| e.is_playing()).collect();
        assert_eq!(playing.len(), 1);
        assert_eq!(playing[0].id(), factory.find("/b.mp3").unwrap().id());
        assert!(arbiter.exclusivity_holds());
    }

    #[test]
    fn video_error_downgrades_to_audio_then_captions() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = ready(&arbiter, &factory, full_media(), PlaybackSettings::default());
        p.set_active(true);

        p.on_signal(MediaKind::Video, MediaSignal::Error("MEDIA_ERR_DECODE".into()));
        assert_eq!(p.tier(), PresentationTier::AudioWithCaptions);
        assert_eq!(p.state(), PlaybackState::Degraded);
        assert_eq!(p.on_signal(MediaKind::Audio, MediaSignal::Tick(1.0)).as_deref(), Some("a"));

        p.on_signal(MediaKind::Audio, MediaSignal::Error("network".into()));
        assert_eq!(p.tier(), PresentationTier::CaptionsOnly);
        assert!(!factory.find("/a.mp3").unwrap().is_playing());
        assert_eq!(p.advance_unattended(4.0).as_deref(), Some(""));
    }

    #[test]
    fn nothing_available_is_a_placeholder() {
        let arbiter = PlaybackArbiter::new();
        let factory = SimulatedFactory::new();
        let mut p = policy(&arbiter, PlaybackSettings::default());
        let ticket = p.begin_resolution();
        p.complete_resolution(ticket, prepared(ResolvedMediaSet::default(), vec![]), &factory);
        assert_eq!(p.tier(), PresentationTier::Placeholder);
        p.set_active(true);
        assert_eq!(p.state(), PlaybackState::Ready);
    }
}
