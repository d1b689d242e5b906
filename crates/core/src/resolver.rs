//! Lesson to asset resolution: slug candidates, parallel per-kind probing
//! and a per-lesson cache that also de-duplicates in-flight resolutions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{
    config::RuntimeConfig,
    probe::AssetProber,
    slug::{AliasTable, SlugResolver},
    types::{AssetKind, Lesson, ResolvedMediaSet},
};

const LEGACY_AUDIO_IDS: [&str; 7] = [
    "focus-60",
    "inbox-zero",
    "clear-ask",
    "two-minute-rule",
    "feedback-fast",
    "atomic-habit",
    "async-standup",
];

/// Lesson ids whose audio and captions were published under the id itself,
/// before title based slugs existed.
#[derive(Debug, Clone)]
pub struct LegacyAudioIndex {
    ids: Vec<String>,
}

impl Default for LegacyAudioIndex {
    fn default() -> Self {
        Self {
            ids: LEGACY_AUDIO_IDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LegacyAudioIndex {
    pub fn empty() -> Self {
        Self { ids: Vec::new() }
    }

    fn known(&self, id: &str) -> Option<&str> {
        self.ids.iter().find(|known| *known == id).map(String::as_str)
    }

    pub fn audio_url(&self, id: &str) -> Option<String> {
        self.known(id).map(|id| format!("/assets/audio/mp3/{id}.mp3"))
    }

    pub fn captions_url(&self, id: &str) -> Option<String> {
        self.known(id)
            .map(|id| format!("/assets/audio/captions/{id}.captions.json"))
    }
}

/// Per-lesson results plus in-flight de-duplication. Lives for the session.
#[derive(Default)]
struct ResolutionCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Arc<ResolvedMediaSet>>>>>,
}

impl ResolutionCache {
    fn cell(&self, lesson_id: &str) -> Arc<OnceCell<Arc<ResolvedMediaSet>>> {
        let mut cells = self.cells.lock().expect("ResolutionCache poisoned");
        Arc::clone(cells.entry(lesson_id.to_string()).or_default())
    }

    fn peek(&self, lesson_id: &str) -> Option<Arc<ResolvedMediaSet>> {
        self.cells
            .lock()
            .expect("ResolutionCache poisoned")
            .get(lesson_id)
            .and_then(|cell| cell.get().cloned())
    }

    fn clear(&self) {
        self.cells.lock().expect("ResolutionCache poisoned").clear();
    }
}

pub struct MediaResolver {
    prober: AssetProber,
    video_slugs: SlugResolver,
    audio_slugs: SlugResolver,
    legacy: LegacyAudioIndex,
    cache: ResolutionCache,
}

impl MediaResolver {
    pub fn new(prober: AssetProber, video_aliases: AliasTable, audio_aliases: AliasTable) -> Self {
        Self {
            prober,
            video_slugs: SlugResolver::new(video_aliases),
            audio_slugs: SlugResolver::new(audio_aliases),
            legacy: LegacyAudioIndex::default(),
            cache: ResolutionCache::default(),
        }
    }

    /// Resolver using the alias tables (defaults plus overrides) from `config`.
    pub fn from_config(prober: AssetProber, config: &RuntimeConfig) -> Self {
        Self::new(
            prober,
            config.video_aliases.clone(),
            config.audio_aliases.clone(),
        )
    }

    pub fn with_legacy_index(mut self, legacy: LegacyAudioIndex) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn prober(&self) -> &AssetProber {
        &self.prober
    }

    pub fn video_slugs(&self) -> &SlugResolver {
        &self.video_slugs
    }

    pub fn audio_slugs(&self) -> &SlugResolver {
        &self.audio_slugs
    }

    /// Resolve with caching by lesson id. Concurrent calls for the same id
    /// share a single probe sequence.
    pub async fn resolve(&self, lesson: &Lesson) -> Arc<ResolvedMediaSet> {
        let cell = self.cache.cell(&lesson.id);
        cell.get_or_init(|| async { Arc::new(self.resolve_uncached(lesson).await) })
            .await
            .clone()
    }

    pub fn cached(&self, lesson_id: &str) -> Option<Arc<ResolvedMediaSet>> {
        self.cache.peek(lesson_id)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Probe every asset kind for `lesson`, bypassing the cache.
    pub async fn resolve_uncached(&self, lesson: &Lesson) -> ResolvedMediaSet {
        let video_candidates = self.video_slugs.candidates(lesson);
        let audio_candidates = self.audio_slugs.candidates(lesson);

        let mut audio_urls = AssetKind::Audio.candidate_urls(&audio_candidates);
        let mut captions_json_urls = AssetKind::CaptionsJson.candidate_urls(&audio_candidates);
        if let Some(legacy) = self.legacy.audio_url(&lesson.id) {
            audio_urls.retain(|u| *u != legacy);
            audio_urls.insert(0, legacy);
        }
        if let Some(legacy) = self.legacy.captions_url(&lesson.id) {
            captions_json_urls.retain(|u| *u != legacy);
            captions_json_urls.insert(0, legacy);
        }

        debug!(
            lesson_id = %lesson.id,
            title = %lesson.title,
            video_slugs = ?video_candidates,
            audio_slugs = ?audio_candidates,
            "Probing asset candidates"
        );

        let video = self.optional_probe(
            lesson.video_url.clone(),
            AssetKind::Video,
            AssetKind::Video.candidate_urls(&video_candidates),
        );
        let poster = self.optional_probe(
            lesson.thumbnail.clone(),
            AssetKind::Poster,
            AssetKind::Poster.candidate_urls(&video_candidates),
        );
        let vtt = self.probe(
            AssetKind::CaptionsVtt,
            AssetKind::CaptionsVtt.candidate_urls(&video_candidates),
        );
        let audio = self.probe(AssetKind::Audio, audio_urls);
        let ssml = self.probe(AssetKind::Ssml, AssetKind::Ssml.candidate_urls(&audio_candidates));
        let text = self.probe(AssetKind::Text, AssetKind::Text.candidate_urls(&audio_candidates));
        let captions_json = self.probe(AssetKind::CaptionsJson, captions_json_urls);

        let (video_url, poster_url, captions_vtt_url, audio_url, ssml_url, text_url, captions_json_url) =
            tokio::join!(video, poster, vtt, audio, ssml, text, captions_json);

        let set = ResolvedMediaSet {
            slug: self.video_slugs.primary_slug(lesson),
            video_url,
            poster_url,
            captions_vtt_url,
            audio_url,
            ssml_url,
            text_url,
            captions_json_url,
        };

        if !set.has_video() {
            info!(lesson_id = %lesson.id, slug = %set.slug, "No video found; audio and captions take over");
        }
        if !set.has_any_audio_asset() {
            info!(lesson_id = %lesson.id, slug = %set.slug, "No audio assets found");
        }
        debug!(lesson_id = %lesson.id, resolved = ?set, "Resolved lesson media");

        set
    }

    async fn probe(&self, kind: AssetKind, urls: Vec<String>) -> Option<String> {
        self.prober.probe_first(kind, &urls).await
    }

    async fn optional_probe(
        &self,
        supplied: Option<String>,
        kind: AssetKind,
        urls: Vec<String>,
    ) -> Option<String> {
        match supplied.filter(|u| !u.trim().is_empty()) {
            Some(url) => Some(url),
            None => self.probe(kind, urls).await,
        }
    }
}
