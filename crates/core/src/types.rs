use serde::{Deserialize, Serialize};

/// A lesson as listed by the backend or the demo catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Lesson {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// First non-empty of description, summary and title.
    pub fn narrative_text(&self) -> &str {
        [self.description.as_deref(), self.summary.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| self.title.trim())
    }
}

/// Asset URLs discovered for one lesson. `None` means the asset is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMediaSet {
    pub slug: String,
    pub video_url: Option<String>,
    pub poster_url: Option<String>,
    pub captions_vtt_url: Option<String>,
    pub audio_url: Option<String>,
    pub ssml_url: Option<String>,
    pub text_url: Option<String>,
    pub captions_json_url: Option<String>,
}

impl ResolvedMediaSet {
    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_url.is_some()
    }

    pub fn has_any_audio_asset(&self) -> bool {
        self.audio_url.is_some()
            || self.ssml_url.is_some()
            || self.text_url.is_some()
            || self.captions_json_url.is_some()
    }
}

/// A timed caption fragment, offsets in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// The kinds of optional asset a lesson can have on the static file server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Video,
    Poster,
    CaptionsVtt,
    Audio,
    Ssml,
    Text,
    CaptionsJson,
}

impl AssetKind {
    pub const ALL: [AssetKind; 7] = [
        AssetKind::Video,
        AssetKind::Poster,
        AssetKind::CaptionsVtt,
        AssetKind::Audio,
        AssetKind::Ssml,
        AssetKind::Text,
        AssetKind::CaptionsJson,
    ];

    /// Path templates tried per slug, in order. `{slug}` is substituted.
    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Video => &["/assets/video/mp4/{slug}.mp4"],
            AssetKind::Poster => &[
                "/assets/video/thumb/{slug}.jpg",
                "/assets/video/thumb/{slug}.png",
            ],
            AssetKind::CaptionsVtt => &["/assets/captions/{slug}.vtt"],
            AssetKind::Audio => &["/assets/audio/mp3/{slug}.mp3"],
            AssetKind::Ssml => &["/assets/audio/ssml/{slug}.ssml"],
            AssetKind::Text => &["/assets/audio/text/{slug}.txt"],
            AssetKind::CaptionsJson => &["/assets/audio/captions/{slug}.captions.json"],
        }
    }

    /// Large media gets a ranged GET between HEAD and a full GET.
    pub fn is_large_media(&self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Audio)
    }

    /// Content-type prefixes accepted under strict probing.
    pub fn expected_content_types(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Video => &["video/"],
            AssetKind::Poster => &["image/"],
            AssetKind::CaptionsVtt => &["text/vtt"],
            AssetKind::Audio => &["audio/"],
            AssetKind::Ssml => &["application/ssml+xml", "application/xml", "text/"],
            AssetKind::Text => &["text/plain"],
            AssetKind::CaptionsJson => &["application/json", "text/json"],
        }
    }

    pub fn candidate_urls<S: AsRef<str>>(&self, slugs: &[S]) -> Vec<String> {
        slugs
            .iter()
            .flat_map(|slug| {
                self.templates()
                    .iter()
                    .map(move |t| t.replace("{slug}", slug.as_ref()))
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Poster => "poster",
            AssetKind::CaptionsVtt => "captions-vtt",
            AssetKind::Audio => "audio",
            AssetKind::Ssml => "ssml",
            AssetKind::Text => "text",
            AssetKind::CaptionsJson => "captions-json",
        }
    }
}
