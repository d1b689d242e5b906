//! Caption cues: parsing, fallback synthesis and clock synchronization.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{MediaError, Result},
    fetch::AssetFetcher,
    types::{Cue, Lesson, ResolvedMediaSet},
};

/// Spacing between synthesized cues, in seconds.
pub const WINDOW_SECONDS: f64 = 3.0;
/// How long a synthesized cue stays on screen.
pub const DWELL_SECONDS: f64 = 2.8;
/// Lesson text fallback keeps at most this many sentences.
pub const MAX_LESSON_TEXT_LINES: usize = 8;

/// Text of the first cue (in list order) whose span contains `t`, or "".
///
/// Overlapping cues are not ranked; list order decides.
pub fn active_cue(cues: &[Cue], t: f64) -> &str {
    cues.iter()
        .find(|cue| cue.contains(t))
        .map(|cue| cue.text.as_str())
        .unwrap_or("")
}

/// Lay lines out as back-to-back fixed windows starting at zero.
pub fn windowed_cues<I, S>(lines: I) -> Vec<Cue>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let start = i as f64 * WINDOW_SECONDS;
            Cue::new(start, start + DWELL_SECONDS, line)
        })
        .collect()
}

/// Non-empty trimmed lines of a plain-text transcript.
pub fn transcript_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sentences of the lesson's description, summary or title.
pub fn lesson_text_lines(lesson: &Lesson) -> Vec<String> {
    lesson
        .narrative_text()
        .split(['.', '?', '!'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_LESSON_TEXT_LINES)
        .map(str::to_string)
        .collect()
}

/// Remove markup tags, leaving the spoken text.
pub fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn parse_timestamp(raw: &str, line: usize) -> Result<f64> {
    let malformed = || MediaError::MalformedCaptions {
        line,
        reason: format!("bad timestamp '{raw}'"),
    };
    let (clock, fraction) = raw.split_once(['.', ',']).unwrap_or((raw, "0"));
    let parts: Vec<&str> = clock.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(malformed());
    }
    let mut seconds = 0.0;
    for part in &parts {
        let value: u32 = part.trim().parse().map_err(|_| malformed())?;
        seconds = seconds * 60.0 + f64::from(value);
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let fraction: f64 = format!("0.{fraction}").parse().map_err(|_| malformed())?;
    Ok(seconds + fraction)
}

/// Parse a WebVTT document.
pub fn parse_vtt(input: &str) -> Result<Vec<Cue>> {
    let mut cues = Vec::new();
    let mut lines = input.lines().enumerate().peekable();

    if let Some((_, first)) = lines.peek() {
        if first.trim_start_matches('\u{feff}').starts_with("WEBVTT") {
            lines.next();
            // header block runs to the first blank line or timing line
            while let Some((_, line)) = lines.peek() {
                if line.contains("-->") {
                    break;
                }
                let blank = line.trim().is_empty();
                lines.next();
                if blank {
                    break;
                }
            }
        }
    }

    while let Some((index, line)) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("NOTE") || line == "STYLE" || line == "REGION" {
            for (_, skipped) in lines.by_ref() {
                if skipped.trim().is_empty() {
                    break;
                }
            }
            continue;
        }

        // An optional identifier line precedes the timing line.
        let (timing_index, timing) = if line.contains("-->") {
            (index, line.to_string())
        } else {
            match lines.next() {
                Some((i, next)) if next.contains("-->") => (i, next.trim().to_string()),
                _ => {
                    return Err(MediaError::MalformedCaptions {
                        line: index + 1,
                        reason: "expected a cue timing line".to_string(),
                    });
                }
            }
        };

        let (start_raw, rest) =
            timing
                .split_once("-->")
                .ok_or_else(|| MediaError::MalformedCaptions {
                    line: timing_index + 1,
                    reason: "missing '-->'".to_string(),
                })?;
        let end_raw = rest.split_whitespace().next().unwrap_or("");
        let start = parse_timestamp(start_raw.trim(), timing_index + 1)?;
        let end = parse_timestamp(end_raw, timing_index + 1)?;

        let mut text_lines = Vec::new();
        while let Some((_, text)) = lines.peek() {
            if text.trim().is_empty() {
                break;
            }
            text_lines.push(strip_tags(text.trim()));
            lines.next();
        }
        cues.push(Cue::new(start, end, text_lines.join(" ")));
    }

    Ok(cues)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CaptionsJson {
    Cues(Vec<Cue>),
    Wrapped { cues: Vec<Cue> },
    Lines(Vec<String>),
}

/// Parse a captions JSON document: a cue array, `{"cues": [...]}`, or an
/// array of strings laid out as fixed windows.
pub fn parse_captions_json(input: &str) -> Result<Vec<Cue>> {
    let parsed: CaptionsJson = serde_json::from_str(input)?;
    Ok(match parsed {
        CaptionsJson::Cues(cues) | CaptionsJson::Wrapped { cues } => cues,
        CaptionsJson::Lines(lines) => windowed_cues(
            lines
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        ),
    })
}

/// Where the active cue list came from, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionTier {
    Structured,
    Transcript,
    LessonText,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub tier: CaptionTier,
    pub cues: Vec<Cue>,
}

impl CaptionTrack {
    pub fn none() -> Self {
        Self {
            tier: CaptionTier::None,
            cues: Vec::new(),
        }
    }

    pub fn structured(cues: Vec<Cue>) -> Self {
        Self {
            tier: CaptionTier::Structured,
            cues,
        }
    }

    /// Pick the best available source: structured cues, then a transcript,
    /// then the lesson's own text.
    pub fn from_sources(structured: Option<Vec<Cue>>, transcript: Option<&str>, lesson: &Lesson) -> Self {
        if let Some(cues) = structured.filter(|c| !c.is_empty()) {
            return Self::structured(cues);
        }
        let lines = transcript.map(transcript_lines).unwrap_or_default();
        if !lines.is_empty() {
            return Self {
                tier: CaptionTier::Transcript,
                cues: windowed_cues(lines),
            };
        }
        let lines = lesson_text_lines(lesson);
        if !lines.is_empty() {
            return Self {
                tier: CaptionTier::LessonText,
                cues: windowed_cues(lines),
            };
        }
        Self::none()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Tracks the caption on screen as the playback clock ticks.
#[derive(Debug, Clone)]
pub struct CaptionSynchronizer {
    track: CaptionTrack,
    current: String,
}

impl CaptionSynchronizer {
    pub fn new(track: CaptionTrack) -> Self {
        Self {
            track,
            current: String::new(),
        }
    }

    pub fn track(&self) -> &CaptionTrack {
        &self.track
    }

    pub fn replace_track(&mut self, track: CaptionTrack) {
        self.track = track;
        self.current.clear();
    }

    /// Recompute for clock position `t`; returns the new text when it changed.
    pub fn on_tick(&mut self, t: f64) -> Option<&str> {
        let next = active_cue(&self.track.cues, t);
        if next == self.current {
            return None;
        }
        self.current = next.to_string();
        Some(&self.current)
    }

    pub fn current(&self) -> &str {
        &self.current
    }
}

/// Failure to fetch a caption source that was expected to exist.
#[derive(Debug)]
pub struct CaptionFetchFailure {
    pub url: String,
    pub error: MediaError,
}

/// Loads the best caption track for a resolved lesson.
pub struct CaptionLoader<'a> {
    fetcher: &'a dyn AssetFetcher,
}

impl<'a> CaptionLoader<'a> {
    pub fn new(fetcher: &'a dyn AssetFetcher) -> Self {
        Self { fetcher }
    }

    /// Structured sources first (VTT, then captions JSON), then the text
    /// transcript or stripped SSML, then lesson text. Fetch failures for
    /// URLs the resolver reported are returned alongside the track.
    pub async fn load(
        &self,
        lesson: &Lesson,
        media: &ResolvedMediaSet,
    ) -> (CaptionTrack, Vec<CaptionFetchFailure>) {
        let mut failures = Vec::new();

        let mut structured = None;
        if let Some(url) = &media.captions_vtt_url {
            structured = self.fetch_parsed(url, parse_vtt, &mut failures).await;
        }
        if structured.as_ref().is_none_or(|c: &Vec<Cue>| c.is_empty()) {
            if let Some(url) = &media.captions_json_url {
                structured = self
                    .fetch_parsed(url, parse_captions_json, &mut failures)
                    .await;
            }
        }

        let mut transcript = None;
        if let Some(url) = &media.text_url {
            transcript = self.fetch(url, &mut failures).await;
        }
        if transcript.as_deref().is_none_or(|t| t.trim().is_empty()) {
            if let Some(url) = &media.ssml_url {
                transcript = self.fetch(url, &mut failures).await.map(|s| strip_tags(&s));
            }
        }

        let track = CaptionTrack::from_sources(structured, transcript.as_deref(), lesson);
        debug!(lesson_id = %lesson.id, tier = ?track.tier, cues = track.cues.len(), "Loaded caption track");
        (track, failures)
    }

    async fn fetch(&self, url: &str, failures: &mut Vec<CaptionFetchFailure>) -> Option<String> {
        match self.fetcher.fetch_text(url).await {
            Ok(body) => Some(body),
            Err(error) => {
                warn!(url, error = %error, "Caption source fetch failed");
                failures.push(CaptionFetchFailure {
                    url: url.to_string(),
                    error,
                });
                None
            }
        }
    }

    async fn fetch_parsed(
        &self,
        url: &str,
        parse: fn(&str) -> Result<Vec<Cue>>,
        failures: &mut Vec<CaptionFetchFailure>,
    ) -> Option<Vec<Cue>> {
        let body = self.fetch(url, failures).await?;
        match parse(&body) {
            Ok(cues) => Some(cues),
            Err(error) => {
                warn!(url, error = %error, "Caption source could not be parsed");
                failures.push(CaptionFetchFailure {
                    url: url.to_string(),
                    error,
                });
                None
            }
        }
    }
}
