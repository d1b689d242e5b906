//! Title and id normalization into asset slugs, plus the ordered candidate
//! list the prober walks through.

use std::collections::HashMap;

use tracing::warn;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    error::{MediaError, Result},
    types::Lesson,
};

/// Slugs of demo assets that may exist on disk regardless of lesson naming.
pub const KNOWN_ALIAS_SLUGS: [&str; 7] = [
    "quick-inbox-zero",
    "focus-sprints",
    "g-m-a-formula",
    "five-minute-map",
    "4-4-6-reset",
    "memory-ladder",
    "micro-leadership-tips",
];

const VIDEO_TITLE_DEFAULTS: [(&str, &str); 9] = [
    ("Inbox Zero in Minutes", "quick-inbox-zero"),
    ("Inbox Zero", "quick-inbox-zero"),
    ("Focus Sprints", "focus-sprints"),
    ("G-M-A Formula", "g-m-a-formula"),
    ("Five-Minute Map", "five-minute-map"),
    ("60-Second Focus Reset", "4-4-6-reset"),
    ("The 4-4-6 Reset", "4-4-6-reset"),
    ("Memory Ladder", "memory-ladder"),
    ("Micro Leadership Tips", "micro-leadership-tips"),
];

const AUDIO_TITLE_DEFAULTS: [(&str, &str); 9] = [
    ("Inbox Zero in Minutes", "quick-inbox-zero"),
    ("Inbox Zero", "quick-inbox-zero"),
    ("60-Second Focus Reset", "4-4-6-reset"),
    ("4-4 Breathing Reset", "4-4-6-reset"),
    ("The Two-Minute Rule", "two-minute-rule"),
    ("Make a Clear Ask", "clear-ask"),
    ("Feedback in 30 Seconds", "feedback-fast"),
    ("Make It Obvious", "atomic-habit"),
    ("Async Standups That Work", "async-standup"),
];

/// Letters NFD leaves intact but which have a plain ASCII spelling.
fn ascii_fold(c: char) -> Option<&'static str> {
    match c {
        'ß' => Some("ss"),
        'æ' => Some("ae"),
        'œ' => Some("oe"),
        'ø' => Some("o"),
        'đ' | 'ð' => Some("d"),
        'ł' => Some("l"),
        'þ' => Some("th"),
        'ı' => Some("i"),
        _ => None,
    }
}

/// Normalize free-form text into a lowercase, dash separated slug.
///
/// Diacritics are removed via NFD decomposition, a handful of letters
/// without a decomposition are folded (`ß` becomes `ss`), anything
/// outside `[a-z0-9 -]` is dropped, whitespace runs become one dash and
/// leading or trailing dashes are trimmed.
pub fn to_slug(input: &str) -> String {
    let lowered = input.trim().to_lowercase();

    let mut cleaned = String::with_capacity(lowered.len());
    for c in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        if let Some(folded) = ascii_fold(c) {
            cleaned.push_str(folded);
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            cleaned.push(c);
        } else if c.is_whitespace() {
            cleaned.push(' ');
        }
    }

    let mut slug = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        let c = if c == ' ' { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

/// Title to slug lookup: built-in defaults with overrides layered on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn video_defaults() -> Self {
        Self::from_pairs(VIDEO_TITLE_DEFAULTS)
    }

    pub fn audio_defaults() -> Self {
        Self::from_pairs(AUDIO_TITLE_DEFAULTS)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a JSON object of `{"Title": "slug"}`.
    pub fn parse_overrides(source_name: &str, json: &str) -> Result<Self> {
        let entries: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| MediaError::InvalidAliasTable {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { entries })
    }

    /// Layer an optional JSON override on top of `self`. A malformed override
    /// is logged and ignored.
    pub fn with_json_override(self, source_name: &str, json: Option<&str>) -> Self {
        let Some(json) = json.filter(|j| !j.trim().is_empty()) else {
            return self;
        };
        match Self::parse_overrides(source_name, json) {
            Ok(overrides) => self.merged(overrides),
            Err(e) => {
                warn!(source = source_name, error = %e, "Ignoring alias table override");
                self
            }
        }
    }

    pub fn merged(mut self, overrides: AliasTable) -> Self {
        self.entries.extend(overrides.entries);
        self
    }

    pub fn insert(&mut self, title: impl Into<String>, slug: impl Into<String>) {
        self.entries.insert(title.into(), slug.into());
    }

    pub fn lookup(&self, title: &str) -> Option<&str> {
        self.entries
            .get(title)
            .or_else(|| self.entries.get(title.trim()))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Produces the ordered slug candidates for a lesson.
#[derive(Debug, Clone)]
pub struct SlugResolver {
    aliases: AliasTable,
    known_slugs: Vec<String>,
}

impl SlugResolver {
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            aliases,
            known_slugs: KNOWN_ALIAS_SLUGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_known_slugs<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_slugs = slugs.into_iter().map(Into::into).collect();
        self
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Alias hit, normalized title, normalized id, then the known slugs.
    /// Empty entries and duplicates are skipped; order is stable for a given table.
    pub fn candidates(&self, lesson: &Lesson) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push_unique = |s: &str| {
            if !s.is_empty() && !out.iter().any(|c| c == s) {
                out.push(s.to_string());
            }
        };

        if let Some(alias) = self.aliases.lookup(&lesson.title) {
            push_unique(alias);
        }
        push_unique(&to_slug(&lesson.title));
        push_unique(&to_slug(&lesson.id));
        for known in &self.known_slugs {
            push_unique(known);
        }

        out
    }

    /// The slug reported back to callers: alias, title slug, id slug, or empty.
    pub fn primary_slug(&self, lesson: &Lesson) -> String {
        if let Some(alias) = self.aliases.lookup(&lesson.title) {
            return alias.to_string();
        }
        let from_title = to_slug(&lesson.title);
        if !from_title.is_empty() {
            return from_title;
        }
        to_slug(&lesson.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_punctuated_title() {
        assert_eq!(to_slug("Inbox Zero in Minutes!"), "inbox-zero-in-minutes");
    }

    #[test]
    fn strips_accents_and_folds_sharp_s() {
        assert_eq!(to_slug("  Füß  "), "fuss");
        assert_eq!(to_slug("Crème Brûlée"), "creme-brulee");
    }

    #[test]
    fn collapses_dashes_and_whitespace() {
        assert_eq!(to_slug("--The   4-4-6   Reset--"), "the-4-4-6-reset");
        assert_eq!(to_slug("a - b"), "a-b");
        assert_eq!(to_slug("tab\tand\nnewline"), "tab-and-newline");
    }

    #[test]
    fn empty_and_symbol_only_inputs_give_empty_slug() {
        assert_eq!(to_slug(""), "");
        assert_eq!(to_slug("!!! ???"), "");
    }

    #[test]
    fn alias_hit_comes_first_then_title_then_known() {
        let resolver = SlugResolver::new(AliasTable::video_defaults());
        let lesson = Lesson::new("inbox-zero", "Inbox Zero in Minutes");
        let candidates = resolver.candidates(&lesson);

        assert_eq!(candidates[0], "quick-inbox-zero");
        assert_eq!(candidates[1], "inbox-zero-in-minutes");
        assert_eq!(candidates[2], "inbox-zero");
        // quick-inbox-zero is also a known slug but appears only once
        assert_eq!(
            candidates.iter().filter(|c| *c == "quick-inbox-zero").count(),
            1
        );
        assert_eq!(candidates.len(), 3 + KNOWN_ALIAS_SLUGS.len() - 1);
    }

    #[test]
    fn id_slug_is_skipped_when_equal_to_title_slug() {
        let resolver = SlugResolver::new(AliasTable::empty()).with_known_slugs(Vec::<String>::new());
        let lesson = Lesson::new("Focus Sprints", "Focus Sprints");
        assert_eq!(resolver.candidates(&lesson), vec!["focus-sprints"]);
    }

    #[test]
    fn empty_lesson_still_yields_known_slugs() {
        let resolver = SlugResolver::new(AliasTable::empty());
        let candidates = resolver.candidates(&Lesson::default());
        assert_eq!(candidates.len(), KNOWN_ALIAS_SLUGS.len());
        assert!(candidates.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn candidates_are_deterministic() {
        let resolver = SlugResolver::new(AliasTable::audio_defaults());
        let lesson = Lesson::new("two-minute-rule", "The Two-Minute Rule");
        let first = resolver.candidates(&lesson);
        for _ in 0..10 {
            assert_eq!(resolver.candidates(&lesson), first);
        }
    }

    #[test]
    fn lookup_falls_back_to_trimmed_title() {
        let table = AliasTable::video_defaults();
        assert_eq!(table.lookup("  Focus Sprints "), Some("focus-sprints"));
        assert_eq!(table.lookup("Unknown"), None);
    }

    #[test]
    fn override_wins_over_default() {
        let table = AliasTable::video_defaults().with_json_override(
            "MICROREEL_VIDEO_TITLE_MAP",
            Some(r#"{"Inbox Zero":"inbox-v2","New Lesson":"new-lesson"}"#),
        );
        assert_eq!(table.lookup("Inbox Zero"), Some("inbox-v2"));
        assert_eq!(table.lookup("New Lesson"), Some("new-lesson"));
        assert_eq!(table.lookup("Inbox Zero in Minutes"), Some("quick-inbox-zero"));
    }

    #[test]
    fn malformed_override_is_ignored() {
        let table = AliasTable::video_defaults().with_json_override("env", Some("{not json"));
        assert_eq!(table, AliasTable::video_defaults());
        assert!(AliasTable::parse_overrides("env", "[1,2]").is_err());
    }

    #[test]
    fn primary_slug_prefers_alias_then_title_then_id() {
        let resolver = SlugResolver::new(AliasTable::video_defaults());
        assert_eq!(
            resolver.primary_slug(&Lesson::new("x", "Inbox Zero")),
            "quick-inbox-zero"
        );
        assert_eq!(resolver.primary_slug(&Lesson::new("x", "Deep Work")), "deep-work");
        assert_eq!(resolver.primary_slug(&Lesson::new("Some Id", "")), "some-id");
        assert_eq!(resolver.primary_slug(&Lesson::default()), "");
    }
}
