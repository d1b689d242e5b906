//! Runtime configuration read from the environment.

use crate::slug::AliasTable;

pub const API_BASE_VAR: &str = "MICROREEL_API_BASE";
pub const BACKEND_URL_VAR: &str = "MICROREEL_BACKEND_URL";
pub const HEALTHCHECK_PATH_VAR: &str = "MICROREEL_HEALTHCHECK_PATH";
pub const VIDEO_TITLE_MAP_VAR: &str = "MICROREEL_VIDEO_TITLE_MAP";
pub const AUDIO_TITLE_MAP_VAR: &str = "MICROREEL_AUDIO_TITLE_MAP";

pub const LOCAL_BACKEND: &str = "http://localhost:3001";

/// Where the backend API lives relative to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiBase {
    Url(String),
    SameOrigin,
}

impl ApiBase {
    /// Precedence: explicit value, then `MICROREEL_API_BASE`, then
    /// `MICROREEL_BACKEND_URL`, then `http://localhost:3001` when the client
    /// host is local, otherwise same-origin.
    pub fn resolve(
        explicit: Option<&str>,
        env: &dyn Fn(&str) -> Option<String>,
        client_host: Option<&str>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(url) = non_empty(explicit.map(str::to_string)) {
            return ApiBase::Url(url);
        }
        if let Some(url) = non_empty(env(API_BASE_VAR)).or_else(|| non_empty(env(BACKEND_URL_VAR)))
        {
            return ApiBase::Url(url);
        }
        if matches!(client_host, Some("localhost") | Some("127.0.0.1")) {
            return ApiBase::Url(LOCAL_BACKEND.to_string());
        }
        ApiBase::SameOrigin
    }

    /// Base without a trailing slash; empty for same-origin.
    pub fn as_prefix(&self) -> &str {
        match self {
            ApiBase::Url(url) => url.trim_end_matches('/'),
            ApiBase::SameOrigin => "",
        }
    }

    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.as_prefix(), path)
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_base: ApiBase,
    pub health_path: String,
    pub video_aliases: AliasTable,
    pub audio_aliases: AliasTable,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base: ApiBase::SameOrigin,
            health_path: "/health".to_string(),
            video_aliases: AliasTable::video_defaults(),
            audio_aliases: AliasTable::audio_defaults(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env(explicit_api_base: Option<&str>, client_host: Option<&str>) -> Self {
        Self::from_lookup(explicit_api_base, client_host, &|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(
        explicit_api_base: Option<&str>,
        client_host: Option<&str>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Self {
        let video_map = env(VIDEO_TITLE_MAP_VAR);
        let audio_map = env(AUDIO_TITLE_MAP_VAR);

        Self {
            api_base: ApiBase::resolve(explicit_api_base, env, client_host),
            health_path: env(HEALTHCHECK_PATH_VAR)
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| "/health".to_string()),
            video_aliases: AliasTable::video_defaults()
                .with_json_override(VIDEO_TITLE_MAP_VAR, video_map.as_deref()),
            audio_aliases: AliasTable::audio_defaults()
                .with_json_override(AUDIO_TITLE_MAP_VAR, audio_map.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_base_wins() {
        let env = lookup(&[(API_BASE_VAR, "http://env")]);
        assert_eq!(
            ApiBase::resolve(Some("http://explicit"), &env, Some("localhost")),
            ApiBase::Url("http://explicit".into())
        );
    }

    #[test]
    fn api_base_var_beats_backend_url_var() {
        let env = lookup(&[(API_BASE_VAR, "http://a"), (BACKEND_URL_VAR, "http://b")]);
        assert_eq!(ApiBase::resolve(None, &env, None), ApiBase::Url("http://a".into()));

        let env = lookup(&[(BACKEND_URL_VAR, "http://b")]);
        assert_eq!(ApiBase::resolve(None, &env, None), ApiBase::Url("http://b".into()));
    }

    #[test]
    fn localhost_heuristic_then_same_origin() {
        let env = lookup(&[]);
        assert_eq!(
            ApiBase::resolve(None, &env, Some("127.0.0.1")),
            ApiBase::Url(LOCAL_BACKEND.into())
        );
        assert_eq!(
            ApiBase::resolve(None, &env, Some("lessons.example")),
            ApiBase::SameOrigin
        );
        assert_eq!(ApiBase::SameOrigin.join("/api/lessons"), "/api/lessons");
    }

    #[test]
    fn join_trims_trailing_slash() {
        assert_eq!(
            ApiBase::Url("http://h:3001/".into()).join("/api/lessons"),
            "http://h:3001/api/lessons"
        );
    }

    #[test]
    fn alias_overrides_and_health_path_from_env() {
        let env = lookup(&[
            (VIDEO_TITLE_MAP_VAR, r#"{"Deep Work":"deep-focus"}"#),
            (AUDIO_TITLE_MAP_VAR, "not json"),
            (HEALTHCHECK_PATH_VAR, "/healthz"),
        ]);
        let config = RuntimeConfig::from_lookup(None, None, &env);

        assert_eq!(config.video_aliases.lookup("Deep Work"), Some("deep-focus"));
        assert_eq!(config.audio_aliases, AliasTable::audio_defaults());
        assert_eq!(config.health_path, "/healthz");
        assert_eq!(config.api_base, ApiBase::SameOrigin);
    }
}
