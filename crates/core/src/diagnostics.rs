//! Media endpoint checks and a playback readiness probe.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    error::Result,
    fetch::{AssetFetcher, ProbeResponse},
    media::MediaSignal,
};

pub const DEFAULT_DIAGNOSTIC_SLUG: &str = "quick-inbox-zero";
pub const DEFAULT_PLAYBACK_PROBE_TIMEOUT: Duration = Duration::from_millis(8000);
pub const MIN_PLAYBACK_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

const EXPECTED_VIDEO_TYPE: &str = "video/mp4";
const EXPECTED_VTT_TYPE: &str = "text/vtt";

/// Outcome of one diagnostic request. Transport failures have status 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    pub ok: bool,
    pub status: u16,
    pub content_type: Option<String>,
    pub error: Option<String>,
}

impl RequestOutcome {
    fn from_result(result: Result<ProbeResponse>) -> Self {
        match result {
            Ok(response) => Self {
                ok: response.is_success(),
                status: response.status,
                content_type: response.content_type,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                status: 0,
                content_type: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn is_exact(&self, status: u16, content_type: &str) -> bool {
        self.ok
            && self.status == status
            && self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(content_type))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointChecks {
    pub url: String,
    pub head: RequestOutcome,
    pub get: RequestOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDiagnostics {
    pub slug: String,
    pub base: String,
    pub video: EndpointChecks,
    pub captions: EndpointChecks,
    /// HEAD on the video returned 200 with `video/mp4`.
    pub video_ok: bool,
    /// GET on the captions returned 200 with `text/vtt`.
    pub vtt_ok: bool,
}

impl MediaDiagnostics {
    pub fn all_ok(&self) -> bool {
        self.video_ok && self.vtt_ok
    }
}

/// HEAD and GET the video and VTT for `slug`, all four requests at once.
/// `base` is only recorded in the report; the fetcher resolves URLs.
pub async fn run_endpoint_diagnostics(
    fetcher: &dyn AssetFetcher,
    base: &str,
    slug: &str,
) -> MediaDiagnostics {
    let slug = if slug.trim().is_empty() {
        DEFAULT_DIAGNOSTIC_SLUG
    } else {
        slug.trim()
    };
    let video_url = format!("/assets/video/mp4/{slug}.mp4");
    let vtt_url = format!("/assets/captions/{slug}.vtt");

    let (head_video, get_video, head_vtt, get_vtt) = tokio::join!(
        fetcher.head(&video_url),
        fetcher.get(&video_url, None),
        fetcher.head(&vtt_url),
        fetcher.get(&vtt_url, None),
    );

    let video = EndpointChecks {
        url: video_url,
        head: RequestOutcome::from_result(head_video),
        get: RequestOutcome::from_result(get_video),
    };
    let captions = EndpointChecks {
        url: vtt_url,
        head: RequestOutcome::from_result(head_vtt),
        get: RequestOutcome::from_result(get_vtt),
    };

    let report = MediaDiagnostics {
        slug: slug.to_string(),
        base: base.trim_end_matches('/').to_string(),
        video_ok: video.head.is_exact(200, EXPECTED_VIDEO_TYPE),
        vtt_ok: captions.get.is_exact(200, EXPECTED_VTT_TYPE),
        video,
        captions,
    };
    debug!(slug, video_ok = report.video_ok, vtt_ok = report.vtt_ok, "Endpoint diagnostics finished");
    report
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackProbe {
    pub ok: bool,
    pub can_play: bool,
    pub error: Option<String>,
}

impl PlaybackProbe {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            can_play: false,
            error: Some(error.into()),
        }
    }
}

/// Wait for an element to report `CanPlay` or `Error`. Resolves as failed
/// after `timeout`, which is raised to at least one second.
pub async fn probe_playback(
    signals: &mut mpsc::Receiver<MediaSignal>,
    timeout: Duration,
) -> PlaybackProbe {
    let timeout = timeout.max(MIN_PLAYBACK_PROBE_TIMEOUT);
    let wait = async {
        while let Some(signal) = signals.recv().await {
            match signal {
                MediaSignal::CanPlay => {
                    return PlaybackProbe {
                        ok: true,
                        can_play: true,
                        error: None,
                    };
                }
                MediaSignal::Error(message) => return PlaybackProbe::failed(message),
                _ => {}
            }
        }
        PlaybackProbe::failed("Media signal stream closed")
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(probe) => probe,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Playback probe timed out");
            PlaybackProbe::failed("Timeout waiting for canplay")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    #[tokio::test]
    async fn healthy_endpoints_pass_both_assertions() {
        let fetcher = MemoryFetcher::new()
            .with_asset("/assets/video/mp4/quick-inbox-zero.mp4", "video/mp4", "")
            .with_asset(
                "/assets/captions/quick-inbox-zero.vtt",
                "text/vtt; charset=utf-8",
                "WEBVTT\n",
            );
        let report = run_endpoint_diagnostics(&fetcher, "http://localhost:3001/", "").await;
        assert_eq!(report.slug, DEFAULT_DIAGNOSTIC_SLUG);
        assert_eq!(report.base, "http://localhost:3001");
        assert!(report.all_ok());
        assert_eq!(fetcher.requests().len(), 4);
    }

    #[tokio::test]
    async fn wrong_content_type_and_missing_files_fail() {
        let fetcher = MemoryFetcher::new().with_asset(
            "/assets/video/mp4/deep-work.mp4",
            "text/html",
            "<html>",
        );
        let report = run_endpoint_diagnostics(&fetcher, "", "deep-work").await;
        assert!(report.video.head.ok);
        assert!(!report.video_ok);
        assert!(!report.vtt_ok);
        assert_eq!(report.captions.get.status, 404);
    }

    #[tokio::test]
    async fn transport_errors_have_status_zero() {
        let fetcher = MemoryFetcher::new().with_broken("/assets/video/mp4/x.mp4");
        let report = run_endpoint_diagnostics(&fetcher, "", "x").await;
        assert_eq!(report.video.head.status, 0);
        assert!(report.video.head.error.is_some());
    }

    #[tokio::test]
    async fn probe_succeeds_on_canplay_after_ticks() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(MediaSignal::Tick(0.1)).await.unwrap();
        tx.send(MediaSignal::CanPlay).await.unwrap();
        let probe = probe_playback(&mut rx, DEFAULT_PLAYBACK_PROBE_TIMEOUT).await;
        assert!(probe.ok && probe.can_play);
    }

    #[tokio::test]
    async fn probe_reports_element_error() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(MediaSignal::Error("MEDIA_ERR_SRC_NOT_SUPPORTED".into())).await.unwrap();
        let probe = probe_playback(&mut rx, DEFAULT_PLAYBACK_PROBE_TIMEOUT).await;
        assert_eq!(probe.error.as_deref(), Some("MEDIA_ERR_SRC_NOT_SUPPORTED"));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_times_out_no_sooner_than_the_floor() {
        let (_tx, mut rx) = mpsc::channel::<MediaSignal>(1);
        let started = tokio::time::Instant::now();
        let probe = probe_playback(&mut rx, Duration::from_millis(10)).await;
        assert!(!probe.ok);
        assert!(started.elapsed() >= MIN_PLAYBACK_PROBE_TIMEOUT);
    }
}
