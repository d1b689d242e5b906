use crate::{
    diagnostics::{EndpointChecks, MediaDiagnostics, PlaybackProbe, RequestOutcome},
    types::{Cue, Lesson, ResolvedMediaSet},
};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format cues with their start/end timestamps, one per line
pub fn format_cues_with_timestamps(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| {
            format!(
                "[{}–{}] {}",
                format_timestamp(cue.start),
                format_timestamp(cue.end),
                cue.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn asset_line(output: &mut String, label: &str, url: &Option<String>) {
    let value = url.as_deref().unwrap_or("—");
    output.push_str(&format!("  {:<14} {}\n", label, value));
}

pub fn format_media_set_readable(lesson: &Lesson, set: &ResolvedMediaSet) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {} ({})\n\n", lesson.title, lesson.id));
    output.push_str(&format!("**Slug:** {}\n\n", if set.slug.is_empty() { "—" } else { set.slug.as_str() }));

    asset_line(&mut output, "video", &set.video_url);
    asset_line(&mut output, "poster", &set.poster_url);
    asset_line(&mut output, "captions", &set.captions_vtt_url);
    asset_line(&mut output, "audio", &set.audio_url);
    asset_line(&mut output, "ssml", &set.ssml_url);
    asset_line(&mut output, "text", &set.text_url);
    asset_line(&mut output, "captions json", &set.captions_json_url);
    output.push('\n');

    output
}

fn outcome_line(method: &str, outcome: &RequestOutcome) -> String {
    let mark = if outcome.ok { "✓" } else { "✗" };
    match &outcome.error {
        Some(error) => format!("  {} {:<4} error: {}\n", mark, method, error),
        None => format!(
            "  {} {:<4} {} {}\n",
            mark,
            method,
            outcome.status,
            outcome.content_type.as_deref().unwrap_or("(no content-type)")
        ),
    }
}

fn endpoint_section(output: &mut String, title: &str, checks: &EndpointChecks) {
    output.push_str(&format!("## {}\n\n{}\n", title, checks.url));
    output.push_str(&outcome_line("HEAD", &checks.head));
    output.push_str(&outcome_line("GET", &checks.get));
    output.push('\n');
}

pub fn format_diagnostics_readable(report: &MediaDiagnostics, probe: Option<&PlaybackProbe>) -> String {
    let mut output = String::new();
    let base = if report.base.is_empty() { "(same origin)" } else { report.base.as_str() };
    output.push_str(&format!("# Media diagnostics: {}\n\n", report.slug));
    output.push_str(&format!("**Base:** {}\n\n", base));

    endpoint_section(&mut output, "Video", &report.video);
    endpoint_section(&mut output, "Captions", &report.captions);

    output.push_str("## Validations\n\n");
    output.push_str(&format!("• video/mp4 on HEAD: {}\n", pass(report.video_ok)));
    output.push_str(&format!("• text/vtt on GET: {}\n", pass(report.vtt_ok)));

    if let Some(probe) = probe {
        output.push_str(&format!("• playback probe: {}", pass(probe.ok)));
        if let Some(error) = &probe.error {
            output.push_str(&format!(" ({})", error));
        }
        output.push('\n');
    }

    output.push('\n');
    output
}

fn pass(ok: bool) -> &'static str {
    if ok { "pass" } else { "FAIL" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_zero_padded() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.8), "01:05");
        assert_eq!(format_timestamp(-3.0), "00:00");
    }

    #[test]
    fn cue_listing() {
        let cues = vec![Cue::new(0.0, 2.8, " Act "), Cue::new(3.0, 5.8, "Defer")];
        assert_eq!(
            format_cues_with_timestamps(&cues),
            "[00:00–00:02] Act\n[00:03–00:05] Defer"
        );
    }

    #[test]
    fn media_set_marks_missing_assets() {
        let lesson = Lesson::new("inbox-zero", "Inbox Zero in Minutes");
        let set = ResolvedMediaSet {
            slug: "quick-inbox-zero".into(),
            video_url: Some("/assets/video/mp4/quick-inbox-zero.mp4".into()),
            ..Default::default()
        };
        let text = format_media_set_readable(&lesson, &set);
        assert!(text.contains("**Slug:** quick-inbox-zero"));
        assert!(text.contains("/assets/video/mp4/quick-inbox-zero.mp4"));
        assert!(
            text.lines()
                .any(|l| l.trim_start().starts_with("audio") && l.ends_with('—'))
        );
    }
}
