use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use microreel_core::{
    ApiBase, ApiClient, AssetFetcher, AssetProber, CaptionLoader, CaptionTier, ContentTypeCheck,
    LessonFeed, LessonSource, MediaElement, MediaKind, MediaResolver, MediaSignal, PlaybackArbiter,
    PlaybackSettings, PresentationTier, RuntimeConfig, SettingsPatch, SettingsStore,
    SimulatedFactory, demo_lessons, format_cues_with_timestamps, format_diagnostics_readable,
    format_media_set_readable, run_endpoint_diagnostics,
    events::BusConfig,
    fetch::{HttpFetcher, MemoryFetcher},
    slug::to_slug,
    types::{Cue, Lesson, ResolvedMediaSet},
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{session::start_session, workers::watched_sink::ProgressTarget};

mod session;
mod workers;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

#[derive(Parser)]
#[command(name = "microreel")]
#[command(about = "Resolve lesson media, check asset endpoints, and run a simulated lesson feed")]
struct Cli {
    /// Asset origin (defaults to the resolved API base)
    #[arg(long, global = true, env = "MICROREEL_ORIGIN")]
    origin: Option<String>,

    /// Backend API base URL
    #[arg(long, global = true, env = "MICROREEL_API_BASE")]
    api_base: Option<String>,

    /// Log level for microreel targets (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the media set and captions for a lesson
    Resolve {
        /// Lesson title
        #[arg(short, long)]
        title: String,

        /// Lesson id (defaults to the slugified title)
        #[arg(long)]
        id: Option<String>,

        /// Treat 2xx responses with the wrong content-type as missing
        #[arg(long)]
        strict: bool,

        /// Print JSON instead of the readable report
        #[arg(long)]
        json: bool,
    },
    /// HEAD and GET the video and captions endpoints for a slug
    Diagnose {
        #[arg(short, long, default_value = microreel_core::diagnostics::DEFAULT_DIAGNOSTIC_SLUG)]
        slug: String,

        #[arg(long)]
        json: bool,
    },
    /// Resolve every lesson and scroll through them with simulated players
    Feed {
        /// Playback seconds simulated per card
        #[arg(long, default_value_t = 24)]
        ticks: u32,

        /// Use the built-in catalog and an in-memory asset host
        #[arg(long)]
        offline: bool,

        /// Simulated players refuse sound until a gesture
        #[arg(long)]
        require_gesture: bool,

        /// Post watched progress for this user
        #[arg(long, env = "MICROREEL_USER_ID")]
        user: Option<String>,
    },
    /// Show or change persisted playback settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Set one of audioOn, captionsOn, autoplayOn, mutedByDefault
    Set { key: String, value: bool },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(format!("microreel={level}")),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "microreel=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("microreel").cyan().bold(),
        style(subtitle).dim()
    );
}

/// Asset origin: `--origin`, else the API base when it is absolute.
fn asset_origin(cli_origin: Option<&str>, config: &RuntimeConfig) -> Result<String> {
    if let Some(origin) = cli_origin.filter(|o| !o.trim().is_empty()) {
        return Ok(origin.to_string());
    }
    match &config.api_base {
        ApiBase::Url(url) => Ok(url.clone()),
        ApiBase::SameOrigin => bail!("no asset origin; pass --origin or set MICROREEL_API_BASE"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = RuntimeConfig::from_env(cli.api_base.as_deref(), None);

    match cli.command {
        Commands::Resolve {
            title,
            id,
            strict,
            json,
        } => {
            let origin = asset_origin(cli.origin.as_deref(), &config)?;
            let id = id.unwrap_or_else(|| to_slug(&title));
            run_resolve(&config, &origin, Lesson::new(id, title), strict, json).await
        }
        Commands::Diagnose { slug, json } => {
            let origin = asset_origin(cli.origin.as_deref(), &config)?;
            run_diagnose(&config, &origin, &slug, json).await
        }
        Commands::Feed {
            ticks,
            offline,
            require_gesture,
            user,
        } => {
            let options = FeedOptions {
                ticks,
                require_gesture,
                user,
            };
            if offline {
                run_feed(&config, Arc::new(offline_host()), demo_lessons(), options).await
            } else {
                let origin = asset_origin(cli.origin.as_deref(), &config)?;
                let fetcher = Arc::new(HttpFetcher::new(&origin)?);
                let lessons = load_lessons(&config).await;
                run_feed(&config, fetcher, lessons, options).await
            }
        }
        Commands::Settings { action } => run_settings(action).await,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport<'a> {
    lesson: &'a Lesson,
    media: &'a ResolvedMediaSet,
    caption_tier: CaptionTier,
    cues: &'a [Cue],
}

async fn run_resolve(
    config: &RuntimeConfig,
    origin: &str,
    lesson: Lesson,
    strict: bool,
    json: bool,
) -> Result<()> {
    let check = if strict {
        ContentTypeCheck::Strict
    } else {
        ContentTypeCheck::Lenient
    };
    let fetcher = Arc::new(HttpFetcher::new(origin)?);
    let prober = AssetProber::new(fetcher.clone()).with_content_type_check(check);
    let resolver = MediaResolver::from_config(prober, config);

    let start = Instant::now();
    let spinner = (!json).then(|| create_spinner(&format!("Probing assets for {}...", lesson.title)));
    let media = resolver.resolve(&lesson).await;
    let (track, failures) = CaptionLoader::new(fetcher.as_ref()).load(&lesson, &media).await;
    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!(
            "{} Resolved {} {}",
            style("✓").green().bold(),
            style(&media.slug).cyan(),
            style(format!("[{}]", format_duration(start.elapsed()))).dim()
        ));
    }

    if json {
        let report = ResolveReport {
            lesson: &lesson,
            media: &media,
            caption_tier: track.tier,
            cues: &track.cues,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for failure in &failures {
        println!(
            "{} Caption source failed: {} {}",
            style("!").yellow().bold(),
            failure.url,
            style(&failure.error).dim()
        );
    }

    println!("{}", style("─".repeat(60)).dim());
    print!("{}", format_media_set_readable(&lesson, &media));
    println!(
        "{} {:?} ({} cues)",
        style("Captions:").dim(),
        track.tier,
        track.cues.len()
    );
    if !track.cues.is_empty() {
        println!("\n{}", format_cues_with_timestamps(&track.cues));
    }
    Ok(())
}

async fn run_diagnose(config: &RuntimeConfig, origin: &str, slug: &str, json: bool) -> Result<()> {
    let fetcher = HttpFetcher::new(origin)?;

    let spinner = (!json).then(|| create_spinner(&format!("Checking {}...", origin)));
    let report = run_endpoint_diagnostics(&fetcher, origin, slug).await;
    let health = match ApiClient::new(&config.api_base) {
        Ok(client) => Some(client.health().await),
        Err(_) => None,
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        let value = serde_json::json!({ "media": report, "health": health });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        banner("Media diagnostics");
        print!("{}", format_diagnostics_readable(&report, None));
        if let Some(health) = &health {
            let mark = if health.ok {
                style("✓").green().bold()
            } else {
                style("✗").red().bold()
            };
            println!("{} Backend health: {} {}", mark, health.status, health.message);
        }
    }

    if !report.all_ok() {
        std::process::exit(1);
    }
    Ok(())
}

async fn load_lessons(config: &RuntimeConfig) -> Vec<Lesson> {
    let Ok(client) = ApiClient::new(&config.api_base) else {
        return demo_lessons();
    };
    let spinner = create_spinner("Loading lessons...");
    let (lessons, source) = client.lessons_or_demo().await;
    let origin = match source {
        LessonSource::Backend => client.base().to_string(),
        LessonSource::Demo => "demo catalog".to_string(),
    };
    spinner.finish_with_message(format!(
        "{} Loaded {} lessons {}",
        style("✓").green().bold(),
        lessons.len(),
        style(format!("({origin})")).dim()
    ));
    lessons
}

/// Asset host for `--offline`: a few lessons with video and captions, one
/// with narration only and one with nothing but its description.
fn offline_host() -> MemoryFetcher {
    MemoryFetcher::new()
        .with_asset("/assets/video/mp4/quick-inbox-zero.mp4", "video/mp4", "")
        .with_asset("/assets/video/thumb/quick-inbox-zero.jpg", "image/jpeg", "")
        .with_asset(
            "/assets/captions/quick-inbox-zero.vtt",
            "text/vtt",
            "WEBVTT\n\n00:00.000 --> 00:04.000\nTriage with three labels.\n\n\
             00:04.000 --> 00:08.000\nAct, Defer, Archive.\n\n\
             00:08.000 --> 00:12.000\nBatch replies twice a day.\n",
        )
        .with_asset("/assets/video/mp4/focus-sprints.mp4", "video/mp4", "")
        .with_asset("/assets/audio/mp3/4-4-6-reset.mp3", "audio/mpeg", "")
        .with_asset(
            "/assets/audio/text/4-4-6-reset.txt",
            "text/plain",
            "Breathe in for four.\nHold for four.\nBreathe out for six.\nRoll your shoulders.",
        )
}

struct FeedOptions {
    ticks: u32,
    require_gesture: bool,
    user: Option<String>,
}

async fn run_feed(
    config: &RuntimeConfig,
    fetcher: Arc<dyn AssetFetcher>,
    lessons: Vec<Lesson>,
    options: FeedOptions,
) -> Result<()> {
    banner("Lesson feed");
    if lessons.is_empty() {
        bail!("no lessons to play");
    }

    let settings = SettingsStore::at_default_location().load().await;
    let progress = match options.user {
        Some(user_id) => Some(ProgressTarget {
            client: ApiClient::new(&config.api_base)
                .context("progress reporting needs an absolute API base")?,
            user_id,
        }),
        None => None,
    };

    let session = start_session(
        BusConfig {
            strict_routing: true,
            ..Default::default()
        },
        progress,
    )?;

    let factory = Arc::new(if options.require_gesture {
        SimulatedFactory::new().with_gesture_policy()
    } else {
        SimulatedFactory::new()
    });
    let resolver = Arc::new(MediaResolver::from_config(AssetProber::new(fetcher), config));
    let mut feed = LessonFeed::new(
        lessons,
        settings,
        PlaybackArbiter::new(),
        (*session.bus).clone(),
        factory.clone(),
    );

    let start = Instant::now();
    let spinner = create_spinner(&format!("Resolving {} lessons...", feed.len()));
    feed.mount_all(resolver).await;
    spinner.finish_with_message(format!(
        "{} Resolved {} lessons {}",
        style("✓").green().bold(),
        feed.len(),
        style(format!("[{}]", format_duration(start.elapsed()))).dim()
    ));
    println!("{}", style("─".repeat(60)).dim());

    for index in 0..feed.len() {
        let ratios: Vec<f64> = (0..feed.len())
            .map(|i| if i == index { 1.0 } else { 0.0 })
            .collect();
        feed.on_visibility(&ratios);

        if let Some(card) = feed.active_card() {
            println!(
                "\n{} {} {}",
                style(format!("[{}/{}]", index + 1, feed.len())).dim(),
                style(&card.lesson().title).bold(),
                style(format!("{:?}, captions {:?}", card.tier(), card.caption_tier())).dim()
            );
        }

        for _ in 0..options.ticks {
            if let Some(caption) = tick_active(&mut feed, &factory, 1.0) {
                if !caption.is_empty() {
                    println!("    {}", style(format!("“{caption}”")).italic());
                }
            }
        }
        // let the sinks print before the next card
        tokio::task::yield_now().await;
    }

    print_settings_hint(&settings);
    feed.dispose();
    session.shutdown().await
}

/// Advance whichever clock drives the active card by `step` seconds.
fn tick_active(feed: &mut LessonFeed, factory: &SimulatedFactory, step: f64) -> Option<String> {
    let card = feed.active_card_mut()?;
    let media = Arc::clone(card.media()?);

    if card.tier() == PresentationTier::Video {
        if let Some(video) = media.video_url.as_deref().and_then(|url| factory.find(url)) {
            if video.is_playing() {
                let t = video.advance(step);
                return card.on_signal(MediaKind::Video, MediaSignal::Tick(t));
            }
        }
    }
    if let Some(audio) = media.audio_url.as_deref().and_then(|url| factory.find(url)) {
        if audio.is_playing() {
            let t = audio.advance(step);
            return card.on_signal(MediaKind::Audio, MediaSignal::Tick(t));
        }
    }
    card.advance_unattended(step)
}

fn print_settings_hint(settings: &PlaybackSettings) {
    if !settings.audio_on || !settings.autoplay_on {
        println!(
            "\n{} audio autoplay is off; change it with `microreel settings set audioOn true`",
            style("i").blue().bold()
        );
    }
}

async fn run_settings(action: SettingsAction) -> Result<()> {
    let store = SettingsStore::at_default_location();
    let settings = match action {
        SettingsAction::Show => store.load().await,
        SettingsAction::Set { key, value } => {
            let Some(patch) = SettingsPatch::single(&key, value) else {
                bail!("unknown setting `{key}`; expected audioOn, captionsOn, autoplayOn or mutedByDefault");
            };
            let updated = store.update(patch).await?;
            println!("{} Saved {}", style("✓").green().bold(), style(store.path().display()).cyan());
            updated
        }
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
