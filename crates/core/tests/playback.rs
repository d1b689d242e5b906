use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use microreel_core::{
    AliasTable, AssetProber, Cue, EventBus, Lesson, MediaElement, MediaKind, MediaResolver,
    MediaSignal, MemoryFetcher, PlaybackArbiter, PlaybackPolicy, PlaybackSettings, PlaybackState,
    PresentationTier, SimulatedFactory, active_cue,
    events::{BusConfig, EnrichedEvent, EventBusBuilder, LessonWatched, downcast_ref},
    fetch::FetchMethod,
    queues::QueueKind,
    workers::{InputSpec, SubscriptionSpec, Worker},
};
use tokio::sync::{broadcast, mpsc};

struct WatchedSink {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Worker for WatchedSink {
    const SUBSCRIBER_ID: &'static str = "test.watched_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::new(
                LessonWatched::EVENT_TYPE,
                QueueKind::Isolated { output_buffer: 8 },
            )],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        if let Some(watched) = downcast_ref::<LessonWatched>(&event.event) {
            self.tx.send(watched.lesson_id.clone())?;
        }
        Ok(())
    }
}

fn inbox_zero_host() -> Arc<MemoryFetcher> {
    Arc::new(
        MemoryFetcher::new()
            .with_asset("/assets/video/mp4/quick-inbox-zero.mp4", "video/mp4", "")
            .with_asset(
                "/assets/captions/quick-inbox-zero.vtt",
                "text/vtt",
                "WEBVTT\n\n00:00.000 --> 00:03.000\nAct\n\n00:03.000 --> 00:06.000\nDefer\n",
            ),
    )
}

fn resolver(fetcher: Arc<MemoryFetcher>) -> Arc<MediaResolver> {
    Arc::new(MediaResolver::new(
        AssetProber::new(fetcher),
        AliasTable::video_defaults(),
        AliasTable::audio_defaults(),
    ))
}

#[tokio::test]
async fn aliased_title_resolves_video_on_first_candidate() {
    let fetcher = inbox_zero_host();
    let resolver = resolver(Arc::clone(&fetcher));
    let lesson = Lesson::new("inbox-zero", "Inbox Zero in Minutes");

    let set = resolver.resolve(&lesson).await;

    assert_eq!(
        set.video_url.as_deref(),
        Some("/assets/video/mp4/quick-inbox-zero.mp4")
    );
    assert_eq!(set.slug, "quick-inbox-zero");
    assert_eq!(
        fetcher.request_count("/assets/video/mp4/quick-inbox-zero.mp4"),
        1
    );
    assert_eq!(
        fetcher.request_count("/assets/video/mp4/inbox-zero-in-minutes.mp4"),
        0
    );
    let video_requests: Vec<_> = fetcher
        .requests()
        .into_iter()
        .filter(|(_, url)| url.starts_with("/assets/video/mp4/"))
        .collect();
    assert_eq!(
        video_requests,
        vec![(
            FetchMethod::Head,
            "/assets/video/mp4/quick-inbox-zero.mp4".to_string()
        )]
    );
}

#[test]
fn caption_lookup_by_time() {
    let cues = vec![Cue::new(0.0, 3.0, "a"), Cue::new(3.0, 6.0, "b")];
    assert_eq!(active_cue(&cues, 1.0), "a");
    assert_eq!(active_cue(&cues, 4.0), "b");
    assert_eq!(active_cue(&cues, 10.0), "");
}

#[tokio::test]
async fn watched_event_is_published_once_per_mount() {
    let (bus, mut wiring, tasks) = EventBusBuilder::new(BusConfig::default())
        .subscribe(WatchedSink::subscription())
        .build()
        .unwrap();
    tasks.spawn_all();
    let bus = Arc::new(bus);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = tokio::spawn(WatchedSink { tx }.run(
        wiring.claim(WatchedSink::SUBSCRIBER_ID).unwrap(),
        Arc::clone(&bus),
        shutdown_rx,
    ));

    let arbiter = PlaybackArbiter::new();
    let factory = SimulatedFactory::new();
    let mut card = PlaybackPolicy::new(
        Lesson::new("inbox-zero", "Inbox Zero in Minutes").with_duration(100.0),
        PlaybackSettings::default(),
        Arc::clone(&arbiter),
        (*bus).clone(),
    );
    card.mount(&resolver(inbox_zero_host()), &factory).await;
    card.set_active(true);

    for t in [5.0, 19.0, 20.0, 2.0, 21.0, 30.0] {
        card.on_signal(MediaKind::Video, MediaSignal::Tick(t));
    }

    let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap();
    assert_eq!(first.as_deref(), Some("inbox-zero"));
    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err(),
        "watched must not fire twice"
    );

    shutdown_tx.send(()).unwrap();
    sink.await.unwrap().unwrap();
}

#[tokio::test]
async fn vtt_captions_follow_the_video_clock() {
    let factory = SimulatedFactory::new();
    let mut card = PlaybackPolicy::new(
        Lesson::new("inbox-zero", "Inbox Zero in Minutes"),
        PlaybackSettings::default(),
        PlaybackArbiter::new(),
        EventBus::detached(),
    );
    card.mount(&resolver(inbox_zero_host()), &factory).await;
    card.set_active(true);

    let video = factory
        .find("/assets/video/mp4/quick-inbox-zero.mp4")
        .unwrap();
    assert!(video.is_playing());

    let t = video.advance(1.0);
    assert_eq!(
        card.on_signal(MediaKind::Video, MediaSignal::Tick(t)).as_deref(),
        Some("Act")
    );
    let t = video.advance(3.0);
    assert_eq!(
        card.on_signal(MediaKind::Video, MediaSignal::Tick(t)).as_deref(),
        Some("Defer")
    );
    assert_eq!(card.caption(), "Defer");
}

#[tokio::test]
async fn two_cards_never_play_audio_together() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .with_asset("/assets/audio/mp3/two-minute-rule.mp3", "audio/mpeg", "")
            .with_asset("/assets/audio/mp3/clear-ask.mp3", "audio/mpeg", ""),
    );
    let resolver = resolver(fetcher);
    let arbiter = PlaybackArbiter::new();
    let factory = SimulatedFactory::new();

    let mut first = PlaybackPolicy::new(
        Lesson::new("two-minute-rule", "The Two-Minute Rule"),
        PlaybackSettings::default(),
        Arc::clone(&arbiter),
        EventBus::detached(),
    );
    let mut second = PlaybackPolicy::new(
        Lesson::new("clear-ask", "Make a Clear Ask"),
        PlaybackSettings::default(),
        Arc::clone(&arbiter),
        EventBus::detached(),
    );
    first.mount(&resolver, &factory).await;
    second.mount(&resolver, &factory).await;

    first.set_active(true);
    second.set_active(true);
    assert!(arbiter.exclusivity_holds());
    assert!(
        !factory
            .find("/assets/audio/mp3/two-minute-rule.mp3")
            .unwrap()
            .is_playing()
    );

    // the first card's audio resumes through its own controls
    let a = factory
        .find("/assets/audio/mp3/two-minute-rule.mp3")
        .unwrap();
    a.play().unwrap();
    first.on_signal(MediaKind::Audio, MediaSignal::Started);
    assert!(arbiter.exclusivity_holds());
    assert!(
        !factory
            .find("/assets/audio/mp3/clear-ask.mp3")
            .unwrap()
            .is_playing()
    );
}

#[tokio::test]
async fn transcript_runs_on_its_own_clock_when_sound_is_refused() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .with_asset("/assets/audio/mp3/two-minute-rule.mp3", "audio/mpeg", "")
            .with_asset(
                "/assets/audio/text/two-minute-rule.txt",
                "text/plain",
                "Start now\nFinish in two minutes\n",
            ),
    );
    let factory = SimulatedFactory::new().with_gesture_policy();
    let mut card = PlaybackPolicy::new(
        Lesson::new("two-minute-rule", "The Two-Minute Rule"),
        PlaybackSettings {
            muted_by_default: false,
            ..Default::default()
        },
        PlaybackArbiter::new(),
        EventBus::detached(),
    );
    card.mount(&resolver(fetcher), &factory).await;
    card.set_active(true);

    assert!(card.is_blocked_by_policy());
    assert_eq!(card.tier(), PresentationTier::AudioWithCaptions);
    assert_eq!(card.state(), PlaybackState::Degraded);
    assert_eq!(card.advance_unattended(1.0).as_deref(), Some("Start now"));
    assert_eq!(card.advance_unattended(3.0).as_deref(), Some("Finish in two minutes"));
}
