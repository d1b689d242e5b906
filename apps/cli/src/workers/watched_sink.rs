use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use console::style;
use microreel_core::{
    ApiClient, ProgressUpdate,
    events::{EnrichedEvent, EventBus, LessonWatched, expect},
    queues::QueueKind,
    workers::{InputSpec, SubscriptionSpec, Worker},
};
use tracing::debug;

/// Where watched lessons are reported besides the console.
pub struct ProgressTarget {
    pub client: ApiClient,
    pub user_id: String,
}

/// Announces watched lessons and, when configured, posts progress to the
/// backend. A failed post surfaces as `worker.failed`.
pub struct WatchedSinkWorker {
    progress: Option<ProgressTarget>,
}

impl WatchedSinkWorker {
    pub fn new(progress: Option<ProgressTarget>) -> Self {
        Self { progress }
    }
}

#[async_trait]
impl Worker for WatchedSinkWorker {
    const SUBSCRIBER_ID: &'static str = "cli.watched_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::new(
                LessonWatched::EVENT_TYPE,
                QueueKind::Isolated { output_buffer: 16 },
            )],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        let watched = expect::<LessonWatched>(&event.event, LessonWatched::EVENT_TYPE)?;
        println!(
            "  {} Watched {} {}",
            style("✓").green().bold(),
            style(&watched.lesson_id).cyan(),
            style(format!("at {:.1}s", watched.at_seconds)).dim()
        );

        let Some(progress) = &self.progress else {
            return Ok(());
        };
        let update = ProgressUpdate {
            user_id: progress.user_id.clone(),
            lesson_id: watched.lesson_id.clone(),
            watched: true,
            completed: false,
        };
        progress
            .client
            .update_progress(&update)
            .await
            .with_context(|| format!("posting progress for {}", watched.lesson_id))?;
        debug!(lesson_id = %watched.lesson_id, "Progress posted");
        Ok(())
    }
}
