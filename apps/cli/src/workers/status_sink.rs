use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use console::style;
use microreel_core::{
    PlaybackState, PresentationTier,
    events::{EnrichedEvent, EventBus, PlaybackStatus, downcast_ref},
    queues::QueueKind,
    workers::{InputSpec, SubscriptionSpec, Worker},
};

/// Badge view of the cards: prints a line whenever a card's state or tier
/// moves. Only each card's newest status matters, so a card's intermediate
/// statuses may be skipped but never another card's.
#[derive(Default)]
pub struct StatusSinkWorker {
    last: HashMap<String, (PlaybackState, PresentationTier)>,
}

#[async_trait]
impl Worker for StatusSinkWorker {
    const SUBSCRIBER_ID: &'static str = "cli.status_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec::new(PlaybackStatus::EVENT_TYPE, QueueKind::Latest1)],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        let Some(status) = downcast_ref::<PlaybackStatus>(&event.event) else {
            return Ok(());
        };
        let badge = (status.state, status.tier);
        if self.last.get(&status.lesson_id) == Some(&badge) {
            return Ok(());
        }
        self.last.insert(status.lesson_id.clone(), badge);
        println!(
            "  {} {} {:?} / {:?} {}",
            style("•").dim(),
            style(&status.lesson_id).cyan(),
            status.state,
            status.tier,
            style(format!("{:.1}s", status.clock_seconds)).dim()
        );
        Ok(())
    }
}
