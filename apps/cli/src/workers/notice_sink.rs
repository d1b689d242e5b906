use std::sync::Arc;

use async_trait::async_trait;
use console::style;
use microreel_core::{
    events::{EnrichedEvent, EventBus, NoticeKind, PlaybackNotice, downcast_ref},
    queues::QueueKind,
    workers::{InputSpec, SubscriptionSpec, Worker, WorkerFailed},
};

/// Prints toasts and worker failures as they arrive.
pub struct NoticeSinkWorker;

fn print_notice(notice: &PlaybackNotice) {
    let mark = match notice.kind {
        NoticeKind::Info => style("i").blue().bold(),
        NoticeKind::Warning => style("!").yellow().bold(),
        NoticeKind::Error => style("✗").red().bold(),
        NoticeKind::Action => style("→").magenta().bold(),
    };
    println!(
        "  {} {} {}",
        mark,
        notice.message,
        style(format!("[{}]", notice.lesson_id)).dim()
    );
}

#[async_trait]
impl Worker for NoticeSinkWorker {
    const SUBSCRIBER_ID: &'static str = "cli.notice_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                InputSpec::new(
                    PlaybackNotice::EVENT_TYPE,
                    QueueKind::FifoDropOldest { capacity: 32 },
                ),
                InputSpec::new(
                    WorkerFailed::EVENT_TYPE,
                    QueueKind::FifoDropOldest { capacity: 8 },
                ),
            ],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        if let Some(notice) = downcast_ref::<PlaybackNotice>(&event.event) {
            print_notice(notice);
        }

        if let Some(failed) = downcast_ref::<WorkerFailed>(&event.event) {
            eprintln!(
                "  {} {} failed on {}: {}",
                style("✗").red().bold(),
                failed.subscriber_id,
                failed.failed_event_type,
                failed.message
            );
        }
        Ok(())
    }
}
