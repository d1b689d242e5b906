use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    events::EnrichedEvent,
    queues::{FifoDropOldestQueue, IsolatedForwarder, Latest1Queue},
};

/// Snapshot slot keyed by the lesson an event concerns; events about no
/// lesson share the `None` slot.
pub type LessonSnapshots = Latest1Queue<Option<String>, Arc<EnrichedEvent>>;

/// Event type to the inboxes of every subscriber of that type.
#[derive(Default)]
pub struct Routes {
    table: HashMap<&'static str, Vec<Route>>,
}

impl Routes {
    pub fn add(&mut self, event_type: &'static str, route: Route) {
        self.table.entry(event_type).or_default().push(route);
    }

    pub fn for_event_type(&self, event_type: &str) -> Option<&[Route]> {
        self.table.get(event_type).map(Vec::as_slice)
    }

    /// Events lost on the way to `subscriber_id` across all its inputs.
    pub fn drops_for(&self, subscriber_id: &str) -> u64 {
        self.table
            .values()
            .flatten()
            .filter(|route| route.subscriber_id == subscriber_id)
            .map(Route::drops)
            .sum()
    }
}

pub struct Route {
    pub subscriber_id: &'static str,
    pub inbox: RouteInbox,
    drops_total: AtomicU64,
}

impl Route {
    pub fn new(subscriber_id: &'static str, inbox: RouteInbox) -> Self {
        Self {
            subscriber_id,
            inbox,
            drops_total: AtomicU64::new(0),
        }
    }

    /// Hand `event` to the inbox. Returns false and counts a drop when
    /// something was lost.
    pub fn deliver(&self, event: Arc<EnrichedEvent>) -> bool {
        let delivered = self.inbox.try_deliver(event);
        if !delivered {
            self.drops_total.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    pub fn drops(&self) -> u64 {
        self.drops_total.load(Ordering::Relaxed)
    }
}

pub enum RouteInbox {
    Latest1(Arc<LessonSnapshots>),
    FifoDropOldest(Arc<FifoDropOldestQueue<Arc<EnrichedEvent>>>),
    Isolated(IsolatedForwarder<Arc<EnrichedEvent>>),
}

impl RouteInbox {
    /// Deliver without blocking. False means an evicted FIFO entry or a full
    /// forwarder inbox. Replacing an older snapshot of the same lesson is
    /// not a loss.
    fn try_deliver(&self, event: Arc<EnrichedEvent>) -> bool {
        match self {
            RouteInbox::Latest1(q) => {
                let lesson = event.event.lesson_id().map(str::to_owned);
                q.set(lesson, event);
                true
            }
            RouteInbox::FifoDropOldest(q) => q.push_overwrite(event),
            RouteInbox::Isolated(fwd) => fwd.try_send(event).is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{sync::Notify, time::Instant};
    use uuid::Uuid;

    use super::*;
    use crate::events::{Event, NoticeKind, PlaybackNotice};

    fn enriched(event: impl Event) -> Arc<EnrichedEvent> {
        Arc::new(EnrichedEvent {
            event: Arc::new(event),
            session_id: Uuid::nil(),
            ingest_seq: 0,
            ingested_at: Instant::now(),
        })
    }

    #[test]
    fn evicted_notices_count_against_the_subscriber() {
        let notify = Arc::new(Notify::new());
        let mut routes = Routes::default();
        routes.add(
            PlaybackNotice::EVENT_TYPE,
            Route::new(
                "toast",
                RouteInbox::FifoDropOldest(Arc::new(FifoDropOldestQueue::new(1, Arc::clone(&notify)))),
            ),
        );
        routes.add(
            PlaybackNotice::EVENT_TYPE,
            Route::new("badge", RouteInbox::Latest1(Arc::new(LessonSnapshots::new(notify)))),
        );

        for message in ["Waiting for media", "Tap to play"] {
            for route in routes.for_event_type(PlaybackNotice::EVENT_TYPE).unwrap() {
                route.deliver(enriched(PlaybackNotice::new("inbox-zero", NoticeKind::Info, message)));
            }
        }

        assert_eq!(routes.drops_for("toast"), 1);
        assert_eq!(routes.drops_for("badge"), 0);
        assert!(routes.for_event_type("lesson.watched").is_none());
    }
}
