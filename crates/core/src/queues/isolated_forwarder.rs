use std::{pin::Pin, sync::Arc};

use tokio::sync::{Notify, mpsc};

/// Inbox capacity in front of the drain task.
const FORWARDER_INBOX: usize = 16;

pub type DrainTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Tasks the caller must spawn before anything is published.
pub struct StartupTasks {
    pub tokio: Vec<DrainTask>,
}

impl StartupTasks {
    pub fn spawn_all(self) {
        for task in self.tokio {
            tokio::spawn(task);
        }
    }
}

/// Moves values from a small non-blocking inbox into a bounded channel,
/// waiting for the consumer instead of dropping.
pub struct IsolatedForwarder<T> {
    inbox_tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> IsolatedForwarder<T> {
    pub fn new(
        output_buffer: usize,
        notify_any: Arc<Notify>,
    ) -> (IsolatedForwarder<T>, mpsc::Receiver<T>, DrainTask) {
        let (inbox_tx, mut inbox_rx) = mpsc::channel::<T>(FORWARDER_INBOX);
        let (out_tx, out_rx) = mpsc::channel::<T>(output_buffer);

        let drain_task = Box::pin(async move {
            while let Some(value) = inbox_rx.recv().await {
                if out_tx.send(value).await.is_err() {
                    break;
                }
                notify_any.notify_one();
            }
        });

        (IsolatedForwarder { inbox_tx }, out_rx, drain_task)
    }

    pub fn try_send(&self, value: T) -> Result<(), T> {
        self.inbox_tx.try_send(value).map_err(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_every_watched_event_in_order() {
        let notify = Arc::new(Notify::new());
        let (fwd, mut rx, task) = IsolatedForwarder::new(1, Arc::clone(&notify));
        tokio::spawn(task);

        for id in ["focus-60", "inbox-zero", "clear-ask"] {
            fwd.try_send(id).unwrap();
        }
        assert_eq!(rx.recv().await, Some("focus-60"));
        assert_eq!(rx.recv().await, Some("inbox-zero"));
        assert_eq!(rx.recv().await, Some("clear-ask"));
    }
}
