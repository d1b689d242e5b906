use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tokio::sync::Notify;

pub struct FifoDropOldestQueue<T> {
    inner: Arc<FifoDropOldestInner<T>>,
}

struct FifoDropOldestInner<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: usize,
    notify_any: Arc<Notify>,
}

pub struct FifoDropOldestReceiver<T> {
    inner: Arc<FifoDropOldestInner<T>>,
}

impl<T> FifoDropOldestQueue<T> {
    pub fn new(capacity: usize, notify_any: Arc<Notify>) -> Self {
        assert!(capacity > 0);

        Self {
            inner: Arc::new(FifoDropOldestInner {
                buf: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify_any,
            }),
        }
    }

    /// Append `value`; returns false when an older entry had to be evicted.
    pub fn push_overwrite(&self, value: T) -> bool {
        let mut buf = self.inner.buf.lock().expect("FifoDropOldestQueue poisoned");
        let evicted = buf.len() >= self.inner.capacity && buf.pop_front().is_some();
        buf.push_back(value);
        drop(buf);
        self.inner.notify_any.notify_one();
        !evicted
    }

    pub fn len(&self) -> usize {
        self.inner.buf.lock().expect("FifoDropOldestQueue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn receiver(&self) -> FifoDropOldestReceiver<T> {
        FifoDropOldestReceiver {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FifoDropOldestReceiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.inner
            .buf
            .lock()
            .expect("FifoDropOldestQueue poisoned")
            .pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_evicts_oldest_notice() {
        let q = FifoDropOldestQueue::new(2, Arc::new(Notify::new()));
        assert!(q.push_overwrite("Video unavailable"));
        assert!(q.push_overwrite("Captions failed to load"));
        assert!(!q.push_overwrite("Tap to enable sound"));

        let rx = q.receiver();
        assert_eq!(rx.try_recv(), Some("Captions failed to load"));
        assert_eq!(rx.try_recv(), Some("Tap to enable sound"));
        assert_eq!(rx.try_recv(), None);
        assert!(q.is_empty());
    }
}
