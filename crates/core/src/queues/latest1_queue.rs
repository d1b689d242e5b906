use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// One slot per key holding the most recent value; an unread value is
/// replaced by a newer one under the same key. Keys drain in first-arrival
/// order.
pub struct Latest1Queue<K, T> {
    slots: Mutex<Vec<(K, T)>>,
    notify_any: Arc<Notify>,
}

impl<K: PartialEq, T> Latest1Queue<K, T> {
    pub fn new(notify_any: Arc<Notify>) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            notify_any,
        }
    }

    /// Store `value` under `key`; returns true when an unread value was overwritten.
    pub fn set(&self, key: K, value: T) -> bool {
        let replaced = {
            let mut slots = self.slots.lock().expect("Latest1Queue poisoned");
            match slots.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => {
                    slot.1 = value;
                    true
                }
                None => {
                    slots.push((key, value));
                    false
                }
            }
        };
        self.notify_any.notify_one();
        replaced
    }

    /// Take every unread value, one per key.
    pub fn drain(&self) -> Vec<T> {
        let mut slots = self.slots.lock().expect("Latest1Queue poisoned");
        slots.drain(..).map(|(_, value)| value).collect()
    }
}
