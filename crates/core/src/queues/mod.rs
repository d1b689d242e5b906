pub mod fifo_drop_oldest_queue;
pub mod isolated_forwarder;
pub mod latest1_queue;

pub use fifo_drop_oldest_queue::*;
pub use isolated_forwarder::*;
pub use latest1_queue::*;

/// How a subscriber's inbox for one event type behaves under pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Only the newest value per lesson is kept. Suits status snapshots.
    Latest1,
    /// Bounded; a full queue evicts its oldest entry.
    FifoDropOldest { capacity: usize },
    /// Lossless hand-off through a drain task; delivery fails only when
    /// the forwarder inbox itself is full.
    Isolated { output_buffer: usize },
}
