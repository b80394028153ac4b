//! The bounded outbound reply queue.
//!
//! Replies and broadcasts are queued here and drained in fixed-size
//! batches once per broadcast interval to bound memory and latency.
//! Overflow drops the enqueue attempt (logged, non-fatal) rather than
//! blocking the producer.

use std::collections::VecDeque;

use arbiter_types::OutboundMessage;
use tracing::warn;

/// Maximum queued outbound messages before enqueues are dropped.
pub const OUTBOX_CAP: usize = 256;

/// Messages drained per broadcast interval.
pub const DRAIN_BATCH: usize = 8;

/// Bounded FIFO of outbound messages.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<OutboundMessage>,
    cap: usize,
}

impl Outbox {
    /// Create an outbox bounded at `cap` messages.
    pub const fn new(cap: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            cap,
        }
    }

    /// Enqueue a message. Returns `false` when the queue is full and the
    /// message was dropped.
    pub fn push(&mut self, message: OutboundMessage) -> bool {
        if self.queue.len() >= self.cap {
            warn!(cap = self.cap, "outbox full; dropping outbound message");
            return false;
        }
        self.queue.push_back(message);
        true
    }

    /// Dequeue up to `batch` messages in FIFO order.
    pub fn drain_batch(&mut self, batch: usize) -> Vec<OutboundMessage> {
        let take = batch.min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
