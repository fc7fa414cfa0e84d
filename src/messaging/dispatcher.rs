//! Rate-limited delivery of queued messages to the radio

use tracing::trace;

use crate::core::types::EntityId;
use crate::messaging::queue::PriorityMessageQueue;
use crate::providers::TransmissionProvider;

/// Sends at most one message per interval
#[derive(Debug, Clone, Default)]
pub struct MessageDispatcher {
    last_sent_at: Option<f64>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transmit the next message if the channel is free
    ///
    /// Returns true when a message went out.
    pub fn pump<T: TransmissionProvider + ?Sized>(
        &mut self,
        queue: &mut PriorityMessageQueue,
        radio: &mut T,
        agent: EntityId,
        now: f64,
        interval_secs: f32,
    ) -> bool {
        if let Some(last) = self.last_sent_at {
            if now - last < interval_secs as f64 {
                return false;
            }
        }
        let Some(message) = queue.dequeue() else {
            return false;
        };
        trace!(%agent, priority = ?message.priority, text = %message.text, "transmit");
        radio.transmit(agent, &message.text);
        self.last_sent_at = Some(now);
        true
    }
}
