//! Four-rank priority queue for outbound agent messages
//!
//! Dequeue order is strict: Critical > High > Normal > Low, oldest first
//! within a rank. There is no aging. A steady stream of higher-rank
//! messages starves the lower ranks indefinitely; callers that care must
//! throttle what they enqueue.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Message rank, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessagePriority {
    Critical,
    High,
    Normal,
    Low,
}

impl MessagePriority {
    pub const ALL: [MessagePriority; 4] = [
        MessagePriority::Critical,
        MessagePriority::High,
        MessagePriority::Normal,
        MessagePriority::Low,
    ];

    fn lane(self) -> usize {
        match self {
            MessagePriority::Critical => 0,
            MessagePriority::High => 1,
            MessagePriority::Normal => 2,
            MessagePriority::Low => 3,
        }
    }
}

/// Text payload plus rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityMessage {
    pub text: String,
    pub priority: MessagePriority,
}

#[derive(Debug, Clone, Default)]
pub struct PriorityMessageQueue {
    lanes: [VecDeque<PriorityMessage>; 4],
}

impl PriorityMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the back of the message's rank
    pub fn enqueue(&mut self, text: impl Into<String>, priority: MessagePriority) {
        self.lanes[priority.lane()].push_back(PriorityMessage {
            text: text.into(),
            priority,
        });
    }

    /// Oldest message of the highest non-empty rank
    pub fn dequeue(&mut self) -> Option<PriorityMessage> {
        self.lanes.iter_mut().find_map(|lane| lane.pop_front())
    }

    pub fn peek(&self) -> Option<&PriorityMessage> {
        self.lanes.iter().find_map(|lane| lane.front())
    }

    /// Is the same text already waiting at this rank?
    pub fn contains(&self, text: &str, priority: MessagePriority) -> bool {
        self.lanes[priority.lane()].iter().any(|m| m.text == text)
    }

    pub fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    pub fn len_of(&self, priority: MessagePriority) -> usize {
        self.lanes[priority.lane()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }

    pub fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_then_lows_in_order() {
        let mut queue = PriorityMessageQueue::new();
        queue.enqueue("help", MessagePriority::Critical);
        queue.enqueue("low one", MessagePriority::Low);
        queue.enqueue("low two", MessagePriority::Low);

        assert_eq!(queue.dequeue().unwrap().text, "help");
        assert_eq!(queue.dequeue().unwrap().text, "low one");
        assert_eq!(queue.dequeue().unwrap().text, "low two");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_later_critical_jumps_ahead() {
        let mut queue = PriorityMessageQueue::new();
        queue.enqueue("normal", MessagePriority::Normal);
        queue.enqueue("high", MessagePriority::High);
        queue.enqueue("critical", MessagePriority::Critical);

        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue()).map(|m| m.text).collect();
        assert_eq!(order, vec!["critical", "high", "normal"]);
    }

    #[test]
    fn test_low_starves_under_high_load() {
        let mut queue = PriorityMessageQueue::new();
        queue.enqueue("low", MessagePriority::Low);
        for i in 0..5 {
            queue.enqueue(format!("high {}", i), MessagePriority::High);
            assert_eq!(queue.dequeue().unwrap().priority, MessagePriority::High);
        }
        assert_eq!(queue.len_of(MessagePriority::Low), 1);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue = PriorityMessageQueue::new();
        queue.enqueue("a", MessagePriority::Low);
        assert_eq!(queue.peek().unwrap().text, "a");
        assert_eq!(queue.len(), 1);
        assert!(queue.contains("a", MessagePriority::Low));
        assert!(!queue.contains("a", MessagePriority::High));
    }

    #[test]
    fn test_clear_empties_all_ranks() {
        let mut queue = PriorityMessageQueue::new();
        for priority in MessagePriority::ALL {
            queue.enqueue("x", priority);
        }
        assert_eq!(queue.len(), 4);
        queue.clear();
        assert!(queue.is_empty());
    }
}
