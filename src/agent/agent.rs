//! Agent data owned by the state machine context

use ahash::{AHashMap, AHashSet};
use glam::Vec3;

use crate::core::types::EntityId;

/// Order received over chat or signal, consumed by the next state that
/// is willing to act on it
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOrder {
    ReturnToBase,
    Follow(EntityId),
    Hold(f32),
    GoLoot,
}

/// Named elapsed-time timers
///
/// Stores the start time of each running timer; nothing ticks them.
#[derive(Debug, Clone, Default)]
pub struct Timers {
    started: AHashMap<&'static str, f64>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: &'static str, now: f64) {
        self.started.insert(name, now);
    }

    /// Start only if not already running
    pub fn start_if_stopped(&mut self, name: &'static str, now: f64) {
        self.started.entry(name).or_insert(now);
    }

    pub fn stop(&mut self, name: &'static str) {
        self.started.remove(name);
    }

    pub fn is_running(&self, name: &'static str) -> bool {
        self.started.contains_key(name)
    }

    /// Seconds since the timer started
    pub fn elapsed(&self, name: &'static str, now: f64) -> Option<f32> {
        self.started
            .get(name)
            .map(|started| (now - started).max(0.0) as f32)
    }

    /// Running and at least `secs` old
    pub fn has_elapsed(&self, name: &'static str, now: f64, secs: f32) -> bool {
        self.elapsed(name, now).is_some_and(|e| e >= secs)
    }

    pub fn clear(&mut self) {
        self.started.clear();
    }
}

/// Inventory slots the agent has earmarked for a purpose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotRefs {
    pub weapon: Option<usize>,
    pub key: Option<usize>,
    pub tool: Option<usize>,
}

/// The controlled entity
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: EntityId,
    pub name: String,
    /// Player being followed (weak; re-resolved every use)
    pub target_player: Option<EntityId>,
    /// Enemy being fled from or fought (weak)
    pub target_enemy: Option<EntityId>,
    pub last_known_position: Option<Vec3>,
    /// Where loot is delivered and the agent feels safe
    pub home: Vec3,
    pub timers: Timers,
    pub slots: SlotRefs,
    pub pending_order: Option<PendingOrder>,
    /// Items and doors given up on this round (unreachable, timed out, failed)
    pub ignored_items: AHashSet<EntityId>,
    pub round_active: bool,
}

impl Agent {
    pub fn new(id: EntityId, name: impl Into<String>, home: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            target_player: None,
            target_enemy: None,
            last_known_position: None,
            home,
            timers: Timers::new(),
            slots: SlotRefs::default(),
            pending_order: None,
            ignored_items: AHashSet::new(),
            round_active: false,
        }
    }

    /// Forget per-round memory; identity and home persist
    pub fn reset_for_round(&mut self) {
        self.target_player = None;
        self.target_enemy = None;
        self.last_known_position = None;
        self.timers.clear();
        self.slots = SlotRefs::default();
        self.pending_order = None;
        self.ignored_items.clear();
    }

    pub fn take_order(&mut self) -> Option<PendingOrder> {
        self.pending_order.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_elapsed() {
        let mut timers = Timers::new();
        assert_eq!(timers.elapsed("panic", 5.0), None);
        timers.start("panic", 1.0);
        assert_eq!(timers.elapsed("panic", 3.5), Some(2.5));
        assert!(timers.has_elapsed("panic", 3.5, 2.0));
        assert!(!timers.has_elapsed("panic", 3.5, 3.0));
    }

    #[test]
    fn test_start_if_stopped_keeps_original() {
        let mut timers = Timers::new();
        timers.start_if_stopped("lost", 1.0);
        timers.start_if_stopped("lost", 4.0);
        assert_eq!(timers.elapsed("lost", 5.0), Some(4.0));
        timers.stop("lost");
        assert!(!timers.is_running("lost"));
    }

    #[test]
    fn test_reset_for_round_keeps_identity() {
        let mut agent = Agent::new(EntityId::new(), "bot", Vec3::ZERO);
        let id = agent.id;
        agent.target_player = Some(EntityId::new());
        agent.pending_order = Some(PendingOrder::GoLoot);
        agent.timers.start("x", 0.0);
        agent.reset_for_round();
        assert_eq!(agent.id, id);
        assert!(agent.target_player.is_none());
        assert!(agent.pending_order.is_none());
        assert!(!agent.timers.is_running("x"));
    }
}
