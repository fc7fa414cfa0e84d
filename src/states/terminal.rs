//! States outside normal play: down, and between rounds

use crate::agent::context::TickContext;
use crate::core::types::EntityId;
use crate::states::{AIState, StateCore, StateKind, Transition};

/// The agent is down; nothing happens until the round ends
#[derive(Debug, Default)]
pub struct Dead {
    core: StateCore,
}

impl Dead {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for Dead {
    fn kind(&self) -> StateKind {
        StateKind::Dead
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let me = cx.agent.id;
        cx.world.stop(me);
        cx.world.set_sprinting(me, false);
        cx.agent.target_enemy = None;
        cx.agent.target_player = None;
        cx.agent.pending_order = None;
        Transition::Stay
    }

    fn tick(&mut self, _cx: &mut TickContext<'_>) -> Transition {
        Transition::Stay
    }

    fn on_signal(&mut self, _cx: &mut TickContext<'_>, _text: &str) -> Transition {
        Transition::Stay
    }

    fn on_chat(&mut self, _cx: &mut TickContext<'_>, _text: &str, _sender: EntityId) -> Transition {
        Transition::Stay
    }

    fn preemptible(&self) -> bool {
        false
    }
}

/// Idle between rounds; `start_round` is the only way out
#[derive(Debug, Default)]
pub struct RoundOver {
    core: StateCore,
}

impl RoundOver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for RoundOver {
    fn kind(&self) -> StateKind {
        StateKind::RoundOver
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let me = cx.agent.id;
        cx.world.stop(me);
        cx.world.set_sprinting(me, false);
        Transition::Stay
    }

    fn tick(&mut self, _cx: &mut TickContext<'_>) -> Transition {
        Transition::Stay
    }

    fn on_signal(&mut self, _cx: &mut TickContext<'_>, _text: &str) -> Transition {
        Transition::Stay
    }

    fn on_chat(&mut self, _cx: &mut TickContext<'_>, _text: &str, _sender: EntityId) -> Transition {
        Transition::Stay
    }

    fn preemptible(&self) -> bool {
        false
    }
}
