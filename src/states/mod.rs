//! Behaviour states
//!
//! Each behaviour is its own struct implementing [`AIState`]. The set of
//! behaviours is closed and tagged by [`StateKind`], so the context and
//! the tests can reason about "which state is active" without downcasts.
//!
//! A state never installs its successor itself. Hooks return a
//! [`Transition`] and the context applies it: cleanup of the old state,
//! install, enter of the new one.
//!
//! Families:
//! - player: search, pursue, settle near, and re-find a player
//! - loot: wander for loot and fetch it
//! - base: travel home, drop cargo, idle, recover when lost
//! - panic / fight: threat responses
//! - errands: keys, charging, rescues, ordered holds
//! - terminal: dead and between rounds

pub mod base;
pub mod errands;
pub mod fight;
pub mod loot;
pub mod orders;
pub mod panic;
pub mod player;
pub mod routines;
pub mod terminal;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::agent::Agent;
use crate::agent::context::TickContext;
use crate::core::types::EntityId;
use crate::providers::VoiceHint;

pub use base::{ChillAtBase, DropLootAtBase, LostInFacility, ReturnToBase};
pub use errands::{ChargeHeldItem, HoldPosition, RescuePlayer, UseKeyOnDoor};
pub use fight::FightEnemy;
pub use loot::{FetchingObject, SearchingForLoot};
pub use panic::Panicking;
pub use player::{ChillWithPlayer, GetCloseToPlayer, JustLostPlayer, SearchingForPlayer};
pub use terminal::{Dead, RoundOver};

/// Tag of every behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    SearchingForPlayer,
    GetCloseToPlayer,
    ChillWithPlayer,
    JustLostPlayer,
    SearchingForLoot,
    FetchingObject,
    ReturnToBase,
    ChillAtBase,
    DropLootAtBase,
    Panicking,
    FightEnemy,
    LostInFacility,
    UseKeyOnDoor,
    ChargeHeldItem,
    RescuePlayer,
    HoldPosition,
    Dead,
    RoundOver,
}

impl StateKind {
    /// Status line shown above the agent
    pub fn label(&self) -> &'static str {
        match self {
            StateKind::SearchingForPlayer => "Looking for someone",
            StateKind::GetCloseToPlayer => "Following",
            StateKind::ChillWithPlayer => "Sticking close",
            StateKind::JustLostPlayer => "Where did you go?",
            StateKind::SearchingForLoot => "Scavenging",
            StateKind::FetchingObject => "Grabbing loot",
            StateKind::ReturnToBase => "Heading back",
            StateKind::ChillAtBase => "Resting at base",
            StateKind::DropLootAtBase => "Dropping off loot",
            StateKind::Panicking => "Running!",
            StateKind::FightEnemy => "Fighting",
            StateKind::LostInFacility => "Lost",
            StateKind::UseKeyOnDoor => "Unlocking a door",
            StateKind::ChargeHeldItem => "Charging",
            StateKind::RescuePlayer => "Helping a friend",
            StateKind::HoldPosition => "Holding position",
            StateKind::Dead => "Down",
            StateKind::RoundOver => "Standing by",
        }
    }

    /// Threat responses; preemption treats these differently
    pub fn is_threat_response(&self) -> bool {
        matches!(self, StateKind::Panicking | StateKind::FightEnemy)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bookkeeping every state carries
///
/// `previous` is the state to go back to on `Transition::Resume`. It is a
/// single owned box: a predecessor never has a predecessor of its own.
#[derive(Debug, Default)]
pub struct StateCore {
    entered: bool,
    previous: Option<Box<dyn AIState>>,
}

impl StateCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn previous(&self) -> Option<&dyn AIState> {
        self.previous.as_deref()
    }

    pub fn set_previous(&mut self, previous: Option<Box<dyn AIState>>) {
        self.previous = previous;
        self.trim_depth();
    }

    pub fn take_previous(&mut self) -> Option<Box<dyn AIState>> {
        self.previous.take()
    }

    /// Cut anything beyond one predecessor
    pub fn trim_depth(&mut self) {
        if let Some(previous) = self.previous.as_mut() {
            previous.core_mut().previous = None;
        }
    }
}

/// What the context should do after a hook returns
#[derive(Debug)]
pub enum Transition {
    Stay,
    /// Replace the active state; its predecessor is dropped
    To(Box<dyn AIState>),
    /// Suspend the active state as the new state's predecessor
    Push(Box<dyn AIState>),
    /// Replace the active state; the new state inherits its predecessor
    Replace(Box<dyn AIState>),
    /// Go back to the predecessor, or the neutral fallback if there is none
    Resume,
}

impl Transition {
    pub fn to(state: impl AIState + 'static) -> Self {
        Transition::To(Box::new(state))
    }

    pub fn push(state: impl AIState + 'static) -> Self {
        Transition::Push(Box::new(state))
    }

    pub fn replace(state: impl AIState + 'static) -> Self {
        Transition::Replace(Box::new(state))
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Transition::Stay)
    }
}

/// One behaviour
///
/// Implementors provide `kind`, `core`/`core_mut` and `tick`; every other
/// hook has a default. `enter` and `exit` are driven by the context and
/// should not be overridden.
pub trait AIState: fmt::Debug + Send {
    fn kind(&self) -> StateKind;

    fn core(&self) -> &StateCore;

    fn core_mut(&mut self) -> &mut StateCore;

    /// Setup; runs once per installation and may redirect immediately
    fn enter_once(&mut self, _cx: &mut TickContext<'_>) -> Transition {
        Transition::Stay
    }

    /// One AI interval of behaviour
    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition;

    /// Teardown; must cancel every sub-task the state started
    fn exit_cleanup(&mut self, _cx: &mut TickContext<'_>) {}

    /// Advisory voice category for the presentation layer
    fn voice_hint(&self) -> Option<VoiceHint> {
        None
    }

    /// Radio signal. By default a recognised command is queued as an order.
    fn on_signal(&mut self, cx: &mut TickContext<'_>, text: &str) -> Transition {
        orders::queue_order(cx, text, None);
        Transition::Stay
    }

    /// Chat line from a player. By default a recognised command is queued.
    fn on_chat(&mut self, cx: &mut TickContext<'_>, text: &str, sender: EntityId) -> Transition {
        orders::queue_order(cx, text, Some(sender));
        Transition::Stay
    }

    /// Whether threat and death checks may interrupt this state
    fn preemptible(&self) -> bool {
        true
    }

    /// Enemy this state is fleeing from or fighting
    fn engaged_enemy(&self) -> Option<EntityId> {
        None
    }

    fn enter(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if self.core().entered {
            return Transition::Stay;
        }
        self.core_mut().entered = true;
        self.enter_once(cx)
    }

    fn exit(&mut self, cx: &mut TickContext<'_>) {
        if self.core().entered {
            self.exit_cleanup(cx);
        }
        self.core_mut().entered = false;
    }
}

/// Neutral behaviour when nothing else applies
pub fn fallback_state(agent: &Agent) -> Box<dyn AIState> {
    if agent.round_active {
        Box::new(SearchingForLoot::new())
    } else {
        Box::new(RoundOver::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_fallback_depends_on_round() {
        let mut agent = Agent::new(EntityId::new(), "rex", Vec3::ZERO);
        assert_eq!(fallback_state(&agent).kind(), StateKind::RoundOver);
        agent.round_active = true;
        assert_eq!(fallback_state(&agent).kind(), StateKind::SearchingForLoot);
    }

    #[test]
    fn test_previous_depth_is_one() {
        let mut inner = SearchingForLoot::new();
        inner.core_mut().set_previous(Some(Box::new(ChillAtBase::new())));
        let mut outer = ReturnToBase::new();
        outer.core_mut().set_previous(Some(Box::new(inner)));
        let previous = outer.core().previous().map(|p| p.core().previous().is_none());
        assert_eq!(previous, Some(true));
    }

    #[test]
    fn test_threat_response_kinds() {
        assert!(StateKind::Panicking.is_threat_response());
        assert!(StateKind::FightEnemy.is_threat_response());
        assert!(!StateKind::ReturnToBase.is_threat_response());
    }
}
