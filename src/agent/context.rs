//! Per-agent state machine
//!
//! The context owns the agent and exactly one active behaviour state. One
//! `tick` runs per fixed AI interval:
//!
//! 1. death check (a dead agent always ends up in `Dead`)
//! 2. threat preemption (a newly sighted dangerous enemy outranks
//!    everything that is not already fleeing or fighting something worse)
//! 3. the active state's own tick
//!
//! Transitions are returned as values and applied before `tick` returns:
//! old cleanup, install, new enter. The state that asked for the
//! transition is not ticked again this interval.

use std::sync::Arc;

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::agent::agent::Agent;
use crate::core::clock::SimClock;
use crate::core::config::AgentConfig;
use crate::core::types::EntityId;
use crate::messaging::{MessageDispatcher, MessagePriority, PriorityMessageQueue};
use crate::providers::inventory::held_item;
use crate::providers::{EnemySnapshot, PlayerSnapshot, VoiceHint, WorldProviders};
use crate::states::{self, AIState, StateKind, Transition};
use crate::threat::assess::{most_urgent_threat, urgency_of};
use crate::threat::{AgentSnapshot, FearPurpose, ThreatRegistry};

/// Hard cap on transitions applied within one tick
///
/// Enter hooks may immediately request another transition. If two states
/// keep bouncing between each other the chain is cut and the neutral
/// fallback is installed.
pub const MAX_TRANSITIONS_PER_TICK: usize = 8;

/// Everything a state or sub-task may touch during one hook call
pub struct TickContext<'a> {
    pub agent: &'a mut Agent,
    pub world: &'a mut dyn WorldProviders,
    pub threats: &'a ThreatRegistry,
    pub config: &'a AgentConfig,
    pub outbox: &'a mut PriorityMessageQueue,
    pub rng: &'a mut ChaCha8Rng,
    pub clock: SimClock,
}

impl<'a> TickContext<'a> {
    /// Elapsed simulation seconds
    pub fn now(&self) -> f64 {
        self.clock.elapsed
    }

    pub fn position(&self) -> Vec3 {
        self.world.agent_position(self.agent.id)
    }

    /// The agent as threat functions see it
    pub fn snapshot(&self) -> AgentSnapshot {
        let status = self.world.agent_status(self.agent.id);
        AgentSnapshot {
            id: self.agent.id,
            position: self.position(),
            health: status.health,
            held_weapon: held_item(&*self.world, self.agent.id).and_then(|i| i.weapon_kind()),
            inside_facility: status.inside_facility,
        }
    }

    /// Danger distance of `enemy` for `purpose`
    pub fn danger(
        &self,
        enemy: &EnemySnapshot,
        purpose: FearPurpose,
        subject: Option<&PlayerSnapshot>,
    ) -> Option<f32> {
        self.threats.danger_for(purpose, &self.snapshot(), enemy, subject)
    }

    pub fn flee_danger(&self, enemy: &EnemySnapshot) -> Option<f32> {
        self.danger(enemy, FearPurpose::Flee, None)
    }

    /// Enemies the agent currently perceives
    pub fn visible_enemies(&self) -> Vec<EnemySnapshot> {
        self.world.visible_enemies(
            self.agent.id,
            self.config.sight_fov_degrees,
            self.config.sight_range,
            self.config.proximity_awareness,
        )
    }

    /// Queue a radio message unless the same text is already waiting
    pub fn say(&mut self, text: impl Into<String>, priority: MessagePriority) {
        let text = text.into();
        if !self.outbox.contains(&text, priority) {
            self.outbox.enqueue(text, priority);
        }
    }
}

/// One agent's decision engine
pub struct StateMachineContext {
    agent: Agent,
    state: Box<dyn AIState>,
    threats: Arc<ThreatRegistry>,
    config: Arc<AgentConfig>,
    outbox: PriorityMessageQueue,
    dispatcher: MessageDispatcher,
    rng: ChaCha8Rng,
    clock: SimClock,
    last_voice: Option<(VoiceHint, f64)>,
    transitions_last_tick: usize,
}

impl StateMachineContext {
    /// Create a context sitting in the neutral between-rounds state
    pub fn new(agent: Agent, threats: Arc<ThreatRegistry>, config: Arc<AgentConfig>, seed: u64) -> Self {
        Self {
            agent,
            state: Box::new(states::RoundOver::new()),
            threats,
            config,
            outbox: PriorityMessageQueue::new(),
            dispatcher: MessageDispatcher::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: SimClock::new(),
            last_voice: None,
            transitions_last_tick: 0,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn state(&self) -> &dyn AIState {
        self.state.as_ref()
    }

    /// Kind of the state the active one will return to, if any
    pub fn previous_kind(&self) -> Option<StateKind> {
        self.state.core().previous().map(|p| p.kind())
    }

    pub fn outbox(&self) -> &PriorityMessageQueue {
        &self.outbox
    }

    pub fn clock(&self) -> SimClock {
        self.clock
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Transitions applied during the most recent tick or request
    pub fn transitions_last_tick(&self) -> usize {
        self.transitions_last_tick
    }

    /// Run one AI interval
    pub fn tick(&mut self, world: &mut dyn WorldProviders) {
        self.clock.advance(self.config.ai_interval_secs);
        self.transitions_last_tick = 0;

        // First tick after construction: the initial state has not entered yet
        let entry = {
            let (state, mut cx) = self.parts(world);
            state.enter(&mut cx)
        };
        if !matches!(entry, Transition::Stay) {
            self.apply(world, entry);
        } else {
            let preempt = self.preemption(world);
            if matches!(preempt, Transition::Stay) {
                let next = {
                    let (state, mut cx) = self.parts(world);
                    state.tick(&mut cx)
                };
                self.apply(world, next);
            } else {
                self.apply(world, preempt);
            }
        }

        self.present(world);
        self.dispatcher.pump(
            &mut self.outbox,
            world,
            self.agent.id,
            self.clock.elapsed,
            self.config.message_interval_secs,
        );
    }

    /// Inbound radio signal
    pub fn signal_received(&mut self, world: &mut dyn WorldProviders, text: &str) {
        let next = {
            let (state, mut cx) = self.parts(world);
            state.on_signal(&mut cx, text)
        };
        self.apply(world, next);
    }

    /// Inbound chat line
    pub fn chat_received(&mut self, world: &mut dyn WorldProviders, text: &str, sender: EntityId) {
        let next = {
            let (state, mut cx) = self.parts(world);
            state.on_chat(&mut cx, text, sender)
        };
        self.apply(world, next);
    }

    /// Leave the between-rounds state and start working
    pub fn start_round(&mut self, world: &mut dyn WorldProviders) {
        info!(agent = %self.agent.id, name = %self.agent.name, "round started");
        self.agent.reset_for_round();
        self.agent.round_active = true;
        self.apply(world, Transition::to(states::SearchingForLoot::new()));
    }

    /// Drop whatever the agent was doing and go neutral
    pub fn end_round(&mut self, world: &mut dyn WorldProviders) {
        info!(agent = %self.agent.id, name = %self.agent.name, "round ended");
        self.agent.round_active = false;
        self.apply(world, Transition::to(states::RoundOver::new()));
        self.agent.reset_for_round();
        self.outbox.clear();
    }

    /// Apply a transition from outside the state's own hooks
    ///
    /// Goes through the same install path and hop cap as transitions the
    /// states request.
    pub fn request_transition(&mut self, world: &mut dyn WorldProviders, transition: Transition) {
        self.transitions_last_tick = 0;
        self.apply(world, transition);
    }

    fn parts<'a>(
        &'a mut self,
        world: &'a mut dyn WorldProviders,
    ) -> (&'a mut Box<dyn AIState>, TickContext<'a>) {
        let cx = TickContext {
            agent: &mut self.agent,
            world,
            threats: self.threats.as_ref(),
            config: self.config.as_ref(),
            outbox: &mut self.outbox,
            rng: &mut self.rng,
            clock: self.clock,
        };
        (&mut self.state, cx)
    }

    /// Death and threat checks that run before the state's own logic
    fn preemption(&mut self, world: &mut dyn WorldProviders) -> Transition {
        let (state, cx) = self.parts(world);

        if cx.world.agent_status(cx.agent.id).is_dead {
            return if state.kind() == StateKind::Dead {
                Transition::Stay
            } else {
                Transition::to(states::Dead::new())
            };
        }

        if !state.preemptible() {
            return Transition::Stay;
        }

        let Some(threat) = most_urgent_threat(&cx) else {
            return Transition::Stay;
        };

        if !state.kind().is_threat_response() {
            debug!(
                agent = %cx.agent.id,
                enemy = %threat.enemy.id,
                kind = %threat.enemy.kind,
                distance = threat.distance,
                danger = threat.danger,
                "enemy inside flee radius, preempting"
            );
            return Transition::push(states::Panicking::new(threat.enemy.id));
        }

        let engaged = state.engaged_enemy();
        if engaged == Some(threat.enemy.id) {
            return Transition::Stay;
        }
        let current = engaged
            .and_then(|id| urgency_of(&cx, id))
            .unwrap_or(f32::NEG_INFINITY);
        if threat.urgency > current {
            debug!(
                agent = %cx.agent.id,
                enemy = %threat.enemy.id,
                kind = %threat.enemy.kind,
                urgency = threat.urgency,
                "more urgent enemy supersedes current engagement"
            );
            Transition::replace(states::Panicking::new(threat.enemy.id))
        } else {
            Transition::Stay
        }
    }

    /// Apply a transition and any chain its enter hooks request
    fn apply(&mut self, world: &mut dyn WorldProviders, first: Transition) {
        let mut pending = first;
        let mut hops = 0;
        while !matches!(pending, Transition::Stay) {
            hops += 1;
            if hops > MAX_TRANSITIONS_PER_TICK {
                warn!(
                    agent = %self.agent.id,
                    state = ?self.state.kind(),
                    "transition chain exceeded {} hops, installing fallback",
                    MAX_TRANSITIONS_PER_TICK
                );
                let fallback = states::fallback_state(&self.agent);
                // The fallback's own enter request is dropped to end the chain
                let _ = self.install(world, Transition::To(fallback));
                break;
            }
            self.transitions_last_tick += 1;
            pending = self.install(world, pending);
        }
    }

    /// One transition: cleanup, install, enter. Returns enter's request.
    fn install(&mut self, world: &mut dyn WorldProviders, transition: Transition) -> Transition {
        let (state, mut cx) = self.parts(world);
        let from = state.kind();

        state.exit(&mut cx);

        let (next, keep_old) = match transition {
            Transition::Stay => return Transition::Stay,
            Transition::To(next) => (next, false),
            Transition::Push(next) => (next, true),
            Transition::Replace(mut next) => {
                next.core_mut().set_previous(state.core_mut().take_previous());
                (next, false)
            }
            Transition::Resume => match state.core_mut().take_previous() {
                Some(previous) => (previous, false),
                None => (states::fallback_state(cx.agent), false),
            },
        };

        let mut old = std::mem::replace(state, next);
        if keep_old {
            old.core_mut().take_previous();
            state.core_mut().set_previous(Some(old));
        } else {
            drop(old);
        }
        state.core_mut().trim_depth();

        let to = state.kind();
        debug!(agent = %cx.agent.id, ?from, ?to, "state transition");
        cx.world.set_status(cx.agent.id, to.label());

        state.enter(&mut cx)
    }

    /// Forward the voice hint, rate-limited
    fn present(&mut self, world: &mut dyn WorldProviders) {
        let Some(hint) = self.state.voice_hint() else {
            return;
        };
        let now = self.clock.elapsed;
        let due = match self.last_voice {
            Some((last, at)) => last != hint || now - at >= self.config.voice_cooldown_secs as f64,
            None => true,
        };
        if due {
            world.play_voice(self.agent.id, hint);
            self.last_voice = Some((hint, now));
        }
    }
}

/// Converts frame time into fixed AI ticks
#[derive(Debug, Clone)]
pub struct AiTicker {
    interval: f32,
    accumulator: f32,
    max_catch_up: u32,
}

impl AiTicker {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulator: 0.0,
            max_catch_up: 5,
        }
    }

    /// Add frame time; returns how many AI ticks are due
    ///
    /// Long stalls are capped so a hitch does not trigger a burst of
    /// decisions.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut due = 0;
        while self.accumulator >= self.interval && due < self.max_catch_up {
            self.accumulator -= self.interval;
            due += 1;
        }
        if due == self.max_catch_up {
            self.accumulator = self.accumulator.min(self.interval);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_accumulates_frames() {
        let mut ticker = AiTicker::new(0.2);
        assert_eq!(ticker.advance(0.1), 0);
        assert_eq!(ticker.advance(0.1), 1);
        assert_eq!(ticker.advance(0.45), 2);
    }

    #[test]
    fn test_ticker_caps_catch_up() {
        let mut ticker = AiTicker::new(0.2);
        assert_eq!(ticker.advance(10.0), 5);
        assert!(ticker.advance(0.0) <= 1);
    }
}
