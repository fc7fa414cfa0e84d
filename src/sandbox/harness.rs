//! Owned pieces of a TickContext for driving one state or task by hand

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::agent::agent::Agent;
use crate::agent::context::TickContext;
use crate::core::clock::SimClock;
use crate::core::config::AgentConfig;
use crate::core::types::EntityId;
use crate::messaging::PriorityMessageQueue;
use crate::sandbox::SandboxWorld;
use crate::states::{AIState, Transition};
use crate::threat::{ThreatRegistry, ThreatTuning};

pub(crate) struct Harness {
    pub agent: Agent,
    pub world: SandboxWorld,
    pub threats: ThreatRegistry,
    pub config: AgentConfig,
    pub outbox: PriorityMessageQueue,
    pub rng: ChaCha8Rng,
    pub clock: SimClock,
}

impl Harness {
    /// Open floor with one agent at its home in the corner cell (2, 2)
    pub fn open(width: i32, depth: i32) -> Self {
        Self::with_agent_at(width, depth, Vec3::new(2.5, 0.0, 2.5))
    }

    pub fn with_agent_at(width: i32, depth: i32, position: Vec3) -> Self {
        let id = EntityId::new();
        let mut world = SandboxWorld::open(width, depth);
        world.add_agent(id, position);
        let mut agent = Agent::new(id, "crew-test", position);
        agent.round_active = true;
        Self {
            agent,
            world,
            threats: ThreatRegistry::from_tuning(&ThreatTuning::default()),
            config: AgentConfig::default(),
            outbox: PriorityMessageQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(11),
            clock: SimClock::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.agent.id
    }

    pub fn cx(&mut self) -> TickContext<'_> {
        TickContext {
            agent: &mut self.agent,
            world: &mut self.world,
            threats: &self.threats,
            config: &self.config,
            outbox: &mut self.outbox,
            rng: &mut self.rng,
            clock: self.clock,
        }
    }

    /// One AI interval of simulated time, with locomotion
    pub fn advance(&mut self) {
        self.clock.advance(self.config.ai_interval_secs);
        self.world.step(self.config.ai_interval_secs);
    }

    pub fn enter(&mut self, state: &mut dyn AIState) -> Transition {
        state.enter(&mut self.cx())
    }

    /// Advance, then tick `state`
    pub fn tick(&mut self, state: &mut dyn AIState) -> Transition {
        self.advance();
        state.tick(&mut self.cx())
    }

    /// Tick until `state` asks for a transition, at most `limit` times
    pub fn tick_until_transition(&mut self, state: &mut dyn AIState, limit: usize) -> Transition {
        for _ in 0..limit {
            let next = self.tick(state);
            if !next.is_stay() {
                return next;
            }
        }
        Transition::Stay
    }

    /// Texts queued for transmission, highest rank first
    pub fn said(&self) -> Vec<String> {
        let mut queue = self.outbox.clone();
        std::iter::from_fn(|| queue.dequeue()).map(|m| m.text).collect()
    }
}

/// Kind of the state a transition installs, if it names one
pub(crate) fn target_kind(transition: &Transition) -> Option<crate::states::StateKind> {
    match transition {
        Transition::To(state) | Transition::Push(state) | Transition::Replace(state) => Some(state.kind()),
        Transition::Stay | Transition::Resume => None,
    }
}
