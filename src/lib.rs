//! Crew Autopilot - decision engine for autonomous scavenger crew bots

pub mod agent;
pub mod combat;
pub mod core;
pub mod messaging;
pub mod navigation;
pub mod providers;
pub mod sandbox;
pub mod states;
pub mod threat;

pub use crate::agent::{Agent, AiTicker, StateMachineContext, TickContext};
pub use crate::core::{AgentConfig, AgentError, EntityId, Result};
pub use crate::providers::WorldProviders;
pub use crate::states::{AIState, StateKind, Transition};
pub use crate::threat::{EnemyKind, FearPurpose, ThreatRegistry, ThreatTuning};
