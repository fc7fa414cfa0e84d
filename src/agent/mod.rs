//! The controlled agent and the machinery that drives it
//!
//! - `Agent`: identity, weak targets, timers, slot references
//! - `tasks`: cooperative, cancellable sub-tasks owned by states
//! - `context`: the per-agent state machine and the fixed-interval ticker

pub mod agent;
pub mod context;
pub mod tasks;

pub use agent::{Agent, PendingOrder, SlotRefs, Timers};
pub use context::{AiTicker, StateMachineContext, TickContext, MAX_TRANSITIONS_PER_TICK};
pub use tasks::{CancelToken, Cooperative, SubTask, TaskPoll, TaskScope, Wait};
