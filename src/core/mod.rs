pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::SimClock;
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use types::{EntityId, NodeId, Tick};
