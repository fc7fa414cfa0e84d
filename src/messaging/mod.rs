//! Outbound radio messages and inbound chat commands

pub mod commands;
pub mod dispatcher;
pub mod queue;

pub use commands::ChatCommand;
pub use dispatcher::MessageDispatcher;
pub use queue::{MessagePriority, PriorityMessage, PriorityMessageQueue};
