//! Chat/signal orders: queued on receipt, acted on by the next willing state

use tracing::debug;

use crate::agent::agent::PendingOrder;
use crate::agent::context::TickContext;
use crate::core::types::EntityId;
use crate::messaging::ChatCommand;
use crate::states::{GetCloseToPlayer, HoldPosition, ReturnToBase, SearchingForLoot, StateKind, Transition};

/// Hold time when the order names none (seconds)
pub const DEFAULT_HOLD_SECS: f32 = 30.0;

/// Parse `text` and queue the resulting order; returns whether one was queued
///
/// "Follow me" needs a sender, so over the radio it is ignored.
pub fn queue_order(cx: &mut TickContext<'_>, text: &str, sender: Option<EntityId>) -> bool {
    let order = match ChatCommand::parse(text) {
        ChatCommand::ReturnToBase => PendingOrder::ReturnToBase,
        ChatCommand::FollowMe => match sender {
            Some(player) => PendingOrder::Follow(player),
            None => return false,
        },
        ChatCommand::Hold(secs) => PendingOrder::Hold(secs.unwrap_or(DEFAULT_HOLD_SECS)),
        ChatCommand::GoLoot => PendingOrder::GoLoot,
        ChatCommand::Unknown => return false,
    };
    debug!(agent = %cx.agent.id, ?order, "order queued");
    cx.agent.pending_order = Some(order);
    true
}

/// Consume the pending order, if any, as a transition out of `current`
///
/// An order for the behaviour already running is consumed without a
/// transition.
pub fn take_order(cx: &mut TickContext<'_>, current: StateKind) -> Option<Transition> {
    let order = cx.agent.take_order()?;
    let transition = match order {
        PendingOrder::ReturnToBase if current != StateKind::ReturnToBase => {
            Transition::to(ReturnToBase::new())
        }
        PendingOrder::Follow(player) => {
            cx.agent.target_player = Some(player);
            if matches!(current, StateKind::GetCloseToPlayer | StateKind::ChillWithPlayer) {
                return None;
            }
            Transition::to(GetCloseToPlayer::new())
        }
        PendingOrder::Hold(secs) => Transition::push(HoldPosition::new(secs)),
        PendingOrder::GoLoot if current != StateKind::SearchingForLoot => {
            Transition::to(SearchingForLoot::new())
        }
        _ => return None,
    };
    Some(transition)
}
