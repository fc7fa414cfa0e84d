//! Scavenging: wander for loot, fetch what is seen

use tracing::debug;

use crate::agent::context::TickContext;
use crate::core::types::{flat_distance, EntityId};
use crate::messaging::MessagePriority;
use crate::providers::inventory::{find_slot, first_free_slot};
use crate::providers::{ItemKind, ItemView, VoiceHint};
use crate::states::orders::take_order;
use crate::states::routines::SearchRoutines;
use crate::states::{AIState, ChargeHeldItem, ReturnToBase, StateCore, StateKind, Transition, UseKeyOnDoor};

const FETCH_TIMER: &str = "fetch";
/// A fetch taking longer than this gives the item up for the round
const FETCH_TIMEOUT_SECS: f32 = 30.0;
/// Battery charge below which a visible charger is worth a detour
const LOW_CHARGE: f32 = 0.25;

/// Is this loose item worth picking up right now?
fn wanted(cx: &TickContext<'_>, item: &ItemView) -> bool {
    if cx.agent.ignored_items.contains(&item.id) {
        return false;
    }
    match item.kind {
        ItemKind::Scrap => item.value > 0,
        // One weapon is enough
        ItemKind::Weapon(_) => find_slot(&*cx.world, cx.agent.id, |i| i.weapon_kind().is_some()).is_none(),
        ItemKind::Key | ItemKind::BatteryTool => true,
    }
}

/// Wander with gait toggling and glances until loot shows up
#[derive(Debug, Default)]
pub struct SearchingForLoot {
    core: StateCore,
    routines: SearchRoutines,
}

impl SearchingForLoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closest wanted item with a complete path
    fn pick_item(cx: &TickContext<'_>) -> Option<EntityId> {
        let origin = cx.position();
        cx.world
            .items_in_view(cx.agent.id, cx.config.sight_fov_degrees, cx.config.sight_range)
            .into_iter()
            .filter(|item| wanted(cx, item))
            .filter_map(|item| {
                let position = item.position?;
                cx.world.is_valid_path(origin, position).map(|d| (item.id, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Locked door in sight range when carrying a key
    fn door_to_unlock(cx: &TickContext<'_>) -> Option<EntityId> {
        find_slot(&*cx.world, cx.agent.id, |i| i.kind == ItemKind::Key)?;
        let origin = cx.position();
        cx.world
            .doors()
            .into_iter()
            .filter(|door| door.locked && !cx.agent.ignored_items.contains(&door.id))
            .filter(|door| flat_distance(origin, door.position) <= cx.config.sight_range)
            .find(|door| cx.world.is_valid_path(origin, door.position).is_some())
            .map(|door| door.id)
    }

    /// A charger in sight while carrying a nearly flat battery tool
    fn needs_charge(cx: &TickContext<'_>) -> bool {
        let Some(charger) = cx.world.charger() else {
            return false;
        };
        let low = find_slot(&*cx.world, cx.agent.id, |i| {
            i.kind == ItemKind::BatteryTool
                && i.charge.is_some_and(|c| c < LOW_CHARGE)
                && !cx.agent.ignored_items.contains(&i.id)
        })
        .is_some();
        low && flat_distance(cx.position(), charger) <= cx.config.sight_range
    }
}

impl AIState for SearchingForLoot {
    fn kind(&self) -> StateKind {
        StateKind::SearchingForLoot
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        self.routines.start_full(cx.config.wander_radius);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }

        if first_free_slot(&*cx.world, cx.agent.id).is_none() {
            debug!(agent = %cx.agent.id, "inventory full");
            return Transition::to(ReturnToBase::new());
        }

        if let Some(item) = Self::pick_item(cx) {
            return Transition::to(FetchingObject::new(item));
        }

        if let Some(door) = Self::door_to_unlock(cx) {
            return Transition::push(UseKeyOnDoor::new(door));
        }

        if Self::needs_charge(cx) {
            return Transition::push(ChargeHeldItem::new());
        }

        self.routines.drive(cx);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        self.routines.cancel();
        cx.world.set_sprinting(cx.agent.id, false);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Searching)
    }
}

/// Walk to a loose item and pick it up
#[derive(Debug)]
pub struct FetchingObject {
    core: StateCore,
    item: EntityId,
}

impl FetchingObject {
    pub fn new(item: EntityId) -> Self {
        Self {
            core: StateCore::new(),
            item,
        }
    }

    pub fn item(&self) -> EntityId {
        self.item
    }

    fn give_up(&self, cx: &mut TickContext<'_>) -> Transition {
        cx.agent.ignored_items.insert(self.item);
        Transition::to(SearchingForLoot::new())
    }
}

impl AIState for FetchingObject {
    fn kind(&self) -> StateKind {
        StateKind::FetchingObject
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(position) = cx.world.item(self.item).and_then(|i| i.position) else {
            return Transition::to(SearchingForLoot::new());
        };
        let me = cx.agent.id;
        cx.world.set_destination(me, position);
        cx.world.move_to_destination(me);
        cx.world.set_sprinting(me, false);
        let now = cx.now();
        cx.agent.timers.start(FETCH_TIMER, now);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }

        // Someone else took it, or it vanished
        let Some(item) = cx.world.item(self.item) else {
            return Transition::to(SearchingForLoot::new());
        };
        let Some(position) = item.position else {
            return Transition::to(SearchingForLoot::new());
        };

        if cx.agent.timers.has_elapsed(FETCH_TIMER, cx.now(), FETCH_TIMEOUT_SECS) {
            debug!(agent = %cx.agent.id, item = %self.item, "fetch timed out");
            return self.give_up(cx);
        }

        let me = cx.agent.id;
        let origin = cx.position();
        if flat_distance(origin, position) > cx.config.interact_reach {
            if cx.world.is_valid_path(origin, position).is_none() {
                return self.give_up(cx);
            }
            cx.world.set_destination(me, position);
            cx.world.move_to_destination(me);
            return Transition::Stay;
        }

        cx.world.stop(me);
        if !cx.world.grab(me, self.item) {
            if first_free_slot(&*cx.world, me).is_none() {
                return Transition::to(ReturnToBase::new());
            }
            return self.give_up(cx);
        }

        if item.is_valuable() {
            cx.say(format!("Picked up scrap worth {}", item.value), MessagePriority::Low);
        }
        if let Some(slot) = find_slot(&*cx.world, me, |i| i.id == self.item) {
            match item.kind {
                ItemKind::Weapon(_) => {
                    cx.agent.slots.weapon = Some(slot);
                    // Keep the weapon in hand
                    cx.world.switch_slot(me, slot);
                }
                ItemKind::Key => cx.agent.slots.key = Some(slot),
                ItemKind::BatteryTool => cx.agent.slots.tool = Some(slot),
                ItemKind::Scrap => {}
            }
        }

        if first_free_slot(&*cx.world, me).is_none() {
            return Transition::to(ReturnToBase::new());
        }
        Transition::to(SearchingForLoot::new())
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(FETCH_TIMER);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::FoundLoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetching_remembers_item() {
        let id = EntityId::new();
        let state = FetchingObject::new(id);
        assert_eq!(state.item(), id);
        assert_eq!(state.kind(), StateKind::FetchingObject);
    }
}
