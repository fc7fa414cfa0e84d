//! Short errands that hand control back when done
//!
//! Unlocking a door, charging a tool and holding position are pushed on
//! top of whatever the agent was doing and `Resume` it afterwards. A
//! rescue replaces the follow behaviour and goes back to it.

use glam::Vec3;
use tracing::{debug, warn};

use crate::agent::context::TickContext;
use crate::core::error::non_negative;
use crate::core::types::{flat_distance, EntityId};
use crate::messaging::MessagePriority;
use crate::providers::inventory::find_slot;
use crate::providers::{ItemKind, PlayerSnapshot, VoiceHint};
use crate::states::orders::take_order;
use crate::states::{AIState, GetCloseToPlayer, SearchingForPlayer, StateCore, StateKind, Transition};
use crate::threat::FearPurpose;

const ERRAND_TIMER: &str = "errand";
const HOLD_TIMER: &str = "hold";
/// An errand taking longer than this is abandoned (seconds)
const ERRAND_TIMEOUT_SECS: f32 = 20.0;

/// Walk toward `target`; returns true once within reach
///
/// `None` when no path exists.
fn approach(cx: &mut TickContext<'_>, target: Vec3) -> Option<bool> {
    let me = cx.agent.id;
    let origin = cx.position();
    if flat_distance(origin, target) <= cx.config.interact_reach {
        cx.world.stop(me);
        return Some(true);
    }
    cx.world.is_valid_path(origin, target)?;
    cx.world.set_destination(me, target);
    cx.world.move_to_destination(me);
    Some(false)
}

fn start_errand_timer(cx: &mut TickContext<'_>) {
    let now = cx.now();
    cx.agent.timers.start(ERRAND_TIMER, now);
}

fn errand_overdue(cx: &TickContext<'_>) -> bool {
    cx.agent.timers.has_elapsed(ERRAND_TIMER, cx.now(), ERRAND_TIMEOUT_SECS)
}

/// Carry a key to a locked door and unlock it
#[derive(Debug)]
pub struct UseKeyOnDoor {
    core: StateCore,
    door: EntityId,
}

impl UseKeyOnDoor {
    pub fn new(door: EntityId) -> Self {
        Self {
            core: StateCore::new(),
            door,
        }
    }

    pub fn door(&self) -> EntityId {
        self.door
    }

    fn give_up(&self, cx: &mut TickContext<'_>) -> Transition {
        debug!(agent = %cx.agent.id, door = %self.door, "giving up on door");
        cx.agent.ignored_items.insert(self.door);
        Transition::Resume
    }
}

impl AIState for UseKeyOnDoor {
    fn kind(&self) -> StateKind {
        StateKind::UseKeyOnDoor
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let has_key = find_slot(&*cx.world, cx.agent.id, |i| i.kind == ItemKind::Key).is_some();
        let locked = cx.world.door(self.door).is_some_and(|d| d.locked);
        if !has_key || !locked {
            return Transition::Resume;
        }
        start_errand_timer(cx);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(door) = cx.world.door(self.door) else {
            return Transition::Resume;
        };
        if !door.locked {
            return Transition::Resume;
        }
        let me = cx.agent.id;
        let Some(key) = find_slot(&*cx.world, me, |i| i.kind == ItemKind::Key) else {
            return Transition::Resume;
        };
        if errand_overdue(cx) {
            return self.give_up(cx);
        }

        match approach(cx, door.position) {
            None => return self.give_up(cx),
            Some(false) => return Transition::Stay,
            Some(true) => {}
        }

        if cx.world.held_slot(me) != key {
            cx.world.switch_slot(me, key);
            return Transition::Stay;
        }
        if cx.world.use_key_on(me, self.door) {
            debug!(agent = %me, door = %self.door, "door unlocked");
            cx.agent.slots.key = None;
            Transition::Resume
        } else {
            self.give_up(cx)
        }
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(ERRAND_TIMER);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Searching)
    }
}

/// Take a run-down battery tool to the charger
#[derive(Debug, Default)]
pub struct ChargeHeldItem {
    core: StateCore,
}

impl ChargeHeldItem {
    pub fn new() -> Self {
        Self::default()
    }

    fn tool_slot(cx: &TickContext<'_>) -> Option<usize> {
        find_slot(&*cx.world, cx.agent.id, |i| {
            i.kind == ItemKind::BatteryTool && i.charge.is_some_and(|c| c < 1.0)
        })
    }
}

impl AIState for ChargeHeldItem {
    fn kind(&self) -> StateKind {
        StateKind::ChargeHeldItem
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if Self::tool_slot(cx).is_none() || cx.world.charger().is_none() {
            return Transition::Resume;
        }
        start_errand_timer(cx);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let (Some(slot), Some(charger)) = (Self::tool_slot(cx), cx.world.charger()) else {
            return Transition::Resume;
        };
        let me = cx.agent.id;
        let tool = cx.world.slots(me).into_iter().nth(slot).flatten().map(|i| i.id);
        let give_up = |cx: &mut TickContext<'_>| {
            if let Some(tool) = tool {
                cx.agent.ignored_items.insert(tool);
            }
            Transition::Resume
        };

        if errand_overdue(cx) {
            return give_up(cx);
        }
        match approach(cx, charger) {
            None => return give_up(cx),
            Some(false) => return Transition::Stay,
            Some(true) => {}
        }

        if cx.world.held_slot(me) != slot {
            cx.world.switch_slot(me, slot);
            return Transition::Stay;
        }
        if cx.world.charge_held(me) {
            debug!(agent = %me, slot, "tool charged");
            cx.agent.slots.tool = Some(slot);
            Transition::Resume
        } else {
            give_up(cx)
        }
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(ERRAND_TIMER);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Idle)
    }
}

/// Revive a downed player if no enemy is guarding them
#[derive(Debug)]
pub struct RescuePlayer {
    core: StateCore,
    player: EntityId,
}

impl RescuePlayer {
    pub fn new(player: EntityId) -> Self {
        Self {
            core: StateCore::new(),
            player,
        }
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    /// No perceived enemy is within its rescue radius of the player
    pub fn is_safe(cx: &TickContext<'_>, player: &PlayerSnapshot) -> bool {
        cx.visible_enemies().iter().all(|enemy| {
            match cx.danger(enemy, FearPurpose::Rescue, Some(player)) {
                Some(radius) => flat_distance(enemy.position, player.position) >= radius,
                None => true,
            }
        })
    }

    fn abandon(cx: &mut TickContext<'_>, player: &PlayerSnapshot) -> Transition {
        cx.say(format!("Can't reach {}, it's too dangerous", player.name), MessagePriority::High);
        cx.agent.target_player = None;
        Transition::to(SearchingForPlayer::new())
    }
}

impl AIState for RescuePlayer {
    fn kind(&self) -> StateKind {
        StateKind::RescuePlayer
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(player) = cx.world.player(self.player) else {
            return Transition::to(SearchingForPlayer::new());
        };
        if !player.is_dead {
            return Transition::to(GetCloseToPlayer::new());
        }
        if !Self::is_safe(cx, &player) {
            return Self::abandon(cx, &player);
        }
        cx.agent.target_player = Some(player.id);
        cx.world.set_sprinting(cx.agent.id, true);
        start_errand_timer(cx);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(player) = cx.world.player(self.player) else {
            cx.agent.target_player = None;
            return Transition::to(SearchingForPlayer::new());
        };
        // Up again without our help
        if !player.is_dead {
            return Transition::to(GetCloseToPlayer::new());
        }
        if !Self::is_safe(cx, &player) || errand_overdue(cx) {
            return Self::abandon(cx, &player);
        }

        match approach(cx, player.position) {
            None => Self::abandon(cx, &player),
            Some(false) => Transition::Stay,
            Some(true) => {
                if cx.world.revive(cx.agent.id, self.player) {
                    debug!(agent = %cx.agent.id, player = %player.name, "player revived");
                    cx.say(format!("Got you, {}", player.name), MessagePriority::Normal);
                    Transition::to(GetCloseToPlayer::new())
                } else {
                    Transition::Stay
                }
            }
        }
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(ERRAND_TIMER);
        cx.world.set_sprinting(cx.agent.id, false);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Following)
    }
}

/// Stand still for an ordered duration
#[derive(Debug)]
pub struct HoldPosition {
    core: StateCore,
    secs: f32,
}

impl HoldPosition {
    pub fn new(secs: f32) -> Self {
        Self {
            core: StateCore::new(),
            secs,
        }
    }

    pub fn secs(&self) -> f32 {
        self.secs
    }
}

impl AIState for HoldPosition {
    fn kind(&self) -> StateKind {
        StateKind::HoldPosition
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Err(err) = non_negative("hold_secs", self.secs) {
            warn!(agent = %cx.agent.id, %err, "rejecting hold order");
            return Transition::Resume;
        }
        cx.world.stop(cx.agent.id);
        cx.world.set_sprinting(cx.agent.id, false);
        let now = cx.now();
        cx.agent.timers.start(HOLD_TIMER, now);
        cx.say("Holding here", MessagePriority::Normal);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return match next {
                // A new hold restarts the wait in place
                Transition::Push(state) if state.kind() == StateKind::HoldPosition => {
                    Transition::Replace(state)
                }
                other => other,
            };
        }
        if cx.agent.timers.has_elapsed(HOLD_TIMER, cx.now(), self.secs) {
            return Transition::Resume;
        }
        cx.world.stop(cx.agent.id);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(HOLD_TIMER);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::PerceptionProvider;
    use crate::sandbox::harness::{target_kind, Harness};

    const AHEAD: Vec3 = Vec3::new(10.5, 0.0, 2.5);

    fn keyed_door() -> (Harness, EntityId) {
        let mut h = Harness::open(30, 30);
        let me = h.id();
        h.world.give_item(me, ItemKind::Key, 0);
        let door = h.world.add_door(AHEAD, true);
        (h, door)
    }

    #[test]
    fn test_key_unlocks_door() {
        let (mut h, door) = keyed_door();
        let mut state = UseKeyOnDoor::new(door);
        assert!(h.enter(&mut state).is_stay());

        let next = h.tick_until_transition(&mut state, 40);
        assert!(matches!(next, Transition::Resume));
        assert!(h.world.door(door).is_some_and(|d| !d.locked));
        let me = h.id();
        assert!(find_slot(&h.world, me, |i| i.kind == ItemKind::Key).is_none());
        assert!(!h.agent.ignored_items.contains(&door));
    }

    #[test]
    fn test_unreachable_door_is_ignored_afterwards() {
        let (mut h, door) = keyed_door();
        h.world.block_rect(6, 0, 6, 29);
        let mut state = UseKeyOnDoor::new(door);
        assert!(h.enter(&mut state).is_stay());

        assert!(matches!(h.tick(&mut state), Transition::Resume));
        assert!(h.agent.ignored_items.contains(&door));
        assert!(h.world.door(door).is_some_and(|d| d.locked));
    }

    #[test]
    fn test_door_without_key_resumes_at_once() {
        let mut h = Harness::open(30, 30);
        let door = h.world.add_door(AHEAD, true);
        let mut state = UseKeyOnDoor::new(door);
        assert!(matches!(h.enter(&mut state), Transition::Resume));
    }

    #[test]
    fn test_tool_is_charged_at_charger() {
        let mut h = Harness::open(30, 30);
        let me = h.id();
        let tool = h.world.give_item(me, ItemKind::BatteryTool, 10).expect("free slot");
        h.world.set_charger(AHEAD);
        let mut state = ChargeHeldItem::new();
        assert!(h.enter(&mut state).is_stay());

        let next = h.tick_until_transition(&mut state, 40);
        assert!(matches!(next, Transition::Resume));
        assert_eq!(h.world.item(tool).and_then(|i| i.charge), Some(1.0));
        assert_eq!(h.agent.slots.tool, Some(0));
    }

    #[test]
    fn test_charging_needs_a_charger() {
        let mut h = Harness::open(30, 30);
        let me = h.id();
        h.world.give_item(me, ItemKind::BatteryTool, 10);
        let mut state = ChargeHeldItem::new();
        assert!(matches!(h.enter(&mut state), Transition::Resume));
    }

    #[test]
    fn test_hold_resumes_after_duration() {
        let mut h = Harness::open(30, 30);
        let mut state = HoldPosition::new(1.0);
        assert!(h.enter(&mut state).is_stay());
        assert_eq!(h.said(), vec!["Holding here".to_string()]);

        for _ in 0..4 {
            assert!(h.tick(&mut state).is_stay());
        }
        let next = h.tick_until_transition(&mut state, 3);
        assert!(matches!(next, Transition::Resume));
    }

    #[test]
    fn test_negative_hold_resumes_at_once() {
        let mut h = Harness::open(30, 30);
        let mut state = HoldPosition::new(-3.0);
        assert!(matches!(h.enter(&mut state), Transition::Resume));
        assert!(h.said().is_empty());
    }

    #[test]
    fn test_rescue_revives_downed_player() {
        let mut h = Harness::open(30, 30);
        let player = h.world.add_player("ana", AHEAD);
        if let Some(p) = h.world.player_mut(player) {
            p.is_dead = true;
        }
        let mut state = RescuePlayer::new(player);
        assert!(h.enter(&mut state).is_stay());
        assert_eq!(h.agent.target_player, Some(player));

        let next = h.tick_until_transition(&mut state, 40);
        assert_eq!(target_kind(&next), Some(StateKind::GetCloseToPlayer));
        assert!(h.world.player(player).is_some_and(|p| !p.is_dead));
    }

    #[test]
    fn test_guarded_player_is_abandoned() {
        let mut h = Harness::open(30, 30);
        let player = h.world.add_player("ana", AHEAD);
        if let Some(p) = h.world.player_mut(player) {
            p.is_dead = true;
        }
        // Crawler rescue radius is 15
        h.world.add_enemy("crawler", Vec3::new(14.5, 0.0, 2.5));
        let mut state = RescuePlayer::new(player);

        let next = h.enter(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::SearchingForPlayer));
        assert!(h.agent.target_player.is_none());
        assert_eq!(h.said(), vec!["Can't reach ana, it's too dangerous".to_string()]);
    }
}
