//! Going home: travel, unload, rest, and recovering when no safe way exists

use tracing::{debug, info};

use crate::agent::context::TickContext;
use crate::core::types::flat_distance;
use crate::messaging::MessagePriority;
use crate::navigation::{plan_safe_route, AvoidZone, SafeRoute};
use crate::providers::inventory::{cargo_value, find_slot};
use crate::providers::{ItemKind, VoiceHint};
use crate::states::orders::take_order;
use crate::states::routines::SearchRoutines;
use crate::states::{AIState, ChargeHeldItem, SearchingForLoot, StateCore, StateKind, Transition};
use crate::threat::FearPurpose;

const REPLAN_TIMER: &str = "replan";
const LOST_RETRY_TIMER: &str = "lost_retry";
/// Seconds between route replans on the way home
const REPLAN_SECS: f32 = 2.0;
const WAYPOINT_REACHED: f32 = 1.5;
/// Charge below which resting at base is used to top up a tool
const TOP_UP_CHARGE: f32 = 0.5;

/// Circles around perceived enemies the route home must avoid
fn avoid_zones(cx: &TickContext<'_>) -> Vec<AvoidZone> {
    cx.visible_enemies()
        .iter()
        .filter_map(|enemy| {
            let radius = cx.danger(enemy, FearPurpose::PathAvoidance, None)?;
            Some(AvoidZone {
                center: enemy.position,
                radius,
            })
        })
        .collect()
}

fn route_home(cx: &TickContext<'_>) -> Option<SafeRoute> {
    let zones = avoid_zones(cx);
    plan_safe_route(&*cx.world, cx.position(), cx.agent.home, &zones)
}

fn at_home(cx: &TickContext<'_>) -> bool {
    flat_distance(cx.position(), cx.agent.home) <= cx.config.base_arrive_distance
}

/// Travel home along a route that keeps clear of known threats
#[derive(Debug, Default)]
pub struct ReturnToBase {
    core: StateCore,
    route: Option<SafeRoute>,
}

impl ReturnToBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> Option<&SafeRoute> {
        self.route.as_ref()
    }

    fn follow_route(&mut self, cx: &mut TickContext<'_>) {
        let Some(route) = self.route.as_mut() else {
            return;
        };
        if let Some(waypoint) = route.waypoint {
            if flat_distance(cx.position(), waypoint) <= WAYPOINT_REACHED {
                route.waypoint = None;
            }
        }
        let target = route.next_target();
        let me = cx.agent.id;
        if cx.world.destination(me) != Some(target) {
            cx.world.set_destination(me, target);
        }
        cx.world.move_to_destination(me);
    }

    fn arrive(cx: &mut TickContext<'_>) -> Transition {
        cx.world.stop(cx.agent.id);
        if cargo_value(&*cx.world, cx.agent.id) > 0 {
            Transition::to(DropLootAtBase::new())
        } else {
            Transition::to(ChillAtBase::new())
        }
    }
}

impl AIState for ReturnToBase {
    fn kind(&self) -> StateKind {
        StateKind::ReturnToBase
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if at_home(cx) {
            return Self::arrive(cx);
        }
        self.route = route_home(cx);
        if self.route.is_none() {
            debug!(agent = %cx.agent.id, "no safe route home");
            return Transition::to(LostInFacility::new());
        }
        cx.say("Heading back to base", MessagePriority::Normal);
        cx.world.set_sprinting(cx.agent.id, true);
        let now = cx.now();
        cx.agent.timers.start(REPLAN_TIMER, now);
        self.follow_route(cx);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }
        if at_home(cx) {
            return Self::arrive(cx);
        }

        let now = cx.now();
        if cx.agent.timers.has_elapsed(REPLAN_TIMER, now, REPLAN_SECS) {
            cx.agent.timers.start(REPLAN_TIMER, now);
            self.route = route_home(cx);
            if self.route.is_none() {
                return Transition::to(LostInFacility::new());
            }
        }
        self.follow_route(cx);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(REPLAN_TIMER);
        cx.world.set_sprinting(cx.agent.id, false);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::ReturningHome)
    }
}

/// Drop every valuable item at base, one per tick
#[derive(Debug, Default)]
pub struct DropLootAtBase {
    core: StateCore,
    delivered: u32,
}

impl DropLootAtBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value dropped so far
    pub fn delivered(&self) -> u32 {
        self.delivered
    }
}

impl AIState for DropLootAtBase {
    fn kind(&self) -> StateKind {
        StateKind::DropLootAtBase
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        cx.world.stop(cx.agent.id);
        self.delivered = 0;
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if !at_home(cx) {
            return Transition::to(ReturnToBase::new());
        }

        let me = cx.agent.id;
        let Some(slot) = find_slot(&*cx.world, me, |i| i.is_valuable()) else {
            if self.delivered > 0 {
                info!(agent = %me, value = self.delivered, "loot delivered");
                cx.say(format!("Dropped off {} worth of scrap", self.delivered), MessagePriority::Normal);
            }
            return Transition::to(ChillAtBase::new());
        };

        if cx.world.held_slot(me) != slot {
            cx.world.switch_slot(me, slot);
        }
        let value = cx
            .world
            .slots(me)
            .into_iter()
            .nth(slot)
            .flatten()
            .map_or(0, |i| i.value);
        if let Some(dropped) = cx.world.drop_held(me) {
            // Delivered loot is not picked up again
            cx.agent.ignored_items.insert(dropped);
            self.delivered += value;
        } else {
            // Nothing we can do with it here
            return Transition::to(ChillAtBase::new());
        }
        Transition::Stay
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Idle)
    }
}

/// Rest at base for a while, then go back out
#[derive(Debug, Default)]
pub struct ChillAtBase {
    core: StateCore,
    routines: SearchRoutines,
    /// Survives a pushed errand, so charging does not restart the rest
    rest_started: Option<f64>,
}

impl ChillAtBase {
    pub fn new() -> Self {
        Self::default()
    }

    fn tool_needs_top_up(cx: &TickContext<'_>) -> bool {
        cx.world.charger().is_some()
            && find_slot(&*cx.world, cx.agent.id, |i| {
                i.kind == ItemKind::BatteryTool
                    && i.charge.is_some_and(|c| c < TOP_UP_CHARGE)
                    && !cx.agent.ignored_items.contains(&i.id)
            })
            .is_some()
    }
}

impl AIState for ChillAtBase {
    fn kind(&self) -> StateKind {
        StateKind::ChillAtBase
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        cx.world.stop(cx.agent.id);
        cx.world.set_sprinting(cx.agent.id, false);
        let now = cx.now();
        self.rest_started.get_or_insert(now);
        self.routines.start_look_around();
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }
        if Self::tool_needs_top_up(cx) {
            return Transition::push(ChargeHeldItem::new());
        }
        let rested = self.rest_started.map_or(0.0, |start| cx.clock.since(start));
        if rested >= cx.config.chill_at_base_secs {
            return Transition::to(SearchingForLoot::new());
        }
        self.routines.drive(cx);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, _cx: &mut TickContext<'_>) {
        self.routines.cancel();
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Idle)
    }
}

/// No safe way home: wander and retry the route now and then
#[derive(Debug, Default)]
pub struct LostInFacility {
    core: StateCore,
    routines: SearchRoutines,
}

impl LostInFacility {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for LostInFacility {
    fn kind(&self) -> StateKind {
        StateKind::LostInFacility
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        cx.say("I'm lost, can't find a safe way back", MessagePriority::High);
        let now = cx.now();
        cx.agent.timers.start(LOST_RETRY_TIMER, now);
        self.routines.start_wander(cx.config.wander_radius);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }
        let now = cx.now();
        if cx.agent.timers.has_elapsed(LOST_RETRY_TIMER, now, cx.config.lost_retry_secs) {
            cx.agent.timers.start(LOST_RETRY_TIMER, now);
            if route_home(cx).is_some() {
                debug!(agent = %cx.agent.id, "found a way home");
                return Transition::to(ReturnToBase::new());
            }
        }
        self.routines.drive(cx);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        self.routines.cancel();
        cx.agent.timers.stop(LOST_RETRY_TIMER);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::harness::{target_kind, Harness};
    use glam::Vec3;

    /// Agent far from a home in the corner
    fn away_from_home() -> Harness {
        let mut h = Harness::with_agent_at(40, 30, Vec3::new(20.5, 0.0, 20.5));
        h.agent.home = Vec3::new(2.5, 0.0, 2.5);
        h
    }

    #[test]
    fn test_walled_off_home_means_lost() {
        let mut h = away_from_home();
        h.world.block_rect(0, 10, 39, 10);
        let mut state = ReturnToBase::new();

        let next = h.enter(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::LostInFacility));
        assert!(state.route().is_none());
    }

    #[test]
    fn test_route_lost_on_replan_means_lost() {
        let mut h = away_from_home();
        let mut state = ReturnToBase::new();
        assert!(h.enter(&mut state).is_stay());
        assert!(state.route().is_some());
        assert_eq!(h.said(), vec!["Heading back to base".to_string()]);

        h.world.block_rect(0, 5, 39, 5);
        let next = h.tick_until_transition(&mut state, 15);
        assert_eq!(target_kind(&next), Some(StateKind::LostInFacility));
    }

    #[test]
    fn test_arrival_with_cargo_drops_it() {
        let mut h = Harness::open(30, 30);
        let me = h.id();
        h.world.give_item(me, ItemKind::Scrap, 60);
        let mut state = ReturnToBase::new();
        assert_eq!(target_kind(&h.enter(&mut state)), Some(StateKind::DropLootAtBase));

        let mut drop = DropLootAtBase::new();
        assert!(h.enter(&mut drop).is_stay());
        assert!(h.tick(&mut drop).is_stay());
        assert_eq!(drop.delivered(), 60);
        let next = h.tick(&mut drop);
        assert_eq!(target_kind(&next), Some(StateKind::ChillAtBase));
        assert_eq!(cargo_value(&h.world, me), 0);
    }

    #[test]
    fn test_empty_handed_arrival_rests() {
        let mut h = Harness::open(30, 30);
        let mut state = ReturnToBase::new();
        assert_eq!(target_kind(&h.enter(&mut state)), Some(StateKind::ChillAtBase));
    }

    #[test]
    fn test_lost_agent_retries_route_home() {
        let mut h = away_from_home();
        let mut state = LostInFacility::new();
        assert!(h.enter(&mut state).is_stay());

        // Retry every six seconds
        for _ in 0..25 {
            assert!(h.tick(&mut state).is_stay());
        }
        let next = h.tick_until_transition(&mut state, 10);
        assert_eq!(target_kind(&next), Some(StateKind::ReturnToBase));
    }
}
