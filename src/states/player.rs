//! Player-centred behaviours: find a player, keep up, settle near, re-find

use tracing::debug;

use crate::agent::context::TickContext;
use crate::core::types::flat_distance;
use crate::providers::{PlayerSnapshot, VoiceHint};
use crate::states::orders::take_order;
use crate::states::routines::SearchRoutines;
use crate::states::{AIState, RescuePlayer, SearchingForLoot, StateCore, StateKind, Transition};

const LOSE_PLAYER_TIMER: &str = "lose_player";
const JUST_LOST_TIMER: &str = "just_lost";
/// Distance beyond which the agent sprints to catch up, as a multiple of the leash
const SPRINT_LEASH_FACTOR: f32 = 1.5;

/// Resolve the followed player; `None` if unset or gone
fn target_player(cx: &TickContext<'_>) -> Option<PlayerSnapshot> {
    cx.agent.target_player.and_then(|id| cx.world.player(id))
}

fn sees(cx: &TickContext<'_>, player: &PlayerSnapshot) -> bool {
    cx.world
        .can_see(cx.agent.id, player.position, cx.config.sight_fov_degrees, cx.config.sight_range)
}

/// Wander until any living player comes into view
#[derive(Debug, Default)]
pub struct SearchingForPlayer {
    core: StateCore,
    routines: SearchRoutines,
}

impl SearchingForPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for SearchingForPlayer {
    fn kind(&self) -> StateKind {
        StateKind::SearchingForPlayer
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

        if let Some(player) =
            cx.world
                .find_player_in_view(cx.agent.id, cx.config.sight_fov_degrees, cx.config.sight_range)
        {
            debug!(agent = %cx.agent.id, player = %player.name, "player spotted");
            cx.agent.target_player = Some(player.id);
            cx.agent.last_known_position = Some(player.position);
            return Transition::to(GetCloseToPlayer::new());
        }

        // Nobody left in the facility to look for
        if !cx.world.players().iter().any(|p| !p.is_dead && p.inside_facility) {
            return Transition::to(SearchingForLoot::new());
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

/// Close the distance to the followed player
#[derive(Debug, Default)]
pub struct GetCloseToPlayer {
    core: StateCore,
}

impl GetCloseToPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for GetCloseToPlayer {
    fn kind(&self) -> StateKind {
        StateKind::GetCloseToPlayer
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if target_player(cx).is_none() {
            cx.agent.target_player = None;
            return Transition::to(SearchingForPlayer::new());
        }
        cx.agent.timers.stop(LOSE_PLAYER_TIMER);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }

        let Some(player) = target_player(cx) else {
            cx.agent.target_player = None;
            return Transition::to(SearchingForPlayer::new());
        };
        if player.is_dead {
            return Transition::to(RescuePlayer::new(player.id));
        }

        let me = cx.agent.id;
        let now = cx.now();
        if sees(cx, &player) {
            cx.agent.last_known_position = Some(player.position);
            cx.agent.timers.stop(LOSE_PLAYER_TIMER);
        } else {
            cx.agent.timers.start_if_stopped(LOSE_PLAYER_TIMER, now);
            if cx.agent.timers.has_elapsed(LOSE_PLAYER_TIMER, now, cx.config.lose_player_secs) {
                return Transition::to(JustLostPlayer::new());
            }
        }

        let distance = flat_distance(cx.position(), player.position);
        if distance <= cx.config.chill_distance {
            return Transition::to(ChillWithPlayer::new());
        }

        // Head for where the player was last seen, not where they are
        let goal = cx.agent.last_known_position.unwrap_or(player.position);
        cx.world.set_destination(me, goal);
        cx.world.move_to_destination(me);
        cx.world
            .set_sprinting(me, distance > cx.config.follow_leash * SPRINT_LEASH_FACTOR);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        cx.agent.timers.stop(LOSE_PLAYER_TIMER);
        cx.world.set_sprinting(cx.agent.id, false);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Following)
    }
}

/// Idle near the followed player until they move off
#[derive(Debug, Default)]
pub struct ChillWithPlayer {
    core: StateCore,
    routines: SearchRoutines,
}

impl ChillWithPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for ChillWithPlayer {
    fn kind(&self) -> StateKind {
        StateKind::ChillWithPlayer
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        cx.world.stop(cx.agent.id);
        self.routines.start_look_around();
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }

        let Some(player) = target_player(cx) else {
            cx.agent.target_player = None;
            return Transition::to(SearchingForPlayer::new());
        };
        if player.is_dead {
            return Transition::to(RescuePlayer::new(player.id));
        }

        cx.agent.last_known_position = Some(player.position);
        if flat_distance(cx.position(), player.position) > cx.config.follow_leash {
            return Transition::to(GetCloseToPlayer::new());
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

/// Walk to where the player was last seen and look around
#[derive(Debug, Default)]
pub struct JustLostPlayer {
    core: StateCore,
    routines: SearchRoutines,
    arrived: bool,
}

impl JustLostPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AIState for JustLostPlayer {
    fn kind(&self) -> StateKind {
        StateKind::JustLostPlayer
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(last_known) = cx.agent.last_known_position else {
            return Transition::to(SearchingForPlayer::new());
        };
        let me = cx.agent.id;
        cx.world.set_destination(me, last_known);
        cx.world.move_to_destination(me);
        let now = cx.now();
        cx.agent.timers.start(JUST_LOST_TIMER, now);
        self.arrived = false;
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        if let Some(next) = take_order(cx, self.kind()) {
            return next;
        }

        if let Some(player) =
            cx.world
                .find_player_in_view(cx.agent.id, cx.config.sight_fov_degrees, cx.config.sight_range)
        {
            cx.agent.target_player = Some(player.id);
            cx.agent.last_known_position = Some(player.position);
            return Transition::to(GetCloseToPlayer::new());
        }

        if cx
            .agent
            .timers
            .has_elapsed(JUST_LOST_TIMER, cx.now(), cx.config.just_lost_give_up_secs)
        {
            debug!(agent = %cx.agent.id, "gave up on lost player");
            cx.agent.target_player = None;
            return Transition::to(SearchingForPlayer::new());
        }

        let Some(last_known) = cx.agent.last_known_position else {
            return Transition::to(SearchingForPlayer::new());
        };
        if !self.arrived && flat_distance(cx.position(), last_known) <= cx.config.interact_reach {
            self.arrived = true;
            cx.world.stop(cx.agent.id);
            self.routines.start_look_around();
        }
        self.routines.drive(cx);
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        self.routines.cancel();
        cx.agent.timers.stop(JUST_LOST_TIMER);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::LostPlayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::harness::{target_kind, Harness};
    use glam::Vec3;

    /// Agent west of a full-height wall, player on the far side
    fn walled_off() -> (Harness, crate::core::types::EntityId) {
        let mut h = Harness::open(30, 30);
        h.world.block_rect(10, 0, 10, 29);
        let player = h.world.add_player("ana", Vec3::new(20.5, 0.0, 2.5));
        h.agent.target_player = Some(player);
        h.agent.last_known_position = Some(Vec3::new(20.5, 0.0, 2.5));
        (h, player)
    }

    #[test]
    fn test_search_spots_player_in_view() {
        let mut h = Harness::open(30, 30);
        let player = h.world.add_player("ana", Vec3::new(10.5, 0.0, 2.5));
        let mut state = SearchingForPlayer::new();
        assert!(h.enter(&mut state).is_stay());

        let next = h.tick(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::GetCloseToPlayer));
        assert_eq!(h.agent.target_player, Some(player));
    }

    #[test]
    fn test_pursuit_out_of_sight_becomes_just_lost() {
        let (mut h, _) = walled_off();
        let mut state = GetCloseToPlayer::new();
        assert!(h.enter(&mut state).is_stay());

        // 3 s at 0.2 s per tick
        for _ in 0..14 {
            assert!(h.tick(&mut state).is_stay());
        }
        let next = h.tick_until_transition(&mut state, 5);
        assert_eq!(target_kind(&next), Some(StateKind::JustLostPlayer));
    }

    #[test]
    fn test_just_lost_gives_up_and_searches() {
        let (mut h, _) = walled_off();
        let mut state = JustLostPlayer::new();
        assert!(h.enter(&mut state).is_stay());

        for _ in 0..55 {
            assert!(h.tick(&mut state).is_stay());
        }
        let next = h.tick_until_transition(&mut state, 10);
        assert_eq!(target_kind(&next), Some(StateKind::SearchingForPlayer));
        assert!(h.agent.target_player.is_none());
    }

    #[test]
    fn test_just_lost_without_last_known_searches_at_once() {
        let mut h = Harness::open(30, 30);
        let mut state = JustLostPlayer::new();
        let next = h.enter(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::SearchingForPlayer));
    }

    #[test]
    fn test_chill_follows_again_past_leash() {
        let mut h = Harness::open(40, 30);
        let player = h.world.add_player("ana", Vec3::new(6.5, 0.0, 2.5));
        h.agent.target_player = Some(player);
        let mut state = ChillWithPlayer::new();
        assert!(h.enter(&mut state).is_stay());
        assert!(h.tick(&mut state).is_stay());

        if let Some(p) = h.world.player_mut(player) {
            p.position = Vec3::new(25.5, 0.0, 2.5);
        }
        let next = h.tick(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::GetCloseToPlayer));
    }

    #[test]
    fn test_downed_player_means_rescue() {
        let mut h = Harness::open(30, 30);
        let player = h.world.add_player("ana", Vec3::new(6.5, 0.0, 2.5));
        h.agent.target_player = Some(player);
        let mut state = GetCloseToPlayer::new();
        assert!(h.enter(&mut state).is_stay());
        if let Some(p) = h.world.player_mut(player) {
            p.is_dead = true;
        }
        let next = h.tick(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::RescuePlayer));
    }
}
