//! Standing ground against one enemy with a chosen weapon

use tracing::{debug, info};

use crate::agent::context::TickContext;
use crate::agent::tasks::{Cooperative, TaskScope};
use crate::combat::{can_fight_and_win, CombatEngine, CombatOutcome};
use crate::core::types::{flat_distance, EntityId};
use crate::messaging::MessagePriority;
use crate::providers::VoiceHint;
use crate::states::{AIState, Panicking, StateCore, StateKind, Transition};

const LOST_SIGHT_TIMER: &str = "fight_lost_sight";

#[derive(Debug)]
pub struct FightEnemy {
    core: StateCore,
    enemy: EntityId,
    slot: usize,
    scope: TaskScope,
    engine: Option<Cooperative<CombatEngine>>,
}

impl FightEnemy {
    pub fn new(enemy: EntityId, slot: usize) -> Self {
        Self {
            core: StateCore::new(),
            enemy,
            slot,
            scope: TaskScope::new(),
            engine: None,
        }
    }

    pub fn enemy(&self) -> EntityId {
        self.enemy
    }

    /// Inventory slot of the weapon in use
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Attacks made with the current weapon
    pub fn attacks(&self) -> u32 {
        self.engine.as_ref().map_or(0, |e| e.task().attacks())
    }

    fn start_engine(&mut self) {
        self.scope.cancel_all();
        self.engine = Some(Cooperative::spawn(CombatEngine::new(self.enemy, self.slot), &mut self.scope));
    }
}

impl AIState for FightEnemy {
    fn kind(&self) -> StateKind {
        StateKind::FightEnemy
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(enemy) = cx.world.enemy(self.enemy).filter(|e| !e.is_dead) else {
            return Transition::Resume;
        };
        info!(agent = %cx.agent.id, enemy = %enemy.id, kind = %enemy.kind, slot = self.slot, "engaging");
        cx.agent.target_enemy = Some(enemy.id);
        cx.agent.slots.weapon = Some(self.slot);
        cx.world.set_sprinting(cx.agent.id, false);
        cx.say(format!("Taking on the {}", enemy.kind), MessagePriority::High);
        self.start_engine();
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(enemy) = cx.world.enemy(self.enemy) else {
            return Transition::Resume;
        };
        let me = cx.agent.id;

        if !enemy.is_dead {
            if flat_distance(cx.position(), enemy.position) > cx.config.fight_disengage_distance {
                debug!(agent = %me, enemy = %enemy.id, "enemy out of range, disengaging");
                return Transition::Resume;
            }

            let now = cx.now();
            let sees = cx.world.can_see(
                me,
                enemy.position,
                cx.config.sight_fov_degrees,
                cx.config.sight_range,
            ) || cx.world.line_of_sight(cx.position(), enemy.eye);
            if sees {
                cx.agent.timers.stop(LOST_SIGHT_TIMER);
            } else {
                cx.agent.timers.start_if_stopped(LOST_SIGHT_TIMER, now);
                if cx.agent.timers.has_elapsed(LOST_SIGHT_TIMER, now, cx.config.fight_lost_sight_secs) {
                    debug!(agent = %me, enemy = %enemy.id, "lost sight of enemy");
                    return Transition::Resume;
                }
            }
        }

        if self.engine.is_none() {
            self.start_engine();
        }
        let mut outcome = CombatOutcome::Engaging;
        if let Some(engine) = self.engine.as_mut() {
            engine.drive(cx);
            outcome = engine.task().outcome();
        }

        match outcome {
            CombatOutcome::Engaging => Transition::Stay,
            CombatOutcome::TargetDead => {
                info!(agent = %me, enemy = %self.enemy, kind = %enemy.kind, "enemy down");
                cx.say(format!("Got the {}", enemy.kind), MessagePriority::Normal);
                Transition::Resume
            }
            CombatOutcome::TargetGone => Transition::Resume,
            CombatOutcome::OutOfAmmo | CombatOutcome::NoWeapon => match can_fight_and_win(cx, &enemy) {
                Some(slot) => {
                    debug!(agent = %me, from = self.slot, to = slot, ?outcome, "switching weapon");
                    self.slot = slot;
                    cx.agent.slots.weapon = Some(slot);
                    self.start_engine();
                    Transition::Stay
                }
                None => {
                    cx.say("Out of options, running!", MessagePriority::Critical);
                    Transition::replace(Panicking::without_fight(self.enemy))
                }
            },
        }
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        self.scope.cancel_all();
        self.engine = None;
        cx.agent.timers.stop(LOST_SIGHT_TIMER);
        cx.agent.target_enemy = None;
        cx.world.stop(cx.agent.id);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Fighting)
    }

    fn on_signal(&mut self, _cx: &mut TickContext<'_>, _text: &str) -> Transition {
        Transition::Stay
    }

    fn on_chat(&mut self, _cx: &mut TickContext<'_>, _text: &str, _sender: EntityId) -> Transition {
        Transition::Stay
    }

    fn engaged_enemy(&self) -> Option<EntityId> {
        Some(self.enemy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::WeaponKind;
    use crate::providers::ItemKind;
    use crate::sandbox::harness::{target_kind, Harness};
    use glam::Vec3;

    /// Agent in the corner facing a crawler eight cells away
    fn facing_crawler(health: i32) -> (Harness, EntityId) {
        let mut h = Harness::open(60, 30);
        let crawler = h.world.add_enemy("crawler", Vec3::new(10.5, 0.0, 2.5));
        if let Some(enemy) = h.world.enemy_mut(crawler) {
            enemy.health = health;
        }
        (h, crawler)
    }

    #[test]
    fn test_kill_resumes_and_reports() {
        let (mut h, crawler) = facing_crawler(1);
        let me = h.id();
        h.world.give_weapon(me, WeaponKind::Pistol, 6, 0);
        let mut state = FightEnemy::new(crawler, 0);
        assert!(h.enter(&mut state).is_stay());
        assert_eq!(h.agent.target_enemy, Some(crawler));

        let next = h.tick_until_transition(&mut state, 5);
        assert!(matches!(next, Transition::Resume));
        assert_eq!(state.attacks(), 1);
        assert!(h.said().contains(&"Got the crawler".to_string()));
    }

    #[test]
    fn test_empty_gun_falls_back_to_melee() {
        let (mut h, crawler) = facing_crawler(100);
        let me = h.id();
        h.world.give_weapon(me, WeaponKind::Pistol, 0, 0);
        h.world.give_item(me, ItemKind::Weapon(WeaponKind::Knife), 5);
        let mut state = FightEnemy::new(crawler, 0);
        h.enter(&mut state);

        assert!(h.tick(&mut state).is_stay());
        assert_eq!(state.slot(), 1);
        assert_eq!(h.agent.slots.weapon, Some(1));
    }

    #[test]
    fn test_no_usable_weapon_turns_into_flight() {
        let (mut h, crawler) = facing_crawler(100);
        let me = h.id();
        h.world.give_weapon(me, WeaponKind::Pistol, 0, 0);
        let mut state = FightEnemy::new(crawler, 0);
        h.enter(&mut state);

        let next = h.tick(&mut state);
        assert_eq!(target_kind(&next), Some(StateKind::Panicking));
        assert!(matches!(next, Transition::Replace(_)));
        assert!(h.said().contains(&"Out of options, running!".to_string()));
    }

    #[test]
    fn test_distant_enemy_is_dropped() {
        let mut h = Harness::open(60, 30);
        let me = h.id();
        h.world.give_weapon(me, WeaponKind::Rifle, 5, 5);
        let crawler = h.world.add_enemy("crawler", Vec3::new(45.5, 0.0, 2.5));
        let mut state = FightEnemy::new(crawler, 0);
        assert!(h.enter(&mut state).is_stay());

        assert!(matches!(h.tick(&mut state), Transition::Resume));
    }

    #[test]
    fn test_lost_sight_gives_up_after_grace() {
        let (mut h, crawler) = facing_crawler(100);
        let me = h.id();
        h.world.give_weapon(me, WeaponKind::Pistol, 6, 6);
        h.world.block_rect(6, 0, 6, 29);
        let mut state = FightEnemy::new(crawler, 0);
        h.enter(&mut state);

        // Four seconds of grace at five ticks a second
        for _ in 0..15 {
            assert!(h.tick(&mut state).is_stay());
        }
        let next = h.tick_until_transition(&mut state, 15);
        assert!(matches!(next, Transition::Resume));
        assert_eq!(state.attacks(), 0);
    }

    #[test]
    fn test_gone_enemy_resumes() {
        let (mut h, crawler) = facing_crawler(100);
        let me = h.id();
        h.world.give_weapon(me, WeaponKind::Pistol, 6, 6);
        let mut state = FightEnemy::new(crawler, 0);
        h.enter(&mut state);

        h.world.remove_enemy(crawler);
        assert!(matches!(h.tick(&mut state), Transition::Resume));
    }
}
