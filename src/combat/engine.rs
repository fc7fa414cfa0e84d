//! Cooperative attack loop
//!
//! One resume is one combat cycle: make sure the chosen weapon is in hand,
//! line up on the target, satisfy the weapon's preconditions, attack, then
//! wait out the weapon's attack interval. The owning Fight state reads the
//! outcome after every drive and cancels the task on exit.

use tracing::{debug, trace};

use crate::agent::context::TickContext;
use crate::agent::tasks::{SubTask, TaskPoll, Wait};
use crate::core::types::{flat_distance, EntityId};
use crate::providers::inventory::{InventoryProvider, ItemView};
use crate::providers::EnemySnapshot;
use crate::threat::KindTraits;

/// What the engine reports back to the Fight state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    /// Still working on it
    Engaging,
    TargetDead,
    /// Enemy no longer resolvable
    TargetGone,
    /// Firearm empty with nothing left in reserve
    OutOfAmmo,
    /// Chosen slot no longer holds a weapon
    NoWeapon,
}

#[derive(Debug)]
pub struct CombatEngine {
    enemy: EntityId,
    slot: usize,
    outcome: CombatOutcome,
    attacks: u32,
}

impl CombatEngine {
    pub fn new(enemy: EntityId, slot: usize) -> Self {
        Self {
            enemy,
            slot,
            outcome: CombatOutcome::Engaging,
            attacks: 0,
        }
    }

    pub fn enemy(&self) -> EntityId {
        self.enemy
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn outcome(&self) -> CombatOutcome {
        self.outcome
    }

    /// Attacks triggered so far
    pub fn attacks(&self) -> u32 {
        self.attacks
    }

    fn finish(&mut self, outcome: CombatOutcome) -> TaskPoll {
        self.outcome = outcome;
        TaskPoll::Complete
    }
}

impl SubTask for CombatEngine {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn resume(&mut self, cx: &mut TickContext<'_>) -> TaskPoll {
        let me = cx.agent.id;

        let Some(enemy) = cx.world.enemy(self.enemy) else {
            return self.finish(CombatOutcome::TargetGone);
        };
        if enemy.is_dead {
            return self.finish(CombatOutcome::TargetDead);
        }

        let item = cx.world.slots(me).into_iter().nth(self.slot).flatten();
        let Some((item, kind)) = item.and_then(|i| i.weapon_kind().map(|k| (i, k))) else {
            return self.finish(CombatOutcome::NoWeapon);
        };

        if cx.world.held_slot(me) != self.slot {
            debug!(agent = %me, slot = self.slot, weapon = ?kind, "switching to weapon");
            cx.world.switch_slot(me, self.slot);
            return TaskPoll::Yield(Wait::NextTick);
        }

        let profile = kind.profile();
        let position = cx.position();
        let distance = flat_distance(position, enemy.position);

        // Out of reach or no clear shot: close in and face the target
        if distance > profile.range || !cx.world.line_of_sight(position, enemy.eye) {
            cx.world.set_destination(me, enemy.position);
            cx.world.move_to_destination(me);
            cx.world.look_at(me, enemy.position);
            return TaskPoll::Yield(Wait::NextTick);
        }

        if !cx.world.can_see(me, enemy.position, profile.fov_degrees, profile.range) {
            cx.world.look_at(me, enemy.position);
            return TaskPoll::Yield(Wait::NextTick);
        }

        if profile.ranged {
            cx.world.stop(me);
        }

        if profile.uses_ammo {
            let state = item.weapon.unwrap_or_default();
            if !state.has_any_ammo() {
                return self.finish(CombatOutcome::OutOfAmmo);
            }
            if profile.has_safety && state.safety_on {
                cx.world.toggle_safety(me);
                return TaskPoll::Yield(Wait::NextTick);
            }
            if state.chambered == 0 {
                cx.world.reload(me);
                return TaskPoll::Yield(Wait::Seconds(profile.attack_interval_secs));
            }
        }

        if cx.world.use_held(me, enemy.position) {
            self.attacks += 1;
            trace!(agent = %me, enemy = %enemy.id, attacks = self.attacks, "attack");
        }
        TaskPoll::Yield(Wait::Seconds(profile.attack_interval_secs))
    }
}

/// Pick the slot to fight `kind` with
///
/// Ranged weapons with ammunition are preferred. Against swarm kinds a
/// melee weapon goes first so rounds are not wasted on small targets.
/// Unkillable kinds get `None`.
pub fn choose_weapon_slot<I: InventoryProvider + ?Sized>(
    inventory: &I,
    agent: EntityId,
    traits: KindTraits,
) -> Option<usize> {
    if !traits.killable {
        return None;
    }

    let slots = inventory.slots(agent);
    let usable = |ranged: bool| {
        slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|i| (slot, i)))
            .filter(|(_, item)| weapon_usable(item, ranged))
            .max_by_key(|(_, item)| item.weapon_kind().map(|k| k.profile().damage).unwrap_or(0))
            .map(|(slot, _)| slot)
    };

    let ranged = usable(true);
    let melee = if traits.melee_killable { usable(false) } else { None };

    if traits.swarm {
        melee.or(ranged)
    } else {
        ranged.or(melee)
    }
}

fn weapon_usable(item: &ItemView, ranged: bool) -> bool {
    match item.weapon_kind() {
        Some(kind) if kind.is_ranged() == ranged => {
            !ranged || item.weapon.is_some_and(|w| w.has_any_ammo())
        }
        _ => false,
    }
}

/// Slot to fight with if the agent can take this enemy on
pub fn can_fight_and_win(cx: &TickContext<'_>, enemy: &EnemySnapshot) -> Option<usize> {
    if enemy.is_dead || cx.world.agent_status(cx.agent.id).health <= 0 {
        return None;
    }
    let traits = cx.threats.traits(&enemy.kind);
    choose_weapon_slot(&*cx.world, cx.agent.id, traits)
}
