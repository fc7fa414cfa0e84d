//! Weapons and the attack loop

pub mod engine;
pub mod weapons;

pub use engine::{can_fight_and_win, choose_weapon_slot, CombatEngine, CombatOutcome};
pub use weapons::{WeaponKind, WeaponProfile};
