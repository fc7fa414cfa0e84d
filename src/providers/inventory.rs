//! Inventory provider: slot-indexed item access and item-use triggers

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::weapons::WeaponKind;
use crate::core::types::EntityId;

/// What an item is, as far as decisions care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Valuable loot with no use of its own
    Scrap,
    Weapon(WeaponKind),
    Key,
    /// Tool with a rechargeable battery
    BatteryTool,
}

/// Ammunition and safety state of a held firearm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponState {
    /// Rounds loaded and ready to fire
    pub chambered: u32,
    /// Rounds carried for reloading
    pub reserve: u32,
    pub safety_on: bool,
}

impl WeaponState {
    pub fn has_any_ammo(&self) -> bool {
        self.chambered > 0 || self.reserve > 0
    }
}

/// Point-in-time view of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: EntityId,
    pub kind: ItemKind,
    /// Position when lying loose; `None` while carried
    pub position: Option<Vec3>,
    pub value: u32,
    /// Present for firearms only
    pub weapon: Option<WeaponState>,
    /// Battery charge 0.0..=1.0 for battery tools
    pub charge: Option<f32>,
}

impl ItemView {
    pub fn weapon_kind(&self) -> Option<WeaponKind> {
        match self.kind {
            ItemKind::Weapon(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_valuable(&self) -> bool {
        matches!(self.kind, ItemKind::Scrap) && self.value > 0
    }
}

pub trait InventoryProvider {
    /// Inventory slots; `None` is an empty slot
    fn slots(&self, agent: EntityId) -> Vec<Option<ItemView>>;

    /// Index of the slot currently in hand
    fn held_slot(&self, agent: EntityId) -> usize;

    fn switch_slot(&mut self, agent: EntityId, slot: usize) -> bool;

    /// Pick up a loose item into the first free slot
    fn grab(&mut self, agent: EntityId, item: EntityId) -> bool;

    /// Drop whatever is in hand; returns the dropped item
    fn drop_held(&mut self, agent: EntityId) -> Option<EntityId>;

    /// Weapon-use trigger (fire or swing) aimed at `target`
    fn use_held(&mut self, agent: EntityId, target: Vec3) -> bool;

    fn toggle_safety(&mut self, agent: EntityId) -> bool;

    /// Move rounds from reserve into the chamber
    fn reload(&mut self, agent: EntityId) -> bool;

    fn use_key_on(&mut self, agent: EntityId, door: EntityId) -> bool;

    /// Recharge the held battery tool at the charger
    fn charge_held(&mut self, agent: EntityId) -> bool;

    /// Bring a downed player back
    fn revive(&mut self, agent: EntityId, player: EntityId) -> bool;
}

/// Helpers that only read slots
pub fn held_item<I: InventoryProvider + ?Sized>(inventory: &I, agent: EntityId) -> Option<ItemView> {
    let slot = inventory.held_slot(agent);
    inventory.slots(agent).into_iter().nth(slot).flatten()
}

pub fn first_free_slot<I: InventoryProvider + ?Sized>(inventory: &I, agent: EntityId) -> Option<usize> {
    inventory.slots(agent).iter().position(|s| s.is_none())
}

pub fn cargo_value<I: InventoryProvider + ?Sized>(inventory: &I, agent: EntityId) -> u32 {
    inventory
        .slots(agent)
        .iter()
        .flatten()
        .filter(|item| item.is_valuable())
        .map(|item| item.value)
        .sum()
}

pub fn find_slot<I: InventoryProvider + ?Sized>(
    inventory: &I,
    agent: EntityId,
    predicate: impl Fn(&ItemView) -> bool,
) -> Option<usize> {
    inventory
        .slots(agent)
        .iter()
        .position(|slot| slot.as_ref().is_some_and(&predicate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrap(value: u32) -> ItemView {
        ItemView {
            id: EntityId::new(),
            kind: ItemKind::Scrap,
            position: None,
            value,
            weapon: None,
            charge: None,
        }
    }

    #[test]
    fn test_scrap_with_value_is_valuable() {
        assert!(scrap(40).is_valuable());
        assert!(!scrap(0).is_valuable());
    }

    #[test]
    fn test_weapon_kind_only_for_weapons() {
        let mut item = scrap(10);
        assert_eq!(item.weapon_kind(), None);
        item.kind = ItemKind::Weapon(WeaponKind::Shotgun);
        assert_eq!(item.weapon_kind(), Some(WeaponKind::Shotgun));
    }

    #[test]
    fn test_weapon_state_ammo() {
        let empty = WeaponState { chambered: 0, reserve: 0, safety_on: false };
        let spare = WeaponState { chambered: 0, reserve: 2, safety_on: true };
        assert!(!empty.has_any_ammo());
        assert!(spare.has_any_ammo());
    }
}
