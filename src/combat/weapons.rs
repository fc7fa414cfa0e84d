//! Weapon catalogue
//!
//! A closed set of weapon kinds, each with a fixed profile. The combat
//! engine reads only the profile; nothing else branches on the kind.

use serde::{Deserialize, Serialize};

/// Every weapon an agent can pick up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Pump shotgun: two shells, safety catch
    Shotgun,
    /// Sidearm with a small magazine
    Pistol,
    /// Long gun, slow but reaches far
    Rifle,
    Knife,
    Shovel,
    /// Electric baton, melee
    StunBaton,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 6] = [
        WeaponKind::Shotgun,
        WeaponKind::Pistol,
        WeaponKind::Rifle,
        WeaponKind::Knife,
        WeaponKind::Shovel,
        WeaponKind::StunBaton,
    ];

    pub fn profile(&self) -> WeaponProfile {
        match self {
            WeaponKind::Shotgun => WeaponProfile {
                magazine: 2,
                ranged: true,
                range: 15.0,
                fov_degrees: 20.0,
                attack_interval_secs: 1.0,
                uses_ammo: true,
                has_safety: true,
                damage: 3,
            },
            WeaponKind::Pistol => WeaponProfile {
                magazine: 8,
                ranged: true,
                range: 25.0,
                fov_degrees: 10.0,
                attack_interval_secs: 0.6,
                uses_ammo: true,
                has_safety: false,
                damage: 1,
            },
            WeaponKind::Rifle => WeaponProfile {
                magazine: 5,
                ranged: true,
                range: 40.0,
                fov_degrees: 6.0,
                attack_interval_secs: 1.5,
                uses_ammo: true,
                has_safety: true,
                damage: 3,
            },
            WeaponKind::Knife => WeaponProfile {
                magazine: 0,
                ranged: false,
                range: 1.5,
                fov_degrees: 60.0,
                attack_interval_secs: 0.4,
                uses_ammo: false,
                has_safety: false,
                damage: 1,
            },
            WeaponKind::Shovel => WeaponProfile {
                magazine: 0,
                ranged: false,
                range: 2.0,
                fov_degrees: 70.0,
                attack_interval_secs: 1.2,
                uses_ammo: false,
                has_safety: false,
                damage: 2,
            },
            WeaponKind::StunBaton => WeaponProfile {
                magazine: 0,
                ranged: false,
                range: 1.8,
                fov_degrees: 60.0,
                attack_interval_secs: 0.8,
                uses_ammo: false,
                has_safety: false,
                damage: 1,
            },
        }
    }

    pub fn is_ranged(&self) -> bool {
        self.profile().ranged
    }
}

/// How a weapon is aimed and timed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub ranged: bool,
    /// Maximum effective distance
    pub range: f32,
    /// Aim cone the target must be inside (degrees, full angle)
    pub fov_degrees: f32,
    /// Seconds between two uses
    pub attack_interval_secs: f32,
    pub uses_ammo: bool,
    /// Must be switched off safety before firing
    pub has_safety: bool,
    /// Health removed per hit
    pub damage: i32,
    /// Rounds a full reload chambers (0 for melee)
    pub magazine: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranged_weapons_use_ammo() {
        for kind in WeaponKind::ALL {
            let profile = kind.profile();
            assert_eq!(profile.ranged, profile.uses_ammo, "{:?}", kind);
        }
    }

    #[test]
    fn test_melee_is_short() {
        for kind in WeaponKind::ALL.iter().filter(|k| !k.is_ranged()) {
            assert!(kind.profile().range <= 2.0);
        }
    }

    #[test]
    fn test_intervals_positive() {
        assert!(WeaponKind::ALL
            .iter()
            .all(|k| k.profile().attack_interval_secs > 0.0));
    }
}
