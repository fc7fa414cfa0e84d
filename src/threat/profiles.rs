//! Threat tuning loaded from TOML
//!
//! Danger thresholds are tuning data, not engine logic. Each enemy kind
//! carries one `DangerRule` per purpose plus a few combat traits; the
//! registry turns the rules into danger functions.
//!
//! Loads from `data/threat_profiles.toml` by default.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::threat::registry::{KindTraits, ThreatRegistry};
use crate::threat::{EnemyKind, FearQuery};

/// Danger distance rule for one purpose
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerRule {
    /// Distance while the enemy is calm; `None` = harmless while calm
    pub distance: Option<f32>,
    /// Behaviour sub-state at or above which the enemy counts as aggroed
    pub aggro_state: Option<u8>,
    /// Distance once aggroed; falls back to `distance` when unset
    pub aggro_distance: Option<f32>,
    /// Only dangerous while hunting the agent (or the subject player)
    pub only_when_targeting: bool,
}

impl DangerRule {
    /// A rule that always yields `distance`
    pub fn always(distance: f32) -> Self {
        Self {
            distance: Some(distance),
            ..Self::default()
        }
    }

    /// Harmless while calm, `distance` once aggroed
    pub fn when_aggro(aggro_state: u8, distance: f32) -> Self {
        Self {
            distance: None,
            aggro_state: Some(aggro_state),
            aggro_distance: Some(distance),
            only_when_targeting: false,
        }
    }

    pub fn evaluate(&self, query: &FearQuery<'_>) -> Option<f32> {
        if self.only_when_targeting && !query.enemy_targets_us() {
            return None;
        }
        match self.aggro_state {
            Some(threshold) if query.enemy.behaviour_state >= threshold => {
                self.aggro_distance.or(self.distance)
            }
            _ => self.distance,
        }
    }
}

/// Complete tuning for one enemy kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindTuning {
    pub flee: DangerRule,
    pub rescue: DangerRule,
    pub path_avoidance: DangerRule,
    pub killable: bool,
    pub melee_killable: bool,
    pub swarm: bool,
}

impl KindTuning {
    fn traits(&self) -> KindTraits {
        KindTraits {
            killable: self.killable,
            melee_killable: self.melee_killable,
            swarm: self.swarm,
        }
    }
}

/// Tuning for every known enemy kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatTuning {
    pub kinds: BTreeMap<String, KindTuning>,
}

impl Default for ThreatTuning {
    fn default() -> Self {
        let mut kinds = BTreeMap::new();

        // Blind hound: ignores you until it hears you, then runs you down
        kinds.insert(
            "hound".to_string(),
            KindTuning {
                flee: DangerRule {
                    distance: Some(8.0),
                    aggro_state: Some(1),
                    aggro_distance: Some(25.0),
                    only_when_targeting: false,
                },
                rescue: DangerRule::always(12.0),
                path_avoidance: DangerRule::always(10.0),
                killable: true,
                melee_killable: true,
                swarm: false,
            },
        );

        // Stalker: only a problem once it has picked you
        kinds.insert(
            "stalker".to_string(),
            KindTuning {
                flee: DangerRule {
                    distance: Some(15.0),
                    only_when_targeting: true,
                    ..DangerRule::default()
                },
                rescue: DangerRule::always(10.0),
                path_avoidance: DangerRule::always(6.0),
                killable: true,
                melee_killable: true,
                swarm: false,
            },
        );

        // Giant: cannot be fought, seen from far away
        kinds.insert(
            "giant".to_string(),
            KindTuning {
                flee: DangerRule::always(40.0),
                rescue: DangerRule::always(30.0),
                path_avoidance: DangerRule::always(30.0),
                killable: false,
                melee_killable: false,
                swarm: false,
            },
        );

        // Crawler: fast and aggressive, dies to anything
        kinds.insert(
            "crawler".to_string(),
            KindTuning {
                flee: DangerRule::always(20.0),
                rescue: DangerRule::always(15.0),
                path_avoidance: DangerRule::always(12.0),
                killable: true,
                melee_killable: true,
                swarm: false,
            },
        );

        // Swarm: lots of small biters; melee is enough, bullets are wasted
        kinds.insert(
            "swarm".to_string(),
            KindTuning {
                flee: DangerRule::always(8.0),
                rescue: DangerRule::always(6.0),
                path_avoidance: DangerRule::always(5.0),
                killable: true,
                melee_killable: true,
                swarm: true,
            },
        );

        // Turret: only shoots once it is tracking something
        kinds.insert(
            "turret".to_string(),
            KindTuning {
                flee: DangerRule::when_aggro(1, 15.0),
                rescue: DangerRule::always(15.0),
                path_avoidance: DangerRule::always(15.0),
                killable: false,
                melee_killable: false,
                swarm: false,
            },
        );

        // Lurker: freezes when watched, kills when not
        kinds.insert(
            "lurker".to_string(),
            KindTuning {
                flee: DangerRule::always(10.0),
                rescue: DangerRule::always(10.0),
                path_avoidance: DangerRule::always(8.0),
                killable: false,
                melee_killable: false,
                swarm: false,
            },
        );

        Self { kinds }
    }
}

impl ThreatTuning {
    /// Reject negative distances before they reach the registry
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, kind) in &self.kinds {
            for rule in [&kind.flee, &kind.rescue, &kind.path_avoidance] {
                let distances = [rule.distance, rule.aggro_distance];
                if distances.iter().flatten().any(|d| !d.is_finite() || *d < 0.0) {
                    return Err(format!("kind '{}' has a negative or non-finite distance", name));
                }
            }
        }
        Ok(())
    }
}

impl ThreatRegistry {
    /// Build a registry with one profile per tuned kind
    pub fn from_tuning(tuning: &ThreatTuning) -> Self {
        let mut registry = ThreatRegistry::new();
        for (name, kind) in &tuning.kinds {
            let flee = Arc::new(kind.flee.clone());
            let rescue = Arc::new(kind.rescue.clone());
            let path = Arc::new(kind.path_avoidance.clone());
            registry.register(
                EnemyKind::new(name.clone()),
                move |q| flee.evaluate(q),
                move |q| rescue.evaluate(q),
                move |q| path.evaluate(q),
            );
            registry.set_traits(EnemyKind::new(name.clone()), kind.traits());
        }
        registry
    }
}

/// Load threat tuning from a TOML file
pub fn load_threat_tuning(path: &Path) -> Result<ThreatTuning> {
    let contents = fs::read_to_string(path)?;
    let tuning: ThreatTuning = toml::from_str(&contents)?;
    tuning
        .validate()
        .map_err(crate::core::error::AgentError::Config)?;
    Ok(tuning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EntityId;
    use crate::providers::{EnemySnapshot, PlayerSnapshot};
    use crate::threat::{AgentSnapshot, FearPurpose};
    use glam::Vec3;

    fn agent() -> AgentSnapshot {
        AgentSnapshot {
            id: EntityId::new(),
            position: Vec3::ZERO,
            health: 100,
            held_weapon: None,
            inside_facility: true,
        }
    }

    fn enemy(kind: &str) -> EnemySnapshot {
        EnemySnapshot {
            id: EntityId::new(),
            kind: EnemyKind::new(kind),
            position: Vec3::new(5.0, 0.0, 0.0),
            eye: Vec3::new(5.0, 1.0, 0.0),
            is_dead: false,
            behaviour_state: 0,
            target: None,
            health: 3,
        }
    }

    #[test]
    fn test_hound_only_far_reaching_once_aggro() {
        let registry = ThreatRegistry::from_tuning(&ThreatTuning::default());
        let agent = agent();
        let mut hound = enemy("hound");
        assert_eq!(registry.query(&FearQuery::new(&agent, &hound, FearPurpose::Flee)), Some(8.0));
        hound.behaviour_state = 2;
        assert_eq!(registry.query(&FearQuery::new(&agent, &hound, FearPurpose::Flee)), Some(25.0));
    }

    #[test]
    fn test_stalker_needs_target() {
        let registry = ThreatRegistry::from_tuning(&ThreatTuning::default());
        let agent = agent();
        let mut stalker = enemy("stalker");
        assert_eq!(registry.query(&FearQuery::new(&agent, &stalker, FearPurpose::Flee)), None);
        stalker.target = Some(agent.id);
        assert_eq!(registry.query(&FearQuery::new(&agent, &stalker, FearPurpose::Flee)), Some(15.0));
    }

    #[test]
    fn test_stalker_targeting_subject_counts() {
        let registry = ThreatRegistry::from_tuning(&ThreatTuning::default());
        let agent = agent();
        let player = PlayerSnapshot {
            id: EntityId::new(),
            name: "ana".into(),
            position: Vec3::ZERO,
            is_dead: false,
            inside_facility: true,
        };
        let mut stalker = enemy("stalker");
        stalker.target = Some(player.id);
        let query = FearQuery::new(&agent, &stalker, FearPurpose::Flee).with_subject(&player);
        assert_eq!(registry.query(&query), Some(15.0));
    }

    #[test]
    fn test_turret_harmless_until_tracking() {
        let registry = ThreatRegistry::from_tuning(&ThreatTuning::default());
        let agent = agent();
        let mut turret = enemy("turret");
        assert_eq!(registry.query(&FearQuery::new(&agent, &turret, FearPurpose::Flee)), None);
        turret.behaviour_state = 1;
        assert_eq!(registry.query(&FearQuery::new(&agent, &turret, FearPurpose::Flee)), Some(15.0));
    }

    #[test]
    fn test_traits_follow_tuning() {
        let registry = ThreatRegistry::from_tuning(&ThreatTuning::default());
        assert!(registry.traits(&EnemyKind::new("swarm")).swarm);
        assert!(!registry.traits(&EnemyKind::new("giant")).killable);
    }

    #[test]
    fn test_validate_rejects_negative() {
        let mut tuning = ThreatTuning::default();
        tuning.kinds.get_mut("giant").unwrap().flee.distance = Some(-1.0);
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_load_shipped_tuning() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/threat_profiles.toml");
        let tuning = load_threat_tuning(&path).expect("shipped tuning should load");
        assert!(tuning.kinds.contains_key("hound"));
        assert!(tuning.kinds.contains_key("swarm"));
    }
}
