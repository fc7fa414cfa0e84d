//! Threat classification
//!
//! Turns a raw enemy encounter into a graded danger distance. The same
//! enemy gets different thresholds depending on who is asking (fleeing,
//! rescue eligibility, path avoidance) and on the enemy's own behaviour
//! sub-state, so every behaviour asks the registry instead of carrying
//! per-enemy special cases.

pub mod assess;
pub mod profiles;
pub mod registry;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::weapons::WeaponKind;
use crate::core::types::EntityId;
use crate::providers::{EnemySnapshot, PlayerSnapshot};

pub use assess::{most_urgent_threat, ThreatSighting};
pub use profiles::{load_threat_tuning, DangerRule, KindTuning, ThreatTuning};
pub use registry::{DangerFn, KindTraits, ThreatProfile, ThreatRegistry};

/// Enemy kind identifier (e.g. "hound", "giant")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyKind(pub String);

impl EnemyKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which subsystem is asking about danger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FearPurpose {
    Flee,
    Rescue,
    PathAvoidance,
}

/// The asking agent, reduced to what threat functions may read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: EntityId,
    pub position: Vec3,
    pub health: i32,
    pub held_weapon: Option<WeaponKind>,
    pub inside_facility: bool,
}

/// Input to a threat function
#[derive(Debug, Clone, Copy)]
pub struct FearQuery<'a> {
    pub agent: &'a AgentSnapshot,
    pub enemy: &'a EnemySnapshot,
    /// Player the question is about (rescue target, escorted player)
    pub subject: Option<&'a PlayerSnapshot>,
    pub purpose: FearPurpose,
}

impl<'a> FearQuery<'a> {
    pub fn new(agent: &'a AgentSnapshot, enemy: &'a EnemySnapshot, purpose: FearPurpose) -> Self {
        Self {
            agent,
            enemy,
            subject: None,
            purpose,
        }
    }

    pub fn with_subject(mut self, subject: &'a PlayerSnapshot) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Is the enemy hunting the agent or the subject player?
    pub fn enemy_targets_us(&self) -> bool {
        match self.enemy.target {
            Some(target) => {
                target == self.agent.id || self.subject.is_some_and(|p| p.id == target)
            }
            None => false,
        }
    }
}
