//! Enemy-kind to danger-distance lookup
//!
//! Built once by an explicit call and then shared read-only between all
//! agents (`Arc<ThreatRegistry>`). Nothing mutates it after setup.

use std::sync::Arc;

use ahash::AHashMap;
use tracing::warn;

use crate::providers::{EnemySnapshot, PlayerSnapshot};
use crate::threat::{AgentSnapshot, EnemyKind, FearPurpose, FearQuery};

/// Pure danger function: `None` means "not a threat for this purpose"
pub type DangerFn = Arc<dyn Fn(&FearQuery<'_>) -> Option<f32> + Send + Sync>;

/// The three danger functions of one enemy kind
#[derive(Clone)]
pub struct ThreatProfile {
    pub kind: EnemyKind,
    flee: DangerFn,
    rescue: DangerFn,
    path_avoidance: DangerFn,
}

impl ThreatProfile {
    pub fn new(kind: EnemyKind, flee: DangerFn, rescue: DangerFn, path_avoidance: DangerFn) -> Self {
        Self {
            kind,
            flee,
            rescue,
            path_avoidance,
        }
    }

    fn function(&self, purpose: FearPurpose) -> &DangerFn {
        match purpose {
            FearPurpose::Flee => &self.flee,
            FearPurpose::Rescue => &self.rescue,
            FearPurpose::PathAvoidance => &self.path_avoidance,
        }
    }
}

impl std::fmt::Debug for ThreatProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreatProfile").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Combat-relevant facts about a kind (not danger distances)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KindTraits {
    /// Can be killed at all
    pub killable: bool,
    /// Can be killed with melee weapons
    pub melee_killable: bool,
    /// Comes in numbers; melee is preferred over wasting ammunition
    pub swarm: bool,
}

/// Registry of threat profiles keyed by enemy kind
#[derive(Debug, Default, Clone)]
pub struct ThreatRegistry {
    profiles: AHashMap<EnemyKind, ThreatProfile>,
    traits: AHashMap<EnemyKind, KindTraits>,
}

impl ThreatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate an enemy kind with its three danger functions
    ///
    /// Registering a kind twice replaces the earlier profile.
    pub fn register<F, R, P>(&mut self, kind: EnemyKind, flee: F, rescue: R, path_avoidance: P)
    where
        F: Fn(&FearQuery<'_>) -> Option<f32> + Send + Sync + 'static,
        R: Fn(&FearQuery<'_>) -> Option<f32> + Send + Sync + 'static,
        P: Fn(&FearQuery<'_>) -> Option<f32> + Send + Sync + 'static,
    {
        let profile = ThreatProfile::new(kind.clone(), Arc::new(flee), Arc::new(rescue), Arc::new(path_avoidance));
        if self.profiles.insert(kind.clone(), profile).is_some() {
            warn!(%kind, "threat profile registered twice, replacing");
        }
    }

    /// Attach combat traits to a kind
    pub fn set_traits(&mut self, kind: EnemyKind, traits: KindTraits) {
        self.traits.insert(kind, traits);
    }

    /// Danger distance for the query, `None` if no threat
    ///
    /// Unregistered kinds and dead enemies are never a threat. Whatever a
    /// profile function returns, the result is either `None` or a finite
    /// non-negative distance.
    pub fn query(&self, query: &FearQuery<'_>) -> Option<f32> {
        if query.enemy.is_dead {
            return None;
        }
        let profile = self.profiles.get(&query.enemy.kind)?;
        let distance = (profile.function(query.purpose))(query)?;
        if distance.is_finite() && distance >= 0.0 {
            Some(distance)
        } else {
            None
        }
    }

    /// Builds the query and runs it
    pub fn danger_for(
        &self,
        purpose: FearPurpose,
        agent: &AgentSnapshot,
        enemy: &EnemySnapshot,
        subject: Option<&PlayerSnapshot>,
    ) -> Option<f32> {
        let mut query = FearQuery::new(agent, enemy, purpose);
        if let Some(player) = subject {
            query = query.with_subject(player);
        }
        self.query(&query)
    }

    pub fn is_registered(&self, kind: &EnemyKind) -> bool {
        self.profiles.contains_key(kind)
    }

    /// Traits for a kind; unknown kinds are treated as unkillable
    pub fn traits(&self, kind: &EnemyKind) -> KindTraits {
        self.traits.get(kind).copied().unwrap_or_default()
    }

    /// Registered kinds, sorted for stable output
    pub fn kinds(&self) -> Vec<&EnemyKind> {
        let mut kinds: Vec<_> = self.profiles.keys().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EntityId;
    use crate::providers::EnemySnapshot;
    use crate::threat::AgentSnapshot;
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

    fn enemy(kind: &str, behaviour_state: u8) -> EnemySnapshot {
        EnemySnapshot {
            id: EntityId::new(),
            kind: EnemyKind::new(kind),
            position: Vec3::new(10.0, 0.0, 0.0),
            eye: Vec3::new(10.0, 1.5, 0.0),
            is_dead: false,
            behaviour_state,
            target: None,
            health: 3,
        }
    }

    fn registry() -> ThreatRegistry {
        let mut registry = ThreatRegistry::new();
        registry.register(
            EnemyKind::new("hound"),
            |q| if q.enemy.behaviour_state >= 1 { Some(30.0) } else { Some(10.0) },
            |_| Some(8.0),
            |_| None,
        );
        registry
    }

    #[test]
    fn test_unregistered_kind_is_no_threat() {
        let registry = registry();
        let agent = agent();
        let enemy = enemy("ghost", 0);
        assert_eq!(registry.query(&FearQuery::new(&agent, &enemy, FearPurpose::Flee)), None);
    }

    #[test]
    fn test_purpose_selects_function() {
        let registry = registry();
        let agent = agent();
        let enemy = enemy("hound", 0);
        assert_eq!(registry.query(&FearQuery::new(&agent, &enemy, FearPurpose::Flee)), Some(10.0));
        assert_eq!(registry.query(&FearQuery::new(&agent, &enemy, FearPurpose::Rescue)), Some(8.0));
        assert_eq!(
            registry.query(&FearQuery::new(&agent, &enemy, FearPurpose::PathAvoidance)),
            None
        );
    }

    #[test]
    fn test_behaviour_state_changes_distance() {
        let registry = registry();
        let agent = agent();
        let aggro = enemy("hound", 2);
        assert_eq!(registry.query(&FearQuery::new(&agent, &aggro, FearPurpose::Flee)), Some(30.0));
    }

    #[test]
    fn test_dead_enemy_is_no_threat() {
        let registry = registry();
        let agent = agent();
        let mut dead = enemy("hound", 2);
        dead.is_dead = true;
        assert_eq!(registry.query(&FearQuery::new(&agent, &dead, FearPurpose::Flee)), None);
    }

    #[test]
    fn test_negative_distance_normalised_to_none() {
        let mut registry = ThreatRegistry::new();
        registry.register(EnemyKind::new("broken"), |_| Some(-5.0), |_| Some(f32::NAN), |_| Some(f32::INFINITY));
        let agent = agent();
        let enemy = enemy("broken", 0);
        for purpose in [FearPurpose::Flee, FearPurpose::Rescue, FearPurpose::PathAvoidance] {
            assert_eq!(registry.query(&FearQuery::new(&agent, &enemy, purpose)), None);
        }
    }

    #[test]
    fn test_unknown_traits_default_unkillable() {
        let registry = registry();
        assert!(!registry.traits(&EnemyKind::new("hound")).killable);
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = registry();
        registry.register(EnemyKind::new("hound"), |_| Some(1.0), |_| None, |_| None);
        let agent = agent();
        let enemy = enemy("hound", 0);
        assert_eq!(registry.query(&FearQuery::new(&agent, &enemy, FearPurpose::Flee)), Some(1.0));
        assert_eq!(registry.len(), 1);
    }
}
