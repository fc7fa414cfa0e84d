//! Sighting assessment against the flee thresholds

use crate::agent::context::TickContext;
use crate::core::types::{flat_distance, EntityId};
use crate::providers::EnemySnapshot;

/// A perceived enemy that is inside its own flee radius
#[derive(Debug, Clone)]
pub struct ThreatSighting {
    pub enemy: EnemySnapshot,
    /// Flee radius for this enemy right now
    pub danger: f32,
    pub distance: f32,
    /// How deep inside the radius the agent is (`danger - distance`)
    pub urgency: f32,
}

/// Grade one enemy; `None` when it has no flee radius or the agent is outside it
pub fn assess(cx: &TickContext<'_>, enemy: EnemySnapshot) -> Option<ThreatSighting> {
    let danger = cx.flee_danger(&enemy)?;
    let distance = flat_distance(cx.position(), enemy.position);
    if distance >= danger {
        return None;
    }
    Some(ThreatSighting {
        enemy,
        danger,
        distance,
        urgency: danger - distance,
    })
}

/// The perceived enemy the agent is deepest inside the radius of
pub fn most_urgent_threat(cx: &TickContext<'_>) -> Option<ThreatSighting> {
    cx.visible_enemies()
        .into_iter()
        .filter_map(|enemy| assess(cx, enemy))
        .max_by(|a, b| a.urgency.total_cmp(&b.urgency))
}

/// Urgency of a specific enemy regardless of visibility
///
/// Negative when the agent is outside the radius; `None` when the enemy
/// cannot be resolved or has no flee radius.
pub fn urgency_of(cx: &TickContext<'_>, enemy: EntityId) -> Option<f32> {
    let enemy = cx.world.enemy(enemy)?;
    let danger = cx.flee_danger(&enemy)?;
    Some(danger - flat_distance(cx.position(), enemy.position))
}
