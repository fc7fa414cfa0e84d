//! Perception provider: what an agent can see and resolve by id

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::EntityId;
use crate::providers::inventory::ItemView;
use crate::threat::EnemyKind;

/// Point-in-time view of an enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub position: Vec3,
    /// Where the enemy looks from (for line-of-sight checks)
    pub eye: Vec3,
    pub is_dead: bool,
    /// Enemy-specific behaviour sub-state (0 = calm; higher = more agitated)
    pub behaviour_state: u8,
    /// Entity the enemy is currently hunting, if any
    pub target: Option<EntityId>,
    pub health: i32,
}

/// Point-in-time view of a human player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: EntityId,
    pub name: String,
    pub position: Vec3,
    pub is_dead: bool,
    pub inside_facility: bool,
}

/// A door the agent can interact with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorView {
    pub id: EntityId,
    pub position: Vec3,
    pub locked: bool,
}

/// The agent's own body status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub health: i32,
    pub is_dead: bool,
    pub inside_facility: bool,
}

pub trait PerceptionProvider {
    fn agent_status(&self, agent: EntityId) -> AgentStatus;

    /// Closest living enemy inside the view cone, or inside `proximity`
    /// regardless of facing
    fn find_enemy_in_view(
        &self,
        agent: EntityId,
        fov_degrees: f32,
        range: f32,
        proximity: f32,
    ) -> Option<EnemySnapshot>;

    /// Every living enemy the agent can currently perceive
    fn visible_enemies(
        &self,
        agent: EntityId,
        fov_degrees: f32,
        range: f32,
        proximity: f32,
    ) -> Vec<EnemySnapshot>;

    /// Closest living player inside the view cone
    fn find_player_in_view(
        &self,
        agent: EntityId,
        fov_degrees: f32,
        range: f32,
    ) -> Option<PlayerSnapshot>;

    fn enemy(&self, id: EntityId) -> Option<EnemySnapshot>;

    fn player(&self, id: EntityId) -> Option<PlayerSnapshot>;

    fn players(&self) -> Vec<PlayerSnapshot>;

    /// Unobstructed sight line between two points (range not considered)
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool;

    /// Whether the agent could see `target` with the given cone and range
    fn can_see(&self, agent: EntityId, target: Vec3, fov_degrees: f32, range: f32) -> bool;

    /// Loose items (not held by anyone) the agent can see
    fn items_in_view(&self, agent: EntityId, fov_degrees: f32, range: f32) -> Vec<ItemView>;

    fn item(&self, id: EntityId) -> Option<ItemView>;

    fn doors(&self) -> Vec<DoorView>;

    fn door(&self, id: EntityId) -> Option<DoorView>;

    /// Location of the battery charger, if the level has one
    fn charger(&self) -> Option<Vec3>;
}
