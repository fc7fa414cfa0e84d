//! Movement provider: navigation queries and locomotion commands

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, NodeId};

/// A navigable point the flee search may pick as a destination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavNode {
    pub id: NodeId,
    pub position: Vec3,
}

impl NavNode {
    pub fn new(id: u32, position: Vec3) -> Self {
        Self {
            id: NodeId(id),
            position,
        }
    }
}

pub trait MovementProvider {
    fn agent_position(&self, agent: EntityId) -> Vec3;

    /// Unit vector the agent is facing
    fn agent_forward(&self, agent: EntityId) -> Vec3;

    fn set_destination(&mut self, agent: EntityId, destination: Vec3);

    fn destination(&self, agent: EntityId) -> Option<Vec3>;

    /// Start (or keep) walking toward the current destination
    fn move_to_destination(&mut self, agent: EntityId);

    fn stop(&mut self, agent: EntityId);

    fn set_sprinting(&mut self, agent: EntityId, sprinting: bool);

    fn look_at(&mut self, agent: EntityId, target: Vec3);

    /// Path length if a complete path exists, `None` otherwise
    fn is_valid_path(&self, from: Vec3, to: Vec3) -> Option<f32>;

    /// Corners of the path from `from` to `to`, both ends included
    fn path_corners(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>>;

    /// Closest navigable point within `radius` of `position`
    fn snap_to_navigable(&self, position: Vec3, radius: f32) -> Option<Vec3>;

    fn nav_nodes(&self) -> &[NavNode];
}
