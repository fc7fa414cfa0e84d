//! Incremental search for a retreat node
//!
//! Scores every nav node by how well it hides the agent from one enemy:
//!
//! - nodes inside the danger radius are skipped outright
//! - nodes with no complete path from the agent are skipped
//! - `path_out_of_sight`: no path corner is both inside the radius and
//!   visible from the enemy's eye
//! - `node_out_of_sight`: the enemy's eye has no line of sight to the node
//!
//! Score is `2 * path_out_of_sight + node_out_of_sight`. Ties go to the
//! node whose path is shortest relative to how far it is from the enemy.
//!
//! The scan is sliced so a large node set never stalls one AI tick. The
//! closer the enemy, the bigger the slice.

use std::cmp::Ordering;

use glam::Vec3;
use ordered_float::OrderedFloat;
use tracing::trace;

use crate::agent::context::TickContext;
use crate::agent::tasks::{SubTask, TaskPoll, Wait};
use crate::core::config::AgentConfig;
use crate::core::types::flat_distance;
use crate::providers::{EnemySnapshot, MovementProvider, NavNode, PerceptionProvider};

/// A scored retreat destination
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCandidate {
    pub node: NavNode,
    pub path_out_of_sight: bool,
    pub node_out_of_sight: bool,
    /// 0..=3
    pub score: u8,
    /// Length of the agent's path to the node
    pub path_distance: f32,
    /// Distance from the node to the enemy
    pub enemy_distance: f32,
}

impl NodeCandidate {
    fn tie_break(&self) -> OrderedFloat<f32> {
        OrderedFloat(self.path_distance - self.enemy_distance)
    }

    /// Ordering where `Greater` means a better retreat
    pub fn rank(&self, other: &NodeCandidate) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.tie_break().cmp(&self.tie_break()))
    }
}

/// Result of one slice
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStep {
    /// More nodes to scan
    Pending,
    Found(NodeCandidate),
    /// Every node was rejected
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct FleeNodeSearch {
    enemy_position: Vec3,
    enemy_eye: Vec3,
    radius: f32,
    slice_min: usize,
    slice_max: usize,
    cursor: usize,
    best: Option<NodeCandidate>,
    done: bool,
}

impl FleeNodeSearch {
    pub fn new(enemy_position: Vec3, enemy_eye: Vec3, radius: f32, slice_min: usize, slice_max: usize) -> Self {
        let slice_min = slice_min.max(1);
        Self {
            enemy_position,
            enemy_eye,
            radius: radius.max(0.0),
            slice_min,
            slice_max: slice_max.max(slice_min),
            cursor: 0,
            best: None,
            done: false,
        }
    }

    pub fn from_enemy(enemy: &EnemySnapshot, radius: f32, config: &AgentConfig) -> Self {
        Self::new(enemy.position, enemy.eye, radius, config.flee_slice_min, config.flee_slice_max)
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn enemy_position(&self) -> Vec3 {
        self.enemy_position
    }

    /// Nodes scanned so far in this pass
    pub fn scanned(&self) -> usize {
        self.cursor
    }

    /// Start over against a (possibly different) enemy
    pub fn restart(&mut self, enemy_position: Vec3, enemy_eye: Vec3, radius: f32) {
        self.enemy_position = enemy_position;
        self.enemy_eye = enemy_eye;
        self.radius = radius.max(0.0);
        self.cursor = 0;
        self.best = None;
        self.done = false;
    }

    /// Nodes to scan this step for an agent at `agent_position`
    ///
    /// `slice_max` with the enemy on top of the agent, falling linearly to
    /// `slice_min` at twice the radius and beyond.
    pub fn slice_size(&self, agent_position: Vec3) -> usize {
        if self.radius <= f32::EPSILON {
            return self.slice_min;
        }
        let distance = flat_distance(agent_position, self.enemy_position);
        let t = (distance / (2.0 * self.radius)).clamp(0.0, 1.0);
        let span = (self.slice_max - self.slice_min) as f32;
        self.slice_max - (span * t).round() as usize
    }

    /// Scan the next slice of nodes
    pub fn step<W>(&mut self, world: &W, agent_position: Vec3) -> SearchStep
    where
        W: MovementProvider + PerceptionProvider + ?Sized,
    {
        if self.done {
            return self.result();
        }

        let nodes = world.nav_nodes();
        let end = (self.cursor + self.slice_size(agent_position)).min(nodes.len());
        for node in &nodes[self.cursor.min(end)..end] {
            if let Some(candidate) = self.evaluate(world, agent_position, node) {
                let better = match &self.best {
                    Some(best) => candidate.rank(best) == Ordering::Greater,
                    None => true,
                };
                if better {
                    self.best = Some(candidate);
                }
            }
        }
        self.cursor = end;

        if self.cursor >= nodes.len() {
            self.done = true;
            trace!(nodes = nodes.len(), found = self.best.is_some(), "flee search pass complete");
            return self.result();
        }
        SearchStep::Pending
    }

    fn result(&self) -> SearchStep {
        match &self.best {
            Some(best) => SearchStep::Found(best.clone()),
            None => SearchStep::Exhausted,
        }
    }

    /// Score one node; `None` if it is not a usable retreat
    pub fn evaluate<W>(&self, world: &W, agent_position: Vec3, node: &NavNode) -> Option<NodeCandidate>
    where
        W: MovementProvider + PerceptionProvider + ?Sized,
    {
        let enemy_distance = flat_distance(node.position, self.enemy_position);
        if enemy_distance < self.radius {
            return None;
        }

        let path_distance = world.is_valid_path(agent_position, node.position)?;
        let corners = world
            .path_corners(agent_position, node.position)
            .unwrap_or_else(|| vec![agent_position, node.position]);

        let path_out_of_sight = !corners.iter().any(|corner| {
            flat_distance(*corner, self.enemy_position) < self.radius
                && world.line_of_sight(self.enemy_eye, *corner)
        });
        let node_out_of_sight = !world.line_of_sight(self.enemy_eye, node.position);

        Some(NodeCandidate {
            node: *node,
            path_out_of_sight,
            node_out_of_sight,
            score: 2 * path_out_of_sight as u8 + node_out_of_sight as u8,
            path_distance,
            enemy_distance,
        })
    }
}

/// The search as a cooperative sub-task, one slice per tick
#[derive(Debug)]
pub struct FleeSearchTask {
    search: FleeNodeSearch,
    outcome: SearchStep,
}

impl FleeSearchTask {
    pub fn new(search: FleeNodeSearch) -> Self {
        Self {
            search,
            outcome: SearchStep::Pending,
        }
    }

    pub fn outcome(&self) -> &SearchStep {
        &self.outcome
    }

    pub fn search(&self) -> &FleeNodeSearch {
        &self.search
    }
}

impl SubTask for FleeSearchTask {
    fn name(&self) -> &'static str {
        "flee_search"
    }

    fn resume(&mut self, cx: &mut TickContext<'_>) -> TaskPoll {
        let position = cx.position();
        self.outcome = self.search.step(&*cx.world, position);
        match self.outcome {
            SearchStep::Pending => TaskPoll::Yield(Wait::NextTick),
            _ => TaskPoll::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::SandboxWorld;

    fn run_to_end(search: &mut FleeNodeSearch, world: &SandboxWorld, agent: Vec3) -> SearchStep {
        loop {
            match search.step(world, agent) {
                SearchStep::Pending => continue,
                done => return done,
            }
        }
    }

    #[test]
    fn test_slice_interpolates() {
        let search = FleeNodeSearch::new(Vec3::ZERO, Vec3::ZERO, 10.0, 8, 48);
        assert_eq!(search.slice_size(Vec3::ZERO), 48);
        assert_eq!(search.slice_size(Vec3::new(10.0, 0.0, 0.0)), 28);
        assert_eq!(search.slice_size(Vec3::new(20.0, 0.0, 0.0)), 8);
        assert_eq!(search.slice_size(Vec3::new(80.0, 0.0, 0.0)), 8);
    }

    #[test]
    fn test_nodes_inside_radius_rejected() {
        let mut world = SandboxWorld::open(30, 30);
        world.add_nav_node(Vec3::new(5.5, 0.0, 5.5));
        let mut search = FleeNodeSearch::new(Vec3::new(6.5, 0.0, 6.5), Vec3::new(6.5, 0.0, 6.5), 10.0, 1, 4);
        assert_eq!(run_to_end(&mut search, &world, Vec3::new(2.5, 0.0, 2.5)), SearchStep::Exhausted);
    }

    #[test]
    fn test_hidden_node_beats_visible_one() {
        // Wall between the enemy and the far corner
        let mut world = SandboxWorld::open(40, 40);
        world.block_rect(20, 0, 20, 30);
        let visible = world.add_nav_node(Vec3::new(10.5, 0.0, 38.5));
        let hidden = world.add_nav_node(Vec3::new(25.5, 0.0, 5.5));
        let enemy = Vec3::new(5.5, 0.0, 5.5);
        let agent = Vec3::new(15.5, 0.0, 35.5);

        let mut search = FleeNodeSearch::new(enemy, enemy, 8.0, 1, 1);
        match run_to_end(&mut search, &world, agent) {
            SearchStep::Found(best) => {
                assert_eq!(best.node.id, hidden);
                assert!(best.node_out_of_sight);
                assert_ne!(best.node.id, visible);
            }
            other => panic!("expected a node, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_node_skipped() {
        let mut world = SandboxWorld::open(30, 30);
        // Box the node in
        world.block_rect(19, 19, 23, 19);
        world.block_rect(19, 23, 23, 23);
        world.block_rect(19, 20, 19, 22);
        world.block_rect(23, 20, 23, 22);
        world.add_nav_node(Vec3::new(21.5, 0.0, 21.5));
        let enemy = Vec3::new(2.5, 0.0, 2.5);
        let mut search = FleeNodeSearch::new(enemy, enemy, 5.0, 8, 8);
        assert_eq!(run_to_end(&mut search, &world, Vec3::new(4.5, 0.0, 4.5)), SearchStep::Exhausted);
    }

    #[test]
    fn test_tie_break_prefers_shorter_relative_path() {
        let mut world = SandboxWorld::open(60, 10);
        let away = world.add_nav_node(Vec3::new(30.5, 0.0, 5.5));
        world.add_nav_node(Vec3::new(12.5, 0.0, 5.5));
        let enemy = Vec3::new(0.5, 0.0, 5.5);
        let mut search = FleeNodeSearch::new(enemy, enemy, 10.0, 8, 8);
        // Same score; the node further from the enemy gains more than it costs
        match run_to_end(&mut search, &world, Vec3::new(20.5, 0.0, 5.5)) {
            SearchStep::Found(best) => assert_eq!(best.node.id, away),
            other => panic!("expected a node, got {:?}", other),
        }
    }
}
