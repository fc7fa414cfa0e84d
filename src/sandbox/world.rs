//! In-memory world implementing every provider trait
//!
//! A flat grid facility with agents, enemies, players, loose items, doors
//! and a charger. Nothing here decides anything: enemies only move when a
//! test or the runner moves them, and agents only move along the
//! destinations the engine sets, during `step`.

use ahash::AHashMap;
use glam::Vec3;
use tracing::trace;

use crate::combat::weapons::WeaponKind;
use crate::core::types::{flat_distance, EntityId, NodeId};
use crate::providers::{
    AgentStatus, DoorView, EnemySnapshot, InventoryProvider, ItemKind, ItemView, MovementProvider, NavNode,
    PerceptionProvider, PlayerSnapshot, PresentationProvider, TransmissionProvider, VoiceHint, WeaponState,
};
use crate::sandbox::grid::{polyline_length, FloorGrid};
use crate::threat::EnemyKind;

const WALK_SPEED: f32 = 3.0;
const SPRINT_SPEED: f32 = 6.0;
/// Interaction distance for grabbing, doors, charger and revives
const REACH: f32 = 2.0;
const SLOT_COUNT: usize = 4;
/// How close to the aim point a hit lands
const AIM_TOLERANCE: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct SandboxAgent {
    pub position: Vec3,
    pub forward: Vec3,
    pub destination: Option<Vec3>,
    pub moving: bool,
    pub sprinting: bool,
    pub health: i32,
    pub inside_facility: bool,
    pub slots: Vec<Option<EntityId>>,
    pub held: usize,
}

impl SandboxAgent {
    fn new(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::X,
            destination: None,
            moving: false,
            sprinting: false,
            health: 100,
            inside_facility: true,
            slots: vec![None; SLOT_COUNT],
            held: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    grid: FloorGrid,
    nodes: Vec<NavNode>,
    agents: AHashMap<EntityId, SandboxAgent>,
    enemies: AHashMap<EntityId, EnemySnapshot>,
    players: AHashMap<EntityId, PlayerSnapshot>,
    items: AHashMap<EntityId, ItemView>,
    doors: Vec<DoorView>,
    charger: Option<Vec3>,
    /// Every voice hint played, in order
    pub voices: Vec<(EntityId, VoiceHint)>,
    /// Every status line set, in order
    pub statuses: Vec<(EntityId, String)>,
    /// Every radio transmission, in order
    pub transmissions: Vec<(EntityId, String)>,
}

impl SandboxWorld {
    /// Open floor of `width` x `depth` cells
    pub fn open(width: i32, depth: i32) -> Self {
        Self {
            grid: FloorGrid::new(width, depth),
            ..Self::default()
        }
    }

    fn grid(&self) -> &FloorGrid {
        &self.grid
    }

    pub fn floor(&self) -> &FloorGrid {
        self.grid()
    }

    // --- layout ---

    pub fn block(&mut self, x: i32, z: i32) {
        self.grid.block(x, z);
    }

    /// Block every cell in the inclusive rectangle
    pub fn block_rect(&mut self, x0: i32, z0: i32, x1: i32, z1: i32) {
        for x in x0.min(x1)..=x0.max(x1) {
            for z in z0.min(z1)..=z0.max(z1) {
                self.block(x, z);
            }
        }
    }

    pub fn add_nav_node(&mut self, position: Vec3) -> NodeId {
        let id = self.nodes.len() as u32;
        self.nodes.push(NavNode::new(id, position));
        NodeId(id)
    }

    /// Nav nodes on every `spacing`-th open cell
    pub fn scatter_nav_nodes(&mut self, spacing: i32) {
        let spacing = spacing.max(1);
        let (width, depth) = (self.grid().width(), self.grid().depth());
        for x in (0..width).step_by(spacing as usize) {
            for z in (0..depth).step_by(spacing as usize) {
                if !self.grid().is_blocked((x, z)) {
                    self.add_nav_node(FloorGrid::center_of((x, z)));
                }
            }
        }
    }

    // --- agents ---

    pub fn add_agent(&mut self, id: EntityId, position: Vec3) {
        self.agents.insert(id, SandboxAgent::new(position));
    }

    pub fn agent_body(&self, id: EntityId) -> Option<&SandboxAgent> {
        self.agents.get(&id)
    }

    pub fn agent_body_mut(&mut self, id: EntityId) -> Option<&mut SandboxAgent> {
        self.agents.get_mut(&id)
    }

    pub fn set_agent_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.position = position;
        }
    }

    pub fn set_agent_health(&mut self, id: EntityId, health: i32) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.health = health;
        }
    }

    // --- enemies and players ---

    pub fn add_enemy(&mut self, kind: &str, position: Vec3) -> EntityId {
        let id = EntityId::new();
        self.enemies.insert(
            id,
            EnemySnapshot {
                id,
                kind: EnemyKind::new(kind),
                position,
                eye: position,
                is_dead: false,
                behaviour_state: 0,
                target: None,
                health: 3,
            },
        );
        id
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut EnemySnapshot> {
        self.enemies.get_mut(&id)
    }

    pub fn move_enemy(&mut self, id: EntityId, position: Vec3) {
        if let Some(enemy) = self.enemies.get_mut(&id) {
            enemy.position = position;
            enemy.eye = position;
        }
    }

    pub fn remove_enemy(&mut self, id: EntityId) {
        self.enemies.remove(&id);
    }

    pub fn add_player(&mut self, name: &str, position: Vec3) -> EntityId {
        let id = EntityId::new();
        self.players.insert(
            id,
            PlayerSnapshot {
                id,
                name: name.to_string(),
                position,
                is_dead: false,
                inside_facility: true,
            },
        );
        id
    }

    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut PlayerSnapshot> {
        self.players.get_mut(&id)
    }

    // --- items and fixtures ---

    pub fn add_loose_item(&mut self, kind: ItemKind, value: u32, position: Vec3) -> EntityId {
        let id = EntityId::new();
        self.items.insert(
            id,
            ItemView {
                id,
                kind,
                position: Some(position),
                value,
                weapon: None,
                charge: matches!(kind, ItemKind::BatteryTool).then_some(0.0),
            },
        );
        id
    }

    /// Put an item straight into the agent's first free slot
    pub fn give_item(&mut self, agent: EntityId, kind: ItemKind, value: u32) -> Option<EntityId> {
        let body = self.agents.get_mut(&agent)?;
        let slot = body.slots.iter().position(|s| s.is_none())?;
        let id = EntityId::new();
        body.slots[slot] = Some(id);
        let weapon = match kind {
            ItemKind::Weapon(w) if w.is_ranged() => Some(WeaponState {
                chambered: w.profile().magazine,
                reserve: 0,
                safety_on: false,
            }),
            _ => None,
        };
        self.items.insert(
            id,
            ItemView {
                id,
                kind,
                position: None,
                value,
                weapon,
                charge: matches!(kind, ItemKind::BatteryTool).then_some(0.0),
            },
        );
        Some(id)
    }

    /// Give a firearm with explicit ammunition
    pub fn give_weapon(&mut self, agent: EntityId, kind: WeaponKind, chambered: u32, reserve: u32) -> Option<EntityId> {
        let id = self.give_item(agent, ItemKind::Weapon(kind), 30)?;
        if let Some(item) = self.items.get_mut(&id) {
            if kind.is_ranged() {
                item.weapon = Some(WeaponState {
                    chambered,
                    reserve,
                    safety_on: false,
                });
            }
        }
        Some(id)
    }

    pub fn item_mut(&mut self, id: EntityId) -> Option<&mut ItemView> {
        self.items.get_mut(&id)
    }

    pub fn add_door(&mut self, position: Vec3, locked: bool) -> EntityId {
        let id = EntityId::new();
        self.doors.push(DoorView { id, position, locked });
        id
    }

    pub fn set_charger(&mut self, position: Vec3) {
        self.charger = Some(position);
    }

    // --- simulation ---

    /// Advance locomotion by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        let grid = &self.grid;
        for agent in self.agents.values_mut() {
            if agent.health <= 0 || !agent.moving {
                continue;
            }
            let Some(destination) = agent.destination else {
                agent.moving = false;
                continue;
            };
            let Some(corners) = grid.path_corners(agent.position, destination) else {
                agent.moving = false;
                continue;
            };

            let mut budget = if agent.sprinting { SPRINT_SPEED } else { WALK_SPEED } * dt;
            let mut position = agent.position;
            for corner in corners.iter().skip(1) {
                let leg = flat_distance(position, *corner);
                if leg <= budget {
                    budget -= leg;
                    position = Vec3::new(corner.x, position.y, corner.z);
                    continue;
                }
                let direction = (*corner - position) * Vec3::new(1.0, 0.0, 1.0);
                position += direction.normalize_or_zero() * budget;
                break;
            }

            let heading = (position - agent.position) * Vec3::new(1.0, 0.0, 1.0);
            if heading.length_squared() > 1e-6 {
                agent.forward = heading.normalize();
            }
            agent.position = position;
            if flat_distance(position, destination) < 0.05 {
                agent.moving = false;
            }
        }
    }

    fn in_cone(&self, agent: &SandboxAgent, target: Vec3, fov_degrees: f32) -> bool {
        let to = (target - agent.position) * Vec3::new(1.0, 0.0, 1.0);
        if to.length_squared() < 1e-6 {
            return true;
        }
        let forward = agent.forward * Vec3::new(1.0, 0.0, 1.0);
        let angle = forward.normalize_or_zero().angle_between(to.normalize());
        angle.to_degrees() <= fov_degrees * 0.5
    }

    fn perceives(&self, agent: &SandboxAgent, target: Vec3, fov: f32, range: f32, proximity: f32) -> bool {
        let distance = flat_distance(agent.position, target);
        distance <= proximity
            || (distance <= range && self.in_cone(agent, target, fov) && self.line_of_sight(agent.position, target))
    }

    fn held_view(&self, agent: EntityId) -> Option<(usize, ItemView)> {
        let body = self.agents.get(&agent)?;
        let id = body.slots.get(body.held).copied().flatten()?;
        self.items.get(&id).map(|item| (body.held, item.clone()))
    }

    fn clear_held(&mut self, agent: EntityId) -> Option<EntityId> {
        let body = self.agents.get_mut(&agent)?;
        body.slots.get_mut(body.held).and_then(|slot| slot.take())
    }
}

impl MovementProvider for SandboxWorld {
    fn agent_position(&self, agent: EntityId) -> Vec3 {
        self.agents.get(&agent).map(|a| a.position).unwrap_or(Vec3::ZERO)
    }

    fn agent_forward(&self, agent: EntityId) -> Vec3 {
        self.agents.get(&agent).map(|a| a.forward).unwrap_or(Vec3::X)
    }

    fn set_destination(&mut self, agent: EntityId, destination: Vec3) {
        if let Some(body) = self.agents.get_mut(&agent) {
            body.destination = Some(destination);
        }
    }

    fn destination(&self, agent: EntityId) -> Option<Vec3> {
        self.agents.get(&agent).and_then(|a| a.destination)
    }

    fn move_to_destination(&mut self, agent: EntityId) {
        if let Some(body) = self.agents.get_mut(&agent) {
            body.moving = body.destination.is_some();
        }
    }

    fn stop(&mut self, agent: EntityId) {
        if let Some(body) = self.agents.get_mut(&agent) {
            body.moving = false;
        }
    }

    fn set_sprinting(&mut self, agent: EntityId, sprinting: bool) {
        if let Some(body) = self.agents.get_mut(&agent) {
            body.sprinting = sprinting;
        }
    }

    fn look_at(&mut self, agent: EntityId, target: Vec3) {
        if let Some(body) = self.agents.get_mut(&agent) {
            let to = (target - body.position) * Vec3::new(1.0, 0.0, 1.0);
            if to.length_squared() > 1e-6 {
                body.forward = to.normalize();
            }
        }
    }

    fn is_valid_path(&self, from: Vec3, to: Vec3) -> Option<f32> {
        self.path_corners(from, to).map(|c| polyline_length(&c))
    }

    fn path_corners(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        self.grid().path_corners(from, to)
    }

    fn snap_to_navigable(&self, position: Vec3, radius: f32) -> Option<Vec3> {
        self.grid().nearest_open(position, radius)
    }

    fn nav_nodes(&self) -> &[NavNode] {
        &self.nodes
    }
}

impl PerceptionProvider for SandboxWorld {
    fn agent_status(&self, agent: EntityId) -> AgentStatus {
        match self.agents.get(&agent) {
            Some(body) => AgentStatus {
                health: body.health,
                is_dead: body.health <= 0,
                inside_facility: body.inside_facility,
            },
            None => AgentStatus {
                health: 0,
                is_dead: true,
                inside_facility: false,
            },
        }
    }

    fn find_enemy_in_view(&self, agent: EntityId, fov_degrees: f32, range: f32, proximity: f32) -> Option<EnemySnapshot> {
        let position = self.agent_position(agent);
        self.visible_enemies(agent, fov_degrees, range, proximity)
            .into_iter()
            .min_by(|a, b| flat_distance(position, a.position).total_cmp(&flat_distance(position, b.position)))
    }

    fn visible_enemies(&self, agent: EntityId, fov_degrees: f32, range: f32, proximity: f32) -> Vec<EnemySnapshot> {
        let Some(body) = self.agents.get(&agent) else {
            return Vec::new();
        };
        let mut seen: Vec<EnemySnapshot> = self
            .enemies
            .values()
            .filter(|e| !e.is_dead && self.perceives(body, e.position, fov_degrees, range, proximity))
            .cloned()
            .collect();
        seen.sort_by(|a, b| a.id.cmp(&b.id));
        seen
    }

    fn find_player_in_view(&self, agent: EntityId, fov_degrees: f32, range: f32) -> Option<PlayerSnapshot> {
        let body = self.agents.get(&agent)?;
        self.players
            .values()
            .filter(|p| !p.is_dead && self.perceives(body, p.position, fov_degrees, range, 0.0))
            .min_by(|a, b| {
                flat_distance(body.position, a.position).total_cmp(&flat_distance(body.position, b.position))
            })
            .cloned()
    }

    fn enemy(&self, id: EntityId) -> Option<EnemySnapshot> {
        self.enemies.get(&id).cloned()
    }

    fn player(&self, id: EntityId) -> Option<PlayerSnapshot> {
        self.players.get(&id).cloned()
    }

    fn players(&self) -> Vec<PlayerSnapshot> {
        let mut players: Vec<_> = self.players.values().cloned().collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        self.grid().segment_clear(from, to)
    }

    fn can_see(&self, agent: EntityId, target: Vec3, fov_degrees: f32, range: f32) -> bool {
        self.agents
            .get(&agent)
            .is_some_and(|body| self.perceives(body, target, fov_degrees, range, 0.0))
    }

    fn items_in_view(&self, agent: EntityId, fov_degrees: f32, range: f32) -> Vec<ItemView> {
        let Some(body) = self.agents.get(&agent) else {
            return Vec::new();
        };
        let mut seen: Vec<ItemView> = self
            .items
            .values()
            .filter(|item| {
                item.position
                    .is_some_and(|p| self.perceives(body, p, fov_degrees, range, 0.0))
            })
            .cloned()
            .collect();
        seen.sort_by(|a, b| a.id.cmp(&b.id));
        seen
    }

    fn item(&self, id: EntityId) -> Option<ItemView> {
        self.items.get(&id).cloned()
    }

    fn doors(&self) -> Vec<DoorView> {
        self.doors.clone()
    }

    fn door(&self, id: EntityId) -> Option<DoorView> {
        self.doors.iter().find(|d| d.id == id).cloned()
    }

    fn charger(&self) -> Option<Vec3> {
        self.charger
    }
}

impl InventoryProvider for SandboxWorld {
    fn slots(&self, agent: EntityId) -> Vec<Option<ItemView>> {
        self.agents
            .get(&agent)
            .map(|body| {
                body.slots
                    .iter()
                    .map(|slot| slot.and_then(|id| self.items.get(&id).cloned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn held_slot(&self, agent: EntityId) -> usize {
        self.agents.get(&agent).map(|a| a.held).unwrap_or(0)
    }

    fn switch_slot(&mut self, agent: EntityId, slot: usize) -> bool {
        match self.agents.get_mut(&agent) {
            Some(body) if slot < body.slots.len() => {
                body.held = slot;
                true
            }
            _ => false,
        }
    }

    fn grab(&mut self, agent: EntityId, item: EntityId) -> bool {
        let Some(body) = self.agents.get_mut(&agent) else {
            return false;
        };
        let Some(view) = self.items.get_mut(&item) else {
            return false;
        };
        let Some(position) = view.position else {
            return false;
        };
        if flat_distance(body.position, position) > REACH {
            return false;
        }
        let Some(slot) = body.slots.iter().position(|s| s.is_none()) else {
            return false;
        };
        body.slots[slot] = Some(item);
        view.position = None;
        trace!(%agent, %item, slot, "grabbed");
        true
    }

    fn drop_held(&mut self, agent: EntityId) -> Option<EntityId> {
        let position = self.agent_position(agent);
        let id = self.clear_held(agent)?;
        if let Some(item) = self.items.get_mut(&id) {
            item.position = Some(position);
        }
        Some(id)
    }

    fn use_held(&mut self, agent: EntityId, target: Vec3) -> bool {
        let Some((_, item)) = self.held_view(agent) else {
            return false;
        };
        let Some(kind) = item.weapon_kind() else {
            return false;
        };
        let profile = kind.profile();

        if profile.uses_ammo {
            let Some(state) = item.weapon else {
                return false;
            };
            if state.chambered == 0 || state.safety_on {
                return false;
            }
            if let Some(stored) = self.items.get_mut(&item.id).and_then(|i| i.weapon.as_mut()) {
                stored.chambered -= 1;
            }
        }

        let origin = self.agent_position(agent);
        let hit = self
            .enemies
            .values()
            .filter(|e| !e.is_dead)
            .filter(|e| flat_distance(e.position, target) <= AIM_TOLERANCE)
            .filter(|e| flat_distance(origin, e.position) <= profile.range)
            .filter(|e| self.grid().segment_clear(origin, e.position))
            .min_by(|a, b| flat_distance(origin, a.position).total_cmp(&flat_distance(origin, b.position)))
            .map(|e| e.id);

        if let Some(enemy) = hit.and_then(|id| self.enemies.get_mut(&id)) {
            enemy.health -= profile.damage;
            if enemy.health <= 0 {
                enemy.is_dead = true;
            }
            trace!(%agent, enemy = %enemy.id, health = enemy.health, "hit");
        }
        true
    }

    fn toggle_safety(&mut self, agent: EntityId) -> bool {
        let Some((_, item)) = self.held_view(agent) else {
            return false;
        };
        match self.items.get_mut(&item.id).and_then(|i| i.weapon.as_mut()) {
            Some(state) => {
                state.safety_on = !state.safety_on;
                true
            }
            None => false,
        }
    }

    fn reload(&mut self, agent: EntityId) -> bool {
        let Some((_, item)) = self.held_view(agent) else {
            return false;
        };
        let Some(magazine) = item.weapon_kind().map(|k| k.profile().magazine) else {
            return false;
        };
        match self.items.get_mut(&item.id).and_then(|i| i.weapon.as_mut()) {
            Some(state) => {
                let take = magazine.saturating_sub(state.chambered).min(state.reserve);
                state.chambered += take;
                state.reserve -= take;
                take > 0
            }
            None => false,
        }
    }

    fn use_key_on(&mut self, agent: EntityId, door: EntityId) -> bool {
        let position = self.agent_position(agent);
        let Some((_, item)) = self.held_view(agent) else {
            return false;
        };
        if item.kind != ItemKind::Key {
            return false;
        }
        let Some(view) = self.doors.iter_mut().find(|d| d.id == door) else {
            return false;
        };
        if !view.locked || flat_distance(view.position, position) > REACH {
            return false;
        }
        view.locked = false;
        self.clear_held(agent);
        self.items.remove(&item.id);
        true
    }

    fn charge_held(&mut self, agent: EntityId) -> bool {
        let position = self.agent_position(agent);
        let Some(charger) = self.charger else {
            return false;
        };
        if flat_distance(charger, position) > REACH {
            return false;
        }
        let Some((_, item)) = self.held_view(agent) else {
            return false;
        };
        if item.kind != ItemKind::BatteryTool {
            return false;
        }
        if let Some(stored) = self.items.get_mut(&item.id) {
            stored.charge = Some(1.0);
        }
        true
    }

    fn revive(&mut self, agent: EntityId, player: EntityId) -> bool {
        let position = self.agent_position(agent);
        match self.players.get_mut(&player) {
            Some(p) if p.is_dead && flat_distance(p.position, position) <= REACH => {
                p.is_dead = false;
                true
            }
            _ => false,
        }
    }
}

impl PresentationProvider for SandboxWorld {
    fn play_voice(&mut self, agent: EntityId, hint: VoiceHint) {
        self.voices.push((agent, hint));
    }

    fn set_status(&mut self, agent: EntityId, status: &str) {
        self.statuses.push((agent, status.to_string()));
    }
}

impl TransmissionProvider for SandboxWorld {
    fn transmit(&mut self, agent: EntityId, text: &str) {
        self.transmissions.push((agent, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_agent() -> (SandboxWorld, EntityId) {
        let mut world = SandboxWorld::open(30, 30);
        let agent = EntityId::new();
        world.add_agent(agent, Vec3::new(5.5, 0.0, 5.5));
        (world, agent)
    }

    #[test]
    fn test_step_moves_toward_destination() {
        let (mut world, agent) = world_with_agent();
        world.set_destination(agent, Vec3::new(15.5, 0.0, 5.5));
        world.move_to_destination(agent);
        world.step(1.0);
        assert!((world.agent_position(agent).x - 8.5).abs() < 0.01);
        world.set_sprinting(agent, true);
        world.step(2.0);
        assert!((world.agent_position(agent).x - 15.5).abs() < 0.01);
        assert!(!world.agent_body(agent).unwrap().moving);
    }

    #[test]
    fn test_enemy_behind_wall_not_visible() {
        let (mut world, agent) = world_with_agent();
        world.block_rect(10, 0, 10, 29);
        world.add_enemy("hound", Vec3::new(15.5, 0.0, 5.5));
        assert!(world.visible_enemies(agent, 120.0, 40.0, 2.0).is_empty());
    }

    #[test]
    fn test_proximity_ignores_facing() {
        let (mut world, agent) = world_with_agent();
        world.add_enemy("hound", Vec3::new(3.5, 0.0, 5.5));
        // Facing +x, enemy behind
        assert_eq!(world.visible_enemies(agent, 90.0, 40.0, 3.0).len(), 1);
        assert!(world.visible_enemies(agent, 90.0, 40.0, 1.0).is_empty());
    }

    #[test]
    fn test_shotgun_hits_and_kills() {
        let (mut world, agent) = world_with_agent();
        let enemy = world.add_enemy("crawler", Vec3::new(10.5, 0.0, 5.5));
        world.give_weapon(agent, WeaponKind::Shotgun, 2, 0);
        assert!(world.use_held(agent, Vec3::new(10.5, 0.0, 5.5)));
        assert!(world.enemy(enemy).unwrap().is_dead);
        assert_eq!(world.slots(agent)[0].as_ref().unwrap().weapon.unwrap().chambered, 1);
    }

    #[test]
    fn test_safety_blocks_firing() {
        let (mut world, agent) = world_with_agent();
        world.give_weapon(agent, WeaponKind::Rifle, 1, 4);
        world.toggle_safety(agent);
        assert!(!world.use_held(agent, Vec3::new(10.5, 0.0, 5.5)));
        world.toggle_safety(agent);
        assert!(world.use_held(agent, Vec3::new(10.5, 0.0, 5.5)));
        assert!(world.reload(agent));
        let state = world.slots(agent)[0].as_ref().unwrap().weapon.unwrap();
        assert_eq!((state.chambered, state.reserve), (4, 0));
    }

    #[test]
    fn test_grab_needs_reach_and_free_slot() {
        let (mut world, agent) = world_with_agent();
        let far = world.add_loose_item(ItemKind::Scrap, 40, Vec3::new(20.5, 0.0, 5.5));
        let near = world.add_loose_item(ItemKind::Scrap, 40, Vec3::new(6.5, 0.0, 5.5));
        assert!(!world.grab(agent, far));
        assert!(world.grab(agent, near));
        assert_eq!(world.item(near).unwrap().position, None);
    }

    #[test]
    fn test_key_unlocks_door_once() {
        let (mut world, agent) = world_with_agent();
        let door = world.add_door(Vec3::new(6.5, 0.0, 5.5), true);
        world.give_item(agent, ItemKind::Key, 0);
        assert!(world.use_key_on(agent, door));
        assert!(!world.door(door).unwrap().locked);
        assert!(world.slots(agent)[0].is_none());
    }
}
