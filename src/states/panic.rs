//! Fleeing from one enemy
//!
//! On entry the agent either picks a fight it can win or starts running.
//! While running, a sliced node search looks for a retreat out of the
//! enemy's sight. The agent calms down after a sustained stretch outside
//! the flee radius with line of sight broken.

use glam::Vec3;
use tracing::{debug, info};

use crate::agent::context::TickContext;
use crate::agent::tasks::{Cooperative, TaskScope};
use crate::combat::can_fight_and_win;
use crate::core::types::{flat_distance, EntityId};
use crate::messaging::MessagePriority;
use crate::navigation::{FleeNodeSearch, FleeSearchTask, SearchStep};
use crate::providers::inventory::cargo_value;
use crate::providers::{EnemySnapshot, VoiceHint};
use crate::states::{AIState, FightEnemy, ReturnToBase, StateCore, StateKind, Transition};

const SAFE_TIMER: &str = "panic_safe";
/// How far the blind dash goes while no retreat node is known
const DASH_SNAP_RADIUS: f32 = 4.0;

#[derive(Debug)]
pub struct Panicking {
    core: StateCore,
    enemy: EntityId,
    /// Whether entry may turn this into a fight
    allow_fight: bool,
    scope: TaskScope,
    search: Option<Cooperative<FleeSearchTask>>,
    destination: Option<Vec3>,
    search_failures: u32,
    searches_started: u32,
}

impl Panicking {
    pub fn new(enemy: EntityId) -> Self {
        Self {
            core: StateCore::new(),
            enemy,
            allow_fight: true,
            scope: TaskScope::new(),
            search: None,
            destination: None,
            search_failures: 0,
            searches_started: 0,
        }
    }

    /// Flee without considering a fight (the fight was already lost)
    pub fn without_fight(enemy: EntityId) -> Self {
        Self {
            allow_fight: false,
            ..Self::new(enemy)
        }
    }

    pub fn enemy(&self) -> EntityId {
        self.enemy
    }

    /// Completed searches that found no usable node
    pub fn search_failures(&self) -> u32 {
        self.search_failures
    }

    /// Search passes begun since entry
    pub fn searches_started(&self) -> u32 {
        self.searches_started
    }

    /// Current retreat destination
    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    fn start_search(&mut self, cx: &TickContext<'_>, enemy: &EnemySnapshot, radius: f32) {
        self.finish_search();
        let search = FleeNodeSearch::from_enemy(enemy, radius, cx.config);
        self.searches_started += 1;
        self.search = Some(Cooperative::spawn(FleeSearchTask::new(search), &mut self.scope));
    }

    fn finish_search(&mut self) {
        if let Some(mut done) = self.search.take() {
            done.cancel();
        }
    }

    /// Run straight away from the enemy while the search has nothing
    fn dash_away(cx: &mut TickContext<'_>, enemy: &EnemySnapshot, radius: f32) {
        let origin = cx.position();
        let away = (origin - enemy.position).normalize_or_zero();
        if away == Vec3::ZERO {
            return;
        }
        let aim = origin + away * radius.max(1.0);
        if let Some(point) = cx.world.snap_to_navigable(aim, DASH_SNAP_RADIUS) {
            let me = cx.agent.id;
            cx.world.set_destination(me, point);
            cx.world.move_to_destination(me);
        }
    }

    /// Drop the panic: head home with valuable cargo, else resume
    fn calm_down(cx: &mut TickContext<'_>) -> Transition {
        let cargo = cargo_value(&*cx.world, cx.agent.id);
        if cargo >= cx.config.valuable_cargo_threshold {
            info!(agent = %cx.agent.id, cargo, "calmed down, taking cargo home");
            Transition::to(ReturnToBase::new())
        } else {
            debug!(agent = %cx.agent.id, "calmed down");
            Transition::Resume
        }
    }

    fn is_safe(cx: &TickContext<'_>, enemy: &EnemySnapshot, radius: f32) -> bool {
        let position = cx.position();
        flat_distance(position, enemy.position) >= radius && !cx.world.line_of_sight(enemy.eye, position)
    }
}

impl AIState for Panicking {
    fn kind(&self) -> StateKind {
        StateKind::Panicking
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter_once(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(enemy) = cx.world.enemy(self.enemy).filter(|e| !e.is_dead) else {
            return Transition::Resume;
        };
        let Some(radius) = cx.flee_danger(&enemy) else {
            return Transition::Resume;
        };

        if self.allow_fight {
            if let Some(slot) = can_fight_and_win(cx, &enemy) {
                debug!(agent = %cx.agent.id, enemy = %enemy.id, slot, "standing ground");
                return Transition::replace(FightEnemy::new(enemy.id, slot));
            }
        }

        info!(agent = %cx.agent.id, enemy = %enemy.id, kind = %enemy.kind, radius, "panicking");
        cx.agent.target_enemy = Some(enemy.id);
        cx.say(format!("{} here, running!", enemy.kind), MessagePriority::Critical);
        cx.world.set_sprinting(cx.agent.id, true);
        self.destination = None;
        self.search_failures = 0;
        self.searches_started = 0;
        self.start_search(cx, &enemy, radius);
        Transition::Stay
    }

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Transition {
        let Some(enemy) = cx.world.enemy(self.enemy).filter(|e| !e.is_dead) else {
            return Self::calm_down(cx);
        };
        let Some(radius) = cx.flee_danger(&enemy) else {
            return Self::calm_down(cx);
        };

        let now = cx.now();
        if Self::is_safe(cx, &enemy, radius) {
            cx.agent.timers.start_if_stopped(SAFE_TIMER, now);
            if cx.agent.timers.has_elapsed(SAFE_TIMER, now, cx.config.panic_cooldown_secs) {
                return Self::calm_down(cx);
            }
        } else {
            cx.agent.timers.stop(SAFE_TIMER);
        }

        let me = cx.agent.id;
        if let Some(destination) = self.destination {
            let origin = cx.position();
            let arrived = flat_distance(origin, destination) <= cx.config.flee_arrive_distance;
            if arrived || cx.world.is_valid_path(origin, destination).is_none() {
                self.destination = None;
                self.start_search(cx, &enemy, radius);
            } else {
                cx.world.set_destination(me, destination);
                cx.world.move_to_destination(me);
            }
        }

        if self.search.is_none() && self.destination.is_none() {
            self.start_search(cx, &enemy, radius);
        }

        let mut finished = None;
        if let Some(task) = self.search.as_mut() {
            task.drive(cx);
            if task.is_finished() {
                finished = Some(task.task().outcome().clone());
            }
        }
        match finished {
            Some(SearchStep::Found(candidate)) => {
                debug!(
                    agent = %me,
                    node = candidate.node.id.0,
                    score = candidate.score,
                    "retreat node found"
                );
                self.finish_search();
                self.destination = Some(candidate.node.position);
                cx.world.set_destination(me, candidate.node.position);
                cx.world.move_to_destination(me);
            }
            Some(SearchStep::Exhausted) => {
                // Next tick starts a fresh pass
                self.finish_search();
                self.search_failures += 1;
                debug!(agent = %me, failures = self.search_failures, "no retreat node");
            }
            Some(SearchStep::Pending) | None => {}
        }

        if self.destination.is_none() {
            Self::dash_away(cx, &enemy, radius);
        }
        Transition::Stay
    }

    fn exit_cleanup(&mut self, cx: &mut TickContext<'_>) {
        self.scope.cancel_all();
        self.search = None;
        self.destination = None;
        cx.agent.timers.stop(SAFE_TIMER);
        cx.agent.target_enemy = None;
        cx.world.set_sprinting(cx.agent.id, false);
    }

    fn voice_hint(&self) -> Option<VoiceHint> {
        Some(VoiceHint::Scared)
    }

    fn on_signal(&mut self, _cx: &mut TickContext<'_>, _text: &str) -> Transition {
        Transition::Stay
    }

    fn on_chat(&mut self, _cx: &mut TickContext<'_>, _text: &str, _sender: EntityId) -> Transition {
        Transition::Stay
    }

    fn engaged_enemy(&self) -> Option<EntityId> {
        Some(self.enemy)
    }
}
