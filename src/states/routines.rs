//! Repeating search behaviour as cooperative sub-tasks
//!
//! Wandering, sprint/walk toggling and glancing around run independently,
//! each on its own wait schedule. [`SearchRoutines`] bundles the three so
//! every searching state starts and cancels them the same way.

use glam::Vec3;
use rand::Rng;

use crate::agent::context::TickContext;
use crate::agent::tasks::{Cooperative, SubTask, TaskPoll, TaskScope, Wait};
use crate::core::types::flat_distance;

/// A wander leg longer than this is abandoned (seconds)
const LEG_TIMEOUT_SECS: f32 = 15.0;
const WANDER_ATTEMPTS: usize = 6;
const ARRIVE_DISTANCE: f32 = 1.0;

/// Walk to random reachable points near the agent
#[derive(Debug, Default)]
pub struct WanderRoutine {
    radius: f32,
    target: Option<Vec3>,
    leg_started: f64,
}

impl WanderRoutine {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            target: None,
            leg_started: 0.0,
        }
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    fn pick_target(&self, cx: &mut TickContext<'_>) -> Option<Vec3> {
        let origin = cx.position();
        for _ in 0..WANDER_ATTEMPTS {
            let angle = cx.rng.gen_range(0.0..std::f32::consts::TAU);
            let reach = cx.rng.gen_range(self.radius * 0.3..=self.radius.max(0.1));
            let aim = origin + Vec3::new(angle.cos(), 0.0, angle.sin()) * reach;
            if let Some(point) = cx.world.snap_to_navigable(aim, 3.0) {
                if cx.world.is_valid_path(origin, point).is_some() {
                    return Some(point);
                }
            }
        }

        // Open space is scarce; fall back to a random reachable nav node
        let nodes = cx.world.nav_nodes();
        if nodes.is_empty() {
            return None;
        }
        let pick = nodes[cx.rng.gen_range(0..nodes.len())].position;
        cx.world.is_valid_path(origin, pick).map(|_| pick)
    }
}

impl SubTask for WanderRoutine {
    fn name(&self) -> &'static str {
        "wander"
    }

    fn resume(&mut self, cx: &mut TickContext<'_>) -> TaskPoll {
        let me = cx.agent.id;
        let arrived = self
            .target
            .map_or(true, |t| flat_distance(cx.position(), t) <= ARRIVE_DISTANCE);
        let stale = cx.now() - self.leg_started > LEG_TIMEOUT_SECS as f64;

        if arrived || stale || cx.world.destination(me) != self.target {
            self.target = self.pick_target(cx);
            self.leg_started = cx.now();
            match self.target {
                Some(target) => {
                    cx.world.set_destination(me, target);
                    cx.world.move_to_destination(me);
                }
                None => cx.world.stop(me),
            }
        }
        TaskPoll::Yield(Wait::NextTick)
    }
}

/// Flip between sprinting and walking at random intervals
#[derive(Debug)]
pub struct GaitToggle {
    sprinting: bool,
}

impl GaitToggle {
    pub fn new() -> Self {
        // The first resume flips this to walking
        Self { sprinting: true }
    }

    pub fn sprinting(&self) -> bool {
        self.sprinting
    }
}

impl Default for GaitToggle {
    fn default() -> Self {
        Self::new()
    }
}

impl SubTask for GaitToggle {
    fn name(&self) -> &'static str {
        "gait_toggle"
    }

    fn resume(&mut self, cx: &mut TickContext<'_>) -> TaskPoll {
        self.sprinting = !self.sprinting;
        cx.world.set_sprinting(cx.agent.id, self.sprinting);
        let (min, max) = (cx.config.gait_toggle_min_secs, cx.config.gait_toggle_max_secs);
        TaskPoll::Yield(Wait::Seconds(cx.rng.gen_range(min..=max.max(min))))
    }
}

/// Glance in a random direction every few seconds
#[derive(Debug, Default)]
pub struct LookAround {
    glances: u32,
}

impl LookAround {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn glances(&self) -> u32 {
        self.glances
    }
}

impl SubTask for LookAround {
    fn name(&self) -> &'static str {
        "look_around"
    }

    fn resume(&mut self, cx: &mut TickContext<'_>) -> TaskPoll {
        let angle = cx.rng.gen_range(0.0..std::f32::consts::TAU);
        let target = cx.position() + Vec3::new(angle.cos(), 0.0, angle.sin()) * 5.0;
        cx.world.look_at(cx.agent.id, target);
        self.glances += 1;
        let (min, max) = (cx.config.look_around_min_secs, cx.config.look_around_max_secs);
        TaskPoll::Yield(Wait::Seconds(cx.rng.gen_range(min..=max.max(min))))
    }
}

/// The sub-tasks of a searching state
#[derive(Debug, Default)]
pub struct SearchRoutines {
    scope: TaskScope,
    wander: Option<Cooperative<WanderRoutine>>,
    gait: Option<Cooperative<GaitToggle>>,
    look: Option<Cooperative<LookAround>>,
}

impl SearchRoutines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wander with gait toggling and glances
    pub fn start_full(&mut self, wander_radius: f32) {
        self.cancel();
        self.wander = Some(Cooperative::spawn(WanderRoutine::new(wander_radius), &mut self.scope));
        self.gait = Some(Cooperative::spawn(GaitToggle::new(), &mut self.scope));
        self.look = Some(Cooperative::spawn(LookAround::new(), &mut self.scope));
    }

    /// Wander at walking pace, no glancing
    pub fn start_wander(&mut self, wander_radius: f32) {
        self.cancel();
        self.wander = Some(Cooperative::spawn(WanderRoutine::new(wander_radius), &mut self.scope));
    }

    /// Stand and glance around only
    pub fn start_look_around(&mut self) {
        self.cancel();
        self.look = Some(Cooperative::spawn(LookAround::new(), &mut self.scope));
    }

    pub fn drive(&mut self, cx: &mut TickContext<'_>) {
        if let Some(task) = self.wander.as_mut() {
            task.drive(cx);
        }
        if let Some(task) = self.gait.as_mut() {
            task.drive(cx);
        }
        if let Some(task) = self.look.as_mut() {
            task.drive(cx);
        }
    }

    pub fn cancel(&mut self) {
        self.scope.cancel_all();
        self.wander = None;
        self.gait = None;
        self.look = None;
    }

    /// Running sub-tasks
    pub fn live_count(&self) -> usize {
        self.scope.live_count()
    }

    pub fn is_looking(&self) -> bool {
        self.look.as_ref().is_some_and(|t| t.is_live())
    }
}
