//! Cooperative sub-tasks
//!
//! Long-running behaviour (wandering, looking around, flee search, the
//! attack loop) is written as small resumable structs. A task runs until
//! its next wait point and returns how long to wait. The owning state
//! drives it once per AI tick and cancels it on exit; a cancelled task's
//! pending wait simply never resumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::agent::context::TickContext;
use crate::core::types::Tick;

/// How long a task waits before its next resume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wait {
    /// Resume on the next AI tick
    NextTick,
    /// Resume once this many simulated seconds have passed (at least one tick)
    Seconds(f32),
}

/// Result of one resume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskPoll {
    Yield(Wait),
    Complete,
}

/// A resumable unit of repeating work
pub trait SubTask {
    fn name(&self) -> &'static str;

    /// Run until the next wait point
    fn resume(&mut self, cx: &mut TickContext<'_>) -> TaskPoll;
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Tokens of every task a state has started
#[derive(Debug, Default)]
pub struct TaskScope {
    tokens: Vec<CancelToken>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a token tracked by this scope
    pub fn register(&mut self) -> CancelToken {
        // Finished tasks cancel their own token, so this drops them too
        self.tokens.retain(|t| !t.is_cancelled());
        let token = CancelToken::new();
        self.tokens.push(token.clone());
        token
    }

    pub fn cancel_all(&mut self) {
        for token in self.tokens.drain(..) {
            token.cancel();
        }
    }

    /// Tasks started through this scope that are not cancelled
    pub fn live_count(&self) -> usize {
        self.tokens.iter().filter(|t| !t.is_cancelled()).count()
    }

    /// Tokens still held, live or not yet pruned
    pub fn tracked(&self) -> usize {
        self.tokens.len()
    }
}

/// A sub-task plus its schedule and cancellation token
#[derive(Debug)]
pub struct Cooperative<T> {
    task: T,
    token: CancelToken,
    resume_tick: Tick,
    resume_at: f64,
    finished: bool,
}

impl<T: SubTask> Cooperative<T> {
    /// Schedule `task` to run on the next drive
    pub fn spawn(task: T, scope: &mut TaskScope) -> Self {
        Self {
            task,
            token: scope.register(),
            resume_tick: 0,
            resume_at: f64::NEG_INFINITY,
            finished: false,
        }
    }

    /// Resume the task if its wait is over
    ///
    /// Returns true when the task actually ran this call.
    pub fn drive(&mut self, cx: &mut TickContext<'_>) -> bool {
        if self.finished || self.token.is_cancelled() {
            return false;
        }
        if cx.clock.tick < self.resume_tick || cx.clock.elapsed + 1e-6 < self.resume_at {
            return false;
        }

        match self.task.resume(cx) {
            TaskPoll::Yield(Wait::NextTick) => {
                self.resume_tick = cx.clock.tick + 1;
                self.resume_at = cx.clock.elapsed;
            }
            TaskPoll::Yield(Wait::Seconds(secs)) => {
                self.resume_tick = cx.clock.tick + 1;
                self.resume_at = cx.clock.elapsed + secs.max(0.0) as f64;
            }
            TaskPoll::Complete => {
                self.finished = true;
                self.token.cancel();
            }
        }
        true
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Neither finished nor cancelled
    pub fn is_live(&self) -> bool {
        !self.finished && !self.token.is_cancelled()
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    pub fn name(&self) -> &'static str {
        self.task.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::harness::Harness;

    #[test]
    fn test_cancel_all_cancels_registered_tokens() {
        let mut scope = TaskScope::new();
        let a = scope.register();
        let b = scope.register();
        assert_eq!(scope.live_count(), 2);
        scope.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert_eq!(scope.live_count(), 0);
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_register_prunes_cancelled() {
        let mut scope = TaskScope::new();
        let first = scope.register();
        first.cancel();
        let _second = scope.register();
        assert_eq!(scope.live_count(), 1);
        assert_eq!(scope.tracked(), 1);
    }

    /// Completes on its first resume
    struct OneShot;

    impl SubTask for OneShot {
        fn name(&self) -> &'static str {
            "one_shot"
        }

        fn resume(&mut self, _cx: &mut TickContext<'_>) -> TaskPoll {
            TaskPoll::Complete
        }
    }

    /// Yields for a fixed number of seconds, counting resumes
    struct Pacer {
        secs: f32,
        resumes: u32,
    }

    impl SubTask for Pacer {
        fn name(&self) -> &'static str {
            "pacer"
        }

        fn resume(&mut self, _cx: &mut TickContext<'_>) -> TaskPoll {
            self.resumes += 1;
            TaskPoll::Yield(Wait::Seconds(self.secs))
        }
    }

    #[test]
    fn test_finished_tasks_do_not_pile_up_in_scope() {
        let mut harness = Harness::open(10, 10);
        let mut scope = TaskScope::new();
        for _ in 0..20 {
            let mut task = Cooperative::spawn(OneShot, &mut scope);
            assert!(task.drive(&mut harness.cx()));
            assert!(task.is_finished());
            assert!(!task.is_live());
            harness.advance();
        }
        assert_eq!(scope.live_count(), 0);
        assert!(scope.tracked() <= 1);
    }

    #[test]
    fn test_wait_seconds_skips_ticks() {
        let mut harness = Harness::open(10, 10);
        let mut scope = TaskScope::new();
        // 0.2 s per tick, so one resume every third tick
        let mut task = Cooperative::spawn(Pacer { secs: 0.6, resumes: 0 }, &mut scope);
        for _ in 0..9 {
            harness.advance();
            task.drive(&mut harness.cx());
        }
        assert_eq!(task.task().resumes, 3);

        scope.cancel_all();
        harness.advance();
        harness.advance();
        harness.advance();
        assert!(!task.drive(&mut harness.cx()));
        assert_eq!(task.task().resumes, 3);
    }
}
