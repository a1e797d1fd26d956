//! Cooperative task scheduling
//!
//! A FIFO of deferred callbacks drained against a per-frame deadline. There is
//! no priority and no cancellation: a task whose scope node has been destroyed
//! is simply skipped when popped. Callers that must not enqueue twice guard
//! with their own "already scheduled" flag.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use crate::scene::NodeId;

/// A deferred callback, optionally tied to a node's lifetime
pub struct Task<C> {
    /// Node that must still be alive when the task runs
    pub scope: Option<NodeId>,
    run: Box<dyn FnOnce(&mut C)>,
}

impl<C> Task<C> {
    /// Create a task
    pub fn new(scope: Option<NodeId>, run: impl FnOnce(&mut C) + 'static) -> Self {
        Self {
            scope,
            run: Box::new(run),
        }
    }

    /// Consume and run the task
    pub fn run(self, ctx: &mut C) {
        (self.run)(ctx);
    }
}

impl<C> fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("scope", &self.scope).finish_non_exhaustive()
    }
}

/// FIFO task queue
pub struct Scheduler<C> {
    queue: VecDeque<Task<C>>,
    total_scheduled: u64,
    total_run: u64,
    total_skipped: u64,
}

impl<C> Scheduler<C> {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            total_scheduled: 0,
            total_run: 0,
            total_skipped: 0,
        }
    }

    /// Enqueue a task at the back
    pub fn schedule(&mut self, task: Task<C>) {
        self.total_scheduled += 1;
        self.queue.push_back(task);
    }

    /// Pop the oldest task
    pub fn pop(&mut self) -> Option<Task<C>> {
        self.queue.pop_front()
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every queued task
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Tasks ever enqueued
    pub fn total_scheduled(&self) -> u64 {
        self.total_scheduled
    }

    /// Tasks that actually ran
    pub fn total_run(&self) -> u64 {
        self.total_run
    }

    /// Tasks dropped because their scope was gone
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.queue.len())
            .field("total_scheduled", &self.total_scheduled)
            .field("total_run", &self.total_run)
            .field("total_skipped", &self.total_skipped)
            .finish()
    }
}

/// Context a scheduler pass runs against
pub trait TaskContext: Sized {
    /// The scheduler owned by this context
    fn scheduler_mut(&mut self) -> &mut Scheduler<Self>;

    /// Current time, used for the deadline check
    fn now(&self) -> Instant;

    /// Whether a scope node is still alive
    fn scope_alive(&self, scope: NodeId) -> bool;
}

/// Run queued tasks in FIFO order until the queue empties or `deadline` passes.
///
/// The deadline is checked before every pop, so a task that overruns the
/// budget still completes but nothing after it starts. Returns the number of
/// tasks executed; skipped tasks are not counted.
pub fn run_due<C: TaskContext>(ctx: &mut C, deadline: Instant) -> usize {
    let mut executed = 0;
    while ctx.now() < deadline {
        let Some(task) = ctx.scheduler_mut().pop() else {
            break;
        };
        if let Some(scope) = task.scope {
            if !ctx.scope_alive(scope) {
                log::trace!("Skipping task for destroyed scope {:?}", scope);
                ctx.scheduler_mut().total_skipped += 1;
                continue;
            }
        }
        task.run(ctx);
        ctx.scheduler_mut().total_run += 1;
        executed += 1;
    }
    log::trace!(
        "Scheduler pass ran {} task(s), {} left queued",
        executed,
        ctx.scheduler_mut().len()
    );
    executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::{Clock, ManualClock};
    use slotmap::SlotMap;
    use std::time::Duration;

    struct Harness {
        scheduler: Scheduler<Harness>,
        clock: ManualClock,
        alive: SlotMap<NodeId, ()>,
        log: Vec<&'static str>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scheduler: Scheduler::new(),
                clock: ManualClock::new(),
                alive: SlotMap::with_key(),
                log: Vec::new(),
            }
        }

        fn push(&mut self, name: &'static str, cost_ms: u64) {
            self.scheduler.schedule(Task::new(None, move |h: &mut Harness| {
                h.log.push(name);
                h.clock.advance(Duration::from_millis(cost_ms));
            }));
        }
    }

    impl TaskContext for Harness {
        fn scheduler_mut(&mut self) -> &mut Scheduler<Self> {
            &mut self.scheduler
        }

        fn now(&self) -> Instant {
            self.clock.now()
        }

        fn scope_alive(&self, scope: NodeId) -> bool {
            self.alive.contains_key(scope)
        }
    }

    #[test]
    fn test_budget_stops_between_tasks() {
        let mut h = Harness::new();
        h.push("A", 4);
        h.push("B", 7);
        h.push("C", 1);

        let deadline = h.clock.now() + Duration::from_millis(10);
        let ran = run_due(&mut h, deadline);

        assert_eq!(ran, 2);
        assert_eq!(h.log, vec!["A", "B"]);
        assert_eq!(h.scheduler.len(), 1);

        let deadline = h.clock.now() + Duration::from_millis(10);
        assert_eq!(run_due(&mut h, deadline), 1);
        assert_eq!(h.log, vec!["A", "B", "C"]);
        assert!(h.scheduler.is_empty());
    }

    #[test]
    fn test_tasks_scheduled_during_a_pass_run_after_existing_ones() {
        let mut h = Harness::new();
        h.scheduler.schedule(Task::new(None, |h: &mut Harness| {
            h.log.push("first");
            h.scheduler.schedule(Task::new(None, |h: &mut Harness| h.log.push("nested")));
        }));
        h.push("second", 0);

        let deadline = h.clock.now() + Duration::from_millis(1);
        assert_eq!(run_due(&mut h, deadline), 3);
        assert_eq!(h.log, vec!["first", "second", "nested"]);
    }

    #[test]
    fn test_dead_scope_is_skipped() {
        let mut h = Harness::new();
        let live = h.alive.insert(());
        let dead = h.alive.insert(());
        h.alive.remove(dead);

        h.scheduler.schedule(Task::new(Some(dead), |h: &mut Harness| h.log.push("dead")));
        h.scheduler.schedule(Task::new(Some(live), |h: &mut Harness| h.log.push("live")));

        let deadline = h.clock.now() + Duration::from_millis(1);
        assert_eq!(run_due(&mut h, deadline), 1);
        assert_eq!(h.log, vec!["live"]);
        assert_eq!(h.scheduler.total_skipped(), 1);
        assert_eq!(h.scheduler.total_run(), 1);
    }

    #[test]
    fn test_expired_deadline_runs_nothing() {
        let mut h = Harness::new();
        h.push("A", 0);
        let deadline = h.clock.now();
        assert_eq!(run_due(&mut h, deadline), 0);
        assert_eq!(h.scheduler.len(), 1);
    }
}
