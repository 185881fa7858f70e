//! Scheduler module
//!
//! Non-preemptive run-to-completion scheduler: producers (ISRs, threads, timer
//! expiries) post callbacks at a priority, a single run-loop executes them
//! highest priority first, FIFO within a priority, and sleeps when all queues
//! are empty.

mod queue_set;

pub use queue_set::QueueSet;

use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::callback::Callback;
use crate::config::{CFG_TASKPRIO_MAX, CFG_TASK_LIST_DEPTH};
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::fault::{self, Fault};
use crate::pool::{Pool, SlotId};
use crate::power::{NoPowerManagement, PowerManager};
use crate::types::{SchedState, TaskPrio};

/// One queued unit of work
#[derive(Debug, Clone, Copy)]
pub struct Task {
    pub callback: Callback,
    pub prio: TaskPrio,
}

/// Snapshot of the queue-depth debug counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedStats {
    /// Tasks currently queued or running
    pub cur: u8,
    /// Peak of `cur`
    pub max: u8,
    /// Sum of `cur` sampled at every post
    pub sum: u32,
}

struct DepthCounters {
    cur: AtomicU8,
    max: AtomicU8,
    sum: AtomicU32,
}

impl DepthCounters {
    const fn new() -> Self {
        DepthCounters {
            cur: AtomicU8::new(0),
            max: AtomicU8::new(0),
            sum: AtomicU32::new(0),
        }
    }

    // Called with the critical section held
    fn on_push(&self) {
        let cur = self.cur.load(Ordering::Relaxed).saturating_add(1);
        self.cur.store(cur, Ordering::Relaxed);
        if cur > self.max.load(Ordering::Relaxed) {
            self.max.store(cur, Ordering::Relaxed);
        }
        let sum = self.sum.load(Ordering::Relaxed).wrapping_add(cur as u32);
        self.sum.store(sum, Ordering::Relaxed);
    }

    fn on_done(&self) {
        let cur = self.cur.load(Ordering::Relaxed);
        self.cur.store(cur.saturating_sub(1), Ordering::Relaxed);
    }

    fn reset(&self) {
        self.cur.store(0, Ordering::Relaxed);
        self.max.store(0, Ordering::Relaxed);
        self.sum.store(0, Ordering::Relaxed);
    }
}

/// Priority task scheduler
///
/// Construct once (a `static` works, `new` is `const`), call [`init`](Self::init),
/// then share `&Scheduler` with producers and hand it to the thread that calls
/// [`start`](Self::start).
pub struct Scheduler<P: PowerManager = NoPowerManagement> {
    queues: CsCell<QueueSet>,
    tasks: Pool<Task, CFG_TASK_LIST_DEPTH>,
    pm: P,
    /// Whether the scheduler currently holds its power block
    pm_blocked: AtomicBool,
    /// Run-loop wake-up flag
    wake: AtomicBool,
    claimed: AtomicBool,
    state: AtomicU8,
    depth: DepthCounters,
}

impl<P: PowerManager> Scheduler<P> {
    pub const fn new(pm: P) -> Self {
        Scheduler {
            queues: CsCell::new(QueueSet::new()),
            tasks: Pool::new(),
            pm,
            pm_blocked: AtomicBool::new(false),
            wake: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
            state: AtomicU8::new(SchedState::Uninitialized as u8),
            depth: DepthCounters::new(),
        }
    }

    /// Empty all queues and the task pool
    ///
    /// Must run before the first `push_task` or `start`.
    pub fn init(&self) {
        critical_section(|cs| {
            self.queues.borrow_mut(cs).clear();
            self.tasks.lock(cs).clear();
            self.depth.reset();
            self.pm_unblock();
            self.state.store(SchedState::Idle as u8, Ordering::Release);
        });
        crate::info!("sched: init, {=usize} levels, {=usize} slots", CFG_TASKPRIO_MAX, CFG_TASK_LIST_DEPTH);
    }

    /// Post `callback` at `prio`. Callable from interrupt context.
    ///
    /// Never drops the task: running out of task slots is fatal
    /// ([`Fault::TaskListOverflow`]), and so is an invalid priority or a
    /// scheduler that was never initialized ([`Fault::TaskRejected`]).
    pub fn push_task(&self, callback: Callback, prio: TaskPrio) {
        match self.try_push_task(callback, prio) {
            Ok(()) => {}
            Err(OsError::PoolExhausted) => {
                crate::error!("sched: critical, task list overflow");
                fault::fatal(Fault::TaskListOverflow)
            }
            Err(_e) => {
                crate::error!("sched: push_task rejected: {}", _e);
                fault::fatal(Fault::TaskRejected)
            }
        }
    }

    /// Post `callback` at `prio`, reporting exhaustion instead of faulting
    pub fn try_push_task(&self, callback: Callback, prio: TaskPrio) -> OsResult<()> {
        if prio as usize >= CFG_TASKPRIO_MAX {
            return Err(OsError::PrioInvalid);
        }
        if self.state() == SchedState::Uninitialized {
            return Err(OsError::SchedNotInit);
        }

        let task = Task {
            callback,
            prio,
        };

        critical_section(|cs| {
            self.pm_block();

            let tasks = self.tasks.lock(cs);
            let id = tasks.alloc(task).ok_or(OsError::PoolExhausted)?;
            if self.queues.borrow_mut(cs).push(prio, id).is_err() {
                tasks.free(id);
                return Err(OsError::PoolExhausted);
            }

            self.depth.on_push();
            Ok(())
        })?;

        self.notify();
        Ok(())
    }

    /// Run the run-loop forever
    ///
    /// Releases the platform's boot-time power blocks, then executes tasks
    /// highest priority first and sleeps whenever every queue is empty.
    pub fn start(&self) -> ! {
        let already = self.claimed.swap(true, Ordering::AcqRel);
        debug_assert!(!already, "scheduler started twice");
        debug_assert!(self.state() != SchedState::Uninitialized, "scheduler not initialized");

        for &level in self.pm.boot_blocks() {
            self.pm.unblock(level);
        }
        crate::info!("sched: run-loop started");

        loop {
            // Clear before looking, so a post racing with the check is not lost
            self.wake.store(false, Ordering::Release);

            match self.pop_or_idle() {
                Some((id, task)) => self.run_task(id, task),
                None => {
                    self.wait_for_work();
                    critical_section(|_cs| self.pm_block());
                }
            }
        }
    }

    /// Execute one queued task, if any. Returns whether a task ran.
    pub fn run_next(&self) -> bool {
        match self.pop_or_idle() {
            Some((id, task)) => {
                self.run_task(id, task);
                true
            }
            None => false,
        }
    }

    /// Execute tasks until every queue is empty, returning how many ran
    ///
    /// Equivalent to the run-loop minus the final sleep.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    #[inline]
    pub fn state(&self) -> SchedState {
        SchedState::from_raw(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state() == SchedState::Idle
    }

    /// Whether the scheduler currently forbids its power level
    #[inline]
    pub fn holds_power_block(&self) -> bool {
        self.pm_blocked.load(Ordering::Acquire)
    }

    /// Tasks queued across all levels (running task excluded)
    pub fn pending(&self) -> usize {
        self.queues.with(|q| q.len())
    }

    /// Tasks queued at `prio`
    pub fn pending_at(&self, prio: TaskPrio) -> usize {
        self.queues.with(|q| q.len_at(prio))
    }

    /// Task slots in use (queued plus running)
    pub fn slots_in_use(&self) -> usize {
        self.tasks.live()
    }

    /// Power-management collaborator
    #[inline]
    pub fn power(&self) -> &P {
        &self.pm
    }

    pub fn debug_stats(&self) -> SchedStats {
        SchedStats {
            cur: self.depth.cur.load(Ordering::Relaxed),
            max: self.depth.max.load(Ordering::Relaxed),
            sum: self.depth.sum.load(Ordering::Relaxed),
        }
    }

    pub fn reset_depth_sum(&self) {
        critical_section(|_cs| self.depth.sum.store(0, Ordering::Relaxed));
    }

    /// Take the next task, or go idle and drop the power block if none is queued
    fn pop_or_idle(&self) -> Option<(SlotId, Task)> {
        critical_section(|cs| {
            let next = self.queues.borrow_mut(cs).pop_highest();
            match next {
                Some((_prio, id)) => {
                    let task = self.tasks.lock(cs).get(id).copied();
                    debug_assert!(task.is_some(), "queued slot not live");
                    task.map(|t| (id, t))
                }
                None => {
                    self.enter_idle(cs);
                    None
                }
            }
        })
    }

    fn run_task(&self, id: SlotId, task: Task) {
        self.state.store(SchedState::Running as u8, Ordering::Release);
        crate::trace!("sched: run prio {=u8}", task.prio);

        task.callback.call();

        critical_section(|cs| {
            self.tasks.lock(cs).free(id);
            self.depth.on_done();
        });
    }

    fn enter_idle(&self, _cs: &CriticalSection) {
        self.state.store(SchedState::Idle as u8, Ordering::Release);
        self.pm_unblock();
    }

    fn wait_for_work(&self) {
        while !self.wake.swap(false, Ordering::AcqRel) {
            crate::port::wait_for_event();
        }
    }

    fn notify(&self) {
        self.wake.store(true, Ordering::Release);
        crate::port::signal_event();
    }

    fn pm_block(&self) {
        if !self.pm_blocked.swap(true, Ordering::AcqRel) {
            self.pm.block(self.pm.scheduler_blocker());
        }
    }

    fn pm_unblock(&self) {
        if self.pm_blocked.swap(false, Ordering::AcqRel) {
            self.pm.unblock(self.pm.scheduler_blocker());
        }
    }
}

impl Default for Scheduler<NoPowerManagement> {
    fn default() -> Self {
        Self::new(NoPowerManagement)
    }
}
