//! Timer-object layer
//!
//! Any number of one-shot and periodic timers, up to the pool capacity,
//! multiplexed onto the single alarm of the reference clock. On expiry a timer
//! either calls its callback directly from the alarm interrupt (inline ids) or
//! posts it to the scheduler at the timer's priority.
//!
//! Deadlines are kept as `(start, duration)` pairs and compared with wrapping
//! arithmetic, so they stay correct across counter wraparound. Millisecond
//! periods carry their sub-tick remainder from one period to the next, so a
//! periodic timer in `TimeUnit::Ms` does not drift against the reference.

mod callout;

pub use callout::Callout;

use heapless::Vec;
use portable_atomic::{AtomicU32, Ordering};

use crate::callback::Callback;
use crate::config::{CFG_LOOP_THRESHOLD, CFG_MAX_NUM_TIMERS, CFG_TASKPRIO_MAX};
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::fault::{self, Fault};
use crate::pool::{Pool, SlotId};
use crate::power::{NoPowerManagement, PowerManager};
use crate::sched::Scheduler;
use crate::time::wrap::{absolute_delay, absolute_in_range, elapsed};
use crate::time::{ms_to_ticks, AlarmClock, MsPeriod, ReferenceClock};
use crate::types::{Dispatch, TaskPrio, Ticks, TimeUnit, TimerKind};

/// Longest distance handed to the clock in one alarm. Further deadlines are
/// reached by re-arming on the early wake.
const MAX_ALARM_STEP: Ticks = 1 << 30;

/// Handle to a timer object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(SlotId);

impl TimerHandle {
    #[inline]
    pub fn slot(self) -> SlotId {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenTimer {
    id: u8,
    dispatch: Dispatch,
    kind: TimerKind,
    unit: TimeUnit,
    callback: Option<Callback>,
    armed: bool,
    start: Ticks,
    /// Current period or delay in reference ticks
    duration: Ticks,
    /// Source of the following periods for `TimeUnit::Ms`
    ms_period: MsPeriod,
}

impl OpenTimer {
    const fn new(id: u8, dispatch: Dispatch) -> Self {
        OpenTimer {
            id,
            dispatch,
            kind: TimerKind::OneShot,
            unit: TimeUnit::Tics,
            callback: None,
            armed: false,
            start: 0,
            duration: 0,
            ms_period: MsPeriod::new(0),
        }
    }

    /// Arm for `duration` in the timer's unit, counted from `now`
    fn arm_in(&mut self, now: Ticks, duration: u32) {
        self.ms_period = MsPeriod::new(duration);
        let mut ticks = match self.unit {
            TimeUnit::Tics => duration,
            TimeUnit::Ms => self.ms_period.next_ticks(),
        };
        if self.kind == TimerKind::Periodic && ticks == 0 {
            ticks = 1;
        }
        self.start = now;
        self.duration = ticks;
        self.armed = true;
    }

    /// Move a due periodic timer to its first deadline after `now`.
    ///
    /// The phase is kept; periods missed while masked collapse into one
    /// dispatch.
    fn reload(&mut self, now: Ticks) {
        match self.unit {
            TimeUnit::Tics => {
                let missed = elapsed(self.start, now) / self.duration;
                self.start = self.start.wrapping_add(self.duration.wrapping_mul(missed));
            }
            TimeUnit::Ms => {
                while self.is_due(now) {
                    self.start = self.start.wrapping_add(self.duration);
                    self.duration = self.ms_period.next_ticks().max(1);
                }
            }
        }
    }

    #[inline]
    fn remaining(&self, now: Ticks) -> Ticks {
        self.duration.saturating_sub(elapsed(self.start, now))
    }

    #[inline]
    fn is_due(&self, now: Ticks) -> bool {
        elapsed(self.start, now) >= self.duration
    }
}

#[inline]
fn to_ticks(duration: u32, unit: TimeUnit) -> Ticks {
    match unit {
        TimeUnit::Tics => duration,
        TimeUnit::Ms => ms_to_ticks(duration),
    }
}

/// Timer objects multiplexed onto one [`AlarmClock`]
///
/// Construct as a `static` next to the scheduler it posts to, then call
/// [`init`](Self::init) once, after the clock has been initialized:
///
/// ```ignore
/// static SCHED: Scheduler = Scheduler::new(NoPowerManagement);
/// static SCTIMER: SCTimer<Tim2Counter> = SCTimer::new(Tim2Counter::new(84_000_000));
/// static TIMERS: OpenTimers<&SCTimer<Tim2Counter>> = OpenTimers::new(&SCTIMER, &SCHED);
/// ```
pub struct OpenTimers<
    C: AlarmClock,
    P: PowerManager + 'static = NoPowerManagement,
    const N: usize = CFG_MAX_NUM_TIMERS,
> {
    clock: ReferenceClock<C>,
    sched: &'static Scheduler<P>,
    timers: Pool<OpenTimer, N>,
    current_compare: AtomicU32,
}

impl<C: AlarmClock, P: PowerManager + 'static, const N: usize> OpenTimers<C, P, N> {
    /// Wrap `base`, converting it to the reference frequency if needed
    pub const fn new(base: C, sched: &'static Scheduler<P>) -> Self {
        OpenTimers {
            clock: ReferenceClock::select(base),
            sched,
            timers: Pool::new(),
            current_compare: AtomicU32::new(0),
        }
    }

    /// Empty the pool and take over the clock's alarm
    pub fn init(&'static self) {
        critical_section(|_cs| {
            self.timers.clear();
            self.current_compare.store(0, Ordering::Relaxed);
            self.clock.cancel_alarm();
            if let ReferenceClock::Converted(conv) = &self.clock {
                conv.resync();
            }
        });

        let this = self as *const Self as usize;
        self.clock.set_handler(Callback::with_arg(Self::alarm_trampoline, this));

        crate::info!(
            "opentimers: init, {=usize} timers, base clock {=u32} Hz ({=str})",
            N,
            C::FREQUENCY,
            if self.clock.is_native() { "native" } else { "converted" }
        );
    }

    /// Allocate a timer. Ids below `CFG_INLINE_TIMER_IDS` run inline in the
    /// alarm interrupt; the rest are posted at `prio`.
    ///
    /// Running out of timers is fatal: see [`Fault::TimerPoolExhausted`].
    pub fn create(&self, id: u8, prio: TaskPrio) -> TimerHandle {
        match self.try_create(id, prio) {
            Ok(handle) => handle,
            Err(_e) => {
                crate::error!("opentimers: create failed: {}", _e);
                fault::fatal(Fault::TimerPoolExhausted)
            }
        }
    }

    pub fn try_create(&self, id: u8, prio: TaskPrio) -> OsResult<TimerHandle> {
        self.create_with(id, Dispatch::for_timer_id(id, prio))
    }

    /// Allocate a timer with an explicit dispatch target
    pub fn create_with(&self, id: u8, dispatch: Dispatch) -> OsResult<TimerHandle> {
        if let Dispatch::Task(prio) = dispatch {
            if prio as usize >= CFG_TASKPRIO_MAX {
                return Err(OsError::PrioInvalid);
            }
        }

        self.timers
            .alloc(OpenTimer::new(id, dispatch))
            .map(TimerHandle)
            .ok_or(OsError::PoolExhausted)
    }

    /// Arm `timer` to fire `duration` from now, once or every `duration`
    pub fn schedule_in(
        &self,
        timer: TimerHandle,
        duration: u32,
        unit: TimeUnit,
        kind: TimerKind,
        callback: Callback,
    ) -> OsResult<()> {
        debug_assert!(
            kind == TimerKind::OneShot || duration != 0,
            "zero-length periodic timer"
        );

        critical_section(|cs| {
            let now = self.clock.now();
            self.timers
                .lock(cs)
                .get_mut(timer.0)
                .map(|t| {
                    t.kind = kind;
                    t.unit = unit;
                    t.callback = Some(callback);
                    t.arm_in(now, duration);
                })
                .ok_or(OsError::HandleStale)?;

            self.rearm(cs, now);
            Ok(())
        })
    }

    /// Arm `timer` once for `reference + duration`
    ///
    /// `reference` is a past timestamp in reference ticks, such as the start
    /// of the current slot; `duration` is in `unit`. A target passed by less
    /// than `CFG_LOOP_THRESHOLD` fires immediately.
    pub fn schedule_absolute(
        &self,
        timer: TimerHandle,
        duration: u32,
        reference: Ticks,
        unit: TimeUnit,
        callback: Callback,
    ) -> OsResult<()> {
        let ticks = to_ticks(duration, unit);
        if !absolute_in_range(ticks, CFG_LOOP_THRESHOLD) {
            return Err(OsError::AbsoluteOutOfRange);
        }

        critical_section(|cs| {
            let now = self.clock.now();
            let delay = absolute_delay(now, reference, ticks, CFG_LOOP_THRESHOLD);

            self.timers
                .lock(cs)
                .get_mut(timer.0)
                .map(|t| {
                    t.kind = TimerKind::OneShot;
                    t.unit = unit;
                    t.callback = Some(callback);
                    t.start = now;
                    t.duration = delay;
                    t.armed = true;
                })
                .ok_or(OsError::HandleStale)?;

            self.rearm(cs, now);
            Ok(())
        })
    }

    /// Re-arm `timer` from now with a new duration in its current unit,
    /// keeping its kind and callback
    pub fn update_duration(&self, timer: TimerHandle, duration: u32) -> OsResult<()> {
        critical_section(|cs| {
            let now = self.clock.now();
            let timers = self.timers.lock(cs);
            let t = timers.get_mut(timer.0).ok_or(OsError::HandleStale)?;
            if t.callback.is_none() {
                return Err(OsError::TimerInactive);
            }

            t.arm_in(now, duration);

            self.rearm(cs, now);
            Ok(())
        })
    }

    /// Stop `timer` without freeing it
    ///
    /// A dispatch already posted to the scheduler still runs.
    pub fn cancel(&self, timer: TimerHandle) -> OsResult<()> {
        critical_section(|cs| {
            let now = self.clock.now();
            let t = self.timers.lock(cs).get_mut(timer.0).ok_or(OsError::HandleStale)?;
            t.armed = false;
            self.rearm(cs, now);
            Ok(())
        })
    }

    /// Cancel `timer` and return it to the pool
    pub fn destroy(&self, timer: TimerHandle) -> OsResult<()> {
        critical_section(|cs| {
            let now = self.clock.now();
            self.timers.lock(cs).free(timer.0).ok_or(OsError::HandleStale)?;
            self.rearm(cs, now);
            Ok(())
        })
    }

    /// Current reference tick count
    #[inline]
    pub fn get_value(&self) -> Ticks {
        self.clock.now()
    }

    /// Reference tick count sampled at the last expiry
    #[inline]
    pub fn get_current_compare_value(&self) -> Ticks {
        self.current_compare.load(Ordering::Relaxed)
    }

    pub fn is_armed(&self, timer: TimerHandle) -> bool {
        self.timers.get(timer.0).is_some_and(|t| t.armed)
    }

    /// Timers allocated from the pool
    pub fn active_count(&self) -> usize {
        self.timers.live()
    }

    /// Timer id given at creation
    pub fn timer_id(&self, timer: TimerHandle) -> Option<u8> {
        self.timers.get(timer.0).map(|t| t.id)
    }

    /// The clock timers run on
    #[inline]
    pub fn clock(&self) -> &ReferenceClock<C> {
        &self.clock
    }

    /// Alarm entry point: dispatch every due timer and re-arm for the next
    ///
    /// [`init`](Self::init) registers this with the clock; call it directly
    /// only when driving the alarm by hand.
    pub fn handle_alarm(&self) {
        let mut due: Vec<(Dispatch, Callback), N> = Vec::new();

        critical_section(|cs| {
            let now = self.clock.now();
            self.current_compare.store(now, Ordering::Relaxed);

            for (_, t) in self.timers.lock(cs).iter_mut() {
                if !t.armed || !t.is_due(now) {
                    continue;
                }

                if let Some(cb) = t.callback {
                    // At most one entry per timer, so this cannot overflow
                    let _ = due.push((t.dispatch, cb));
                }

                match t.kind {
                    TimerKind::OneShot => t.armed = false,
                    TimerKind::Periodic => t.reload(now),
                }
            }

            self.rearm(cs, now);
        });

        for (dispatch, cb) in due {
            match dispatch {
                Dispatch::Inline => cb.call(),
                Dispatch::Task(prio) => self.sched.push_task(cb, prio),
            }
        }
    }

    /// Program the clock for the nearest armed deadline, or disarm it
    fn rearm(&self, cs: &CriticalSection, now: Ticks) {
        let next = self
            .timers
            .lock(cs)
            .iter_mut()
            .filter(|(_, t)| t.armed)
            .map(|(_, t)| t.remaining(now))
            .min();

        match next {
            Some(remaining) => {
                let step = remaining.min(MAX_ALARM_STEP);
                crate::trace!("opentimers: next alarm in {=u32}", step);
                self.clock.set_alarm(now.wrapping_add(step));
            }
            None => self.clock.cancel_alarm(),
        }
    }

    fn alarm_trampoline(this: usize) {
        // SAFETY: `this` comes from the `&'static Self` registered in `init`,
        // and this function is only instantiated for that exact `Self`
        let this = unsafe { &*(this as *const Self) };
        this.handle_alarm();
    }
}
