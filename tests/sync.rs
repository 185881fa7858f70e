//! Tests for the semaphore, mutex and event queue wrappers
//!
//! The critical-section nesting count is process wide, so these tests run
//! one at a time.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard};
use std::thread;

use owcore::critical::critical_section;
use owcore::eventq::EventQueue;
use owcore::mutex::Mutex;
use owcore::sem::Semaphore;
use owcore::sync::WAIT_FOREVER;
use owcore::time::AlarmClock;
use owcore::{Callback, OsError, Ticks};

static SERIAL: StdMutex<()> = StdMutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clock advanced by hand that counts how often it is read
struct TestClock {
    now: AtomicU32,
    reads: AtomicU32,
}

impl TestClock {
    const fn new() -> Self {
        TestClock {
            now: AtomicU32::new(0),
            reads: AtomicU32::new(0),
        }
    }

    fn advance(&self, ticks: u32) {
        self.now.fetch_add(ticks, Ordering::SeqCst);
    }

    /// Block until a waiter has started measuring its timeout
    fn wait_for_reader(&self) {
        while self.reads.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
    }
}

impl AlarmClock for TestClock {
    const FREQUENCY: u32 = 32_768;

    fn now(&self) -> Ticks {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.now.load(Ordering::SeqCst)
    }

    fn set_alarm(&self, _target: Ticks) {}

    fn cancel_alarm(&self) {}

    fn set_handler(&self, _handler: Callback) {}
}

/// Run `f` while another thread advances `clock` one tick at a time
fn with_ticker<R>(clock: &TestClock, f: impl FnOnce() -> R) -> R {
    let done = AtomicBool::new(false);
    thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::SeqCst) {
                clock.advance(1);
                thread::yield_now();
            }
        });
        let r = f();
        done.store(true, Ordering::SeqCst);
        r
    })
}

#[cfg(test)]
mod sem_tests {
    use super::*;

    #[test]
    fn test_pend_takes_available_token() {
        let _s = serial();
        let clock = TestClock::new();
        let sem = Semaphore::new(1);

        assert_eq!(sem.pend(10, &clock), Ok(()));
        assert_eq!(sem.count(), 0);
        assert_eq!(sem.pend(0, &clock), Err(OsError::PendWouldBlock));
    }

    #[test]
    fn test_pend_in_critical_section_fails_fast() {
        let _s = serial();
        let clock = TestClock::new();
        let sem = Semaphore::new(0);

        let r = critical_section(|_cs| sem.pend(WAIT_FOREVER, &clock));
        assert_eq!(r, Err(OsError::PendInCritical));
        assert!(r.unwrap_err().is_misuse());
    }

    #[test]
    fn test_pend_times_out() {
        let _s = serial();
        let clock = TestClock::new();
        let sem = Semaphore::new(0);

        let r = with_ticker(&clock, || sem.pend(100, &clock));
        assert_eq!(r, Err(OsError::Timeout));
        assert!(clock.now.load(Ordering::SeqCst) >= 100);
    }

    #[test]
    fn test_release_wakes_waiter() {
        let _s = serial();
        let clock = TestClock::new();
        let sem = Semaphore::new(0);

        thread::scope(|s| {
            s.spawn(|| {
                clock.wait_for_reader();
                sem.release().unwrap();
            });
            assert_eq!(sem.pend(WAIT_FOREVER, &clock), Ok(()));
        });
        assert_eq!(sem.count(), 0);
    }
}

#[cfg(test)]
mod mutex_tests {
    use super::*;

    #[test]
    fn test_lock_release() {
        let _s = serial();
        let clock = TestClock::new();
        let m = Mutex::new();

        assert_eq!(m.release(), Err(OsError::MutexNotOwner));
        assert_eq!(m.pend(0, &clock), Ok(()));
        assert!(m.is_locked());
        assert_eq!(m.pend(0, &clock), Err(OsError::PendWouldBlock));
        assert_eq!(m.release(), Ok(()));
        assert!(!m.is_locked());
    }

    #[test]
    fn test_waiter_gets_lock_after_release() {
        let _s = serial();
        let clock = TestClock::new();
        let m = Mutex::new();
        m.pend(0, &clock).unwrap();
        clock.reads.store(0, Ordering::SeqCst);

        thread::scope(|s| {
            s.spawn(|| {
                clock.wait_for_reader();
                m.release().unwrap();
            });
            assert_eq!(m.pend(WAIT_FOREVER, &clock), Ok(()));
        });
        assert!(m.is_locked());
    }

    #[test]
    fn test_pend_times_out_while_held() {
        let _s = serial();
        let clock = TestClock::new();
        let m = Mutex::new();
        m.pend(0, &clock).unwrap();

        let r = with_ticker(&clock, || m.pend(50, &clock));
        assert_eq!(r, Err(OsError::Timeout));
    }
}

#[cfg(test)]
mod eventq_tests {
    use super::*;

    static RAN: AtomicUsize = AtomicUsize::new(0);

    fn event(tag: usize) {
        RAN.store(tag, Ordering::SeqCst);
    }

    #[test]
    fn test_fifo_order_and_capacity() {
        let _s = serial();
        let q: EventQueue<3> = EventQueue::new();

        for tag in 1..=3 {
            q.put(Callback::with_arg(event, tag)).unwrap();
        }
        assert_eq!(q.put(Callback::with_arg(event, 4)), Err(OsError::QFull));

        for tag in 1..=3 {
            q.get_no_wait().unwrap().call();
            assert_eq!(RAN.load(Ordering::SeqCst), tag);
        }
        assert!(q.get_no_wait().is_none());
    }

    #[test]
    fn test_get_times_out_when_empty() {
        let _s = serial();
        let clock = TestClock::new();
        let q: EventQueue<2> = EventQueue::new();

        assert_eq!(q.get(0, &clock).err(), Some(OsError::PendWouldBlock));
        let r = with_ticker(&clock, || q.get(20, &clock));
        assert_eq!(r.err(), Some(OsError::Timeout));
    }

    #[test]
    fn test_run_executes_posted_event() {
        let _s = serial();
        let clock = TestClock::new();
        let q: EventQueue<2> = EventQueue::new();

        thread::scope(|s| {
            s.spawn(|| {
                clock.wait_for_reader();
                q.put(Callback::with_arg(event, 42)).unwrap();
            });
            q.run(&clock).unwrap();
        });
        assert_eq!(RAN.load(Ordering::SeqCst), 42);
        assert!(q.is_empty());
    }
}
