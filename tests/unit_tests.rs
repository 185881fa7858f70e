//! Unit tests for core scheduling modules
//!
//! These tests run on the host (not embedded target) to verify
//! the core algorithms work correctly.

#[cfg(test)]
mod prio_tests {
    use owcore::config::CFG_TASKPRIO_MAX;
    use owcore::prio::PrioTable;

    #[test]
    fn test_empty_table() {
        let table = PrioTable::new();
        assert!(table.is_empty());
        assert_eq!(table.highest(), None);
    }

    #[test]
    fn test_multiple_priorities() {
        let mut table = PrioTable::new();

        // Insert in random order
        table.insert(6);
        table.insert(2);
        table.insert(4);
        table.insert(0);

        assert_eq!(table.highest(), Some(0));

        table.remove(0);
        assert_eq!(table.highest(), Some(2));

        table.remove(2);
        assert_eq!(table.highest(), Some(4));

        table.remove(4);
        assert_eq!(table.highest(), Some(6));

        table.remove(6);
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_priorities() {
        let mut table = PrioTable::new();
        for p in (0..CFG_TASKPRIO_MAX as u8).rev() {
            table.insert(p);
            assert_eq!(table.highest(), Some(p));
        }
        for p in 0..CFG_TASKPRIO_MAX as u8 {
            assert!(table.is_set(p));
        }
        table.clear();
        assert!(table.is_empty());
    }
}

#[cfg(test)]
mod pool_tests {
    use owcore::pool::Pool;

    #[test]
    fn test_capacity_respected() {
        let pool: Pool<u32, 4> = Pool::new();
        let ids: Vec<_> = (0..4).map(|v| pool.alloc(v).unwrap()).collect();
        assert!(pool.is_full());
        assert_eq!(pool.alloc(99), None);
        assert_eq!(pool.live(), 4);

        assert_eq!(pool.free(ids[1]), Some(1));
        assert!(pool.alloc(5).is_some());
        assert_eq!(pool.live(), 4);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let pool: Pool<u32, 2> = Pool::new();
        let id = pool.alloc(7).unwrap();
        assert_eq!(pool.free(id), Some(7));
        assert_eq!(pool.free(id), None);
        assert_eq!(pool.get(id), None);

        // Same slot, new generation
        let again = pool.alloc(8).unwrap();
        assert_eq!(again.index(), id.index());
        assert!(!pool.contains(id));
        assert!(pool.contains(again));
    }

    #[test]
    fn test_alloc_free_cycles_do_not_leak() {
        let pool: Pool<u8, 3> = Pool::new();
        for round in 0..1000u32 {
            let a = pool.alloc(round as u8).unwrap();
            let b = pool.alloc(0).unwrap();
            pool.free(a);
            pool.free(b);
        }
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.peak(), 2);
        for _ in 0..3 {
            assert!(pool.alloc(0).is_some());
        }
    }
}

#[cfg(test)]
mod sched_tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use owcore::power::{LayeredPm, PowerManager};
    use owcore::{Callback, NoPowerManagement, OsError, SchedState, Scheduler};

    #[test]
    fn test_priority_then_fifo() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);
        static ORDER: Mutex<Vec<char>> = Mutex::new(Vec::new());

        SCHED.init();
        SCHED.push_task(Callback::new(|| ORDER.lock().unwrap().push('A')), 2);
        SCHED.push_task(Callback::new(|| ORDER.lock().unwrap().push('B')), 1);
        SCHED.push_task(Callback::new(|| ORDER.lock().unwrap().push('C')), 1);

        assert_eq!(SCHED.pending(), 3);
        assert_eq!(SCHED.run_pending(), 3);
        assert_eq!(*ORDER.lock().unwrap(), vec!['B', 'C', 'A']);
        assert!(SCHED.is_idle());
        assert_eq!(SCHED.slots_in_use(), 0);
    }

    #[test]
    fn test_interleaved_posts_keep_order() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);
        static LOG: Mutex<Vec<(u8, usize)>> = Mutex::new(Vec::new());

        fn record(tag: usize) {
            LOG.lock().unwrap().push(((tag >> 8) as u8, tag & 0xFF));
        }

        SCHED.init();
        let prios = [3u8, 0, 7, 3, 1, 0, 7, 1, 3, 0];
        for (seq, &p) in prios.iter().enumerate() {
            SCHED.push_task(Callback::with_arg(record, (p as usize) << 8 | seq), p);
        }
        SCHED.run_pending();

        let log = LOG.lock().unwrap();
        assert_eq!(log.len(), prios.len());
        for pair in log.windows(2) {
            let ((p0, s0), (p1, s1)) = (pair[0], pair[1]);
            assert!(p0 < p1 || (p0 == p1 && s0 < s1), "{:?} ran before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_task_posted_from_task_runs() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);
        static ORDER: Mutex<Vec<u8>> = Mutex::new(Vec::new());

        SCHED.init();
        SCHED.push_task(
            Callback::new(|| {
                ORDER.lock().unwrap().push(1);
                SCHED.push_task(Callback::new(|| ORDER.lock().unwrap().push(2)), 5);
            }),
            4,
        );
        assert_eq!(SCHED.run_pending(), 2);
        assert_eq!(*ORDER.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_power_block_round_trip() {
        static PM: LayeredPm<3> = LayeredPm::new(&[]);
        static SCHED: Scheduler<&LayeredPm<3>> = Scheduler::new(&PM);

        SCHED.init();
        let level = PM.scheduler_blocker();
        assert!(!SCHED.holds_power_block());
        assert!(!PM.is_blocked(level));

        SCHED.push_task(Callback::new(|| {}), 0);
        SCHED.push_task(Callback::new(|| {}), 1);
        assert!(SCHED.holds_power_block());
        assert_eq!(PM.block_count(level), 1);

        SCHED.run_next();
        assert!(SCHED.holds_power_block());

        SCHED.run_pending();
        assert!(!SCHED.holds_power_block());
        assert_eq!(PM.block_count(level), 0);
    }

    #[test]
    fn test_debug_counters() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);

        SCHED.init();
        for _ in 0..3 {
            SCHED.push_task(Callback::new(|| {}), 2);
        }
        let stats = SCHED.debug_stats();
        assert_eq!((stats.cur, stats.max, stats.sum), (3, 3, 6));

        SCHED.run_pending();
        SCHED.reset_depth_sum();
        let stats = SCHED.debug_stats();
        assert_eq!((stats.cur, stats.max, stats.sum), (0, 3, 0));
    }

    #[test]
    fn test_try_push_rejects_misuse() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);

        assert_eq!(SCHED.state(), SchedState::Uninitialized);
        assert_eq!(
            SCHED.try_push_task(Callback::new(|| {}), 0),
            Err(OsError::SchedNotInit)
        );

        SCHED.init();
        assert_eq!(
            SCHED.try_push_task(Callback::new(|| {}), owcore::CFG_TASKPRIO_MAX as u8),
            Err(OsError::PrioInvalid)
        );
    }

    #[test]
    fn test_try_push_reports_exhaustion() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);

        SCHED.init();
        for _ in 0..owcore::CFG_TASK_LIST_DEPTH {
            SCHED.try_push_task(Callback::new(|| {}), 3).unwrap();
        }
        assert_eq!(
            SCHED.try_push_task(Callback::new(|| {}), 3),
            Err(OsError::PoolExhausted)
        );
        assert_eq!(SCHED.run_pending(), owcore::CFG_TASK_LIST_DEPTH);
    }

    #[test]
    #[should_panic(expected = "TaskListOverflow")]
    fn test_overflow_is_fatal() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);

        SCHED.init();
        for _ in 0..=owcore::CFG_TASK_LIST_DEPTH {
            SCHED.push_task(Callback::new(|| {}), 0);
        }
    }

    #[test]
    #[should_panic(expected = "TaskRejected")]
    fn test_push_before_init_is_fatal() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);

        SCHED.push_task(Callback::new(|| {}), 0);
    }

    #[test]
    #[should_panic(expected = "TaskRejected")]
    fn test_push_bad_priority_is_fatal() {
        static SCHED: Scheduler = Scheduler::new(NoPowerManagement);

        SCHED.init();
        SCHED.push_task(Callback::new(|| {}), owcore::CFG_TASKPRIO_MAX as u8);
    }

    /// Spin until `cond` holds, failing after a few seconds
    fn wait_until(what: &str, cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_run_loop_sleeps_and_wakes() {
        static PM: LayeredPm<3> = LayeredPm::new(&[1]);
        static SCHED: Scheduler<&LayeredPm<3>> = Scheduler::new(&PM);
        static RAN: AtomicU32 = AtomicU32::new(0);
        static BLOCKED_WHILE_RUNNING: AtomicBool = AtomicBool::new(false);

        let level = PM.scheduler_blocker();
        SCHED.init();
        assert!(PM.is_blocked(1));

        // The run-loop never returns; the thread ends with the test binary
        std::thread::spawn(|| {
            SCHED.start();
        });

        wait_until("boot blocks released", || !PM.is_blocked(1));
        wait_until("run-loop idle", || SCHED.is_idle() && !SCHED.holds_power_block());
        assert_eq!(PM.block_count(level), 0);

        for round in 1..=3u32 {
            SCHED.push_task(
                Callback::new(|| {
                    let held = SCHED.holds_power_block() && PM.is_blocked(PM.scheduler_blocker());
                    BLOCKED_WHILE_RUNNING.store(held, Ordering::SeqCst);
                    assert_eq!(SCHED.state(), SchedState::Running);
                    RAN.fetch_add(1, Ordering::SeqCst);
                }),
                1,
            );

            wait_until("task run", || RAN.load(Ordering::SeqCst) == round);
            assert!(BLOCKED_WHILE_RUNNING.swap(false, Ordering::SeqCst));

            // Back to sleep with the block dropped
            wait_until("block released", || SCHED.is_idle() && !SCHED.holds_power_block());
            assert_eq!(PM.block_count(level), 0);
            assert_eq!(SCHED.slots_in_use(), 0);
        }
    }
}

#[cfg(test)]
mod error_tests {
    use owcore::OsError;

    #[test]
    fn test_error_codes() {
        assert_eq!(OsError::SchedNotInit.code(), 1001);
        assert_eq!(OsError::PoolExhausted.code(), 2001);
        assert_eq!(OsError::QFull.code(), 7001);
        assert!(OsError::HandleStale.is_misuse());
        assert!(!OsError::Timeout.is_misuse());
    }
}

#[cfg(test)]
mod types_tests {
    use owcore::{Dispatch, SchedState, TimeUnit, TimerKind};

    #[test]
    fn test_dispatch_for_timer_id() {
        assert_eq!(Dispatch::for_timer_id(0, 3), Dispatch::Inline);
        assert_eq!(Dispatch::for_timer_id(1, 3), Dispatch::Inline);
        assert_eq!(Dispatch::for_timer_id(2, 3), Dispatch::Task(3));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TimeUnit::default(), TimeUnit::Tics);
        assert_eq!(TimerKind::default(), TimerKind::OneShot);
        assert_eq!(SchedState::Idle as u8, 1);
    }
}

#[cfg(test)]
mod config_tests {
    use owcore::config::*;

    #[test]
    fn test_config_values() {
        assert_eq!(CFG_TASKPRIO_MAX, 8);
        assert_eq!(CFG_TASK_LIST_DEPTH, 20);
        assert_eq!(CFG_SCTIMER_FREQUENCY, 32_768);
        assert_eq!(CFG_LOOP_THRESHOLD, 2 * CFG_PORT_TICS_PER_MS * 65_535);
        assert!(CFG_LOOP_THRESHOLD > 65_535 * CFG_PORT_TICS_PER_MS);
    }
}
