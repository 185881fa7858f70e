//! Error types
//!
//! The steady-state paths (`push_task`, `schedule_in`, timer dispatch) never
//! return errors; these cover the `try_*` variants and the porting-layer
//! wrappers. Exhaustion on the unconditional paths goes to [`crate::fault`].

/// Error type for recoverable operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Scheduler errors ============
    /// Scheduler used before `init`
    SchedNotInit = 1001,
    /// Priority outside `0..CFG_TASKPRIO_MAX`
    PrioInvalid = 1002,

    // ============ Pool errors ============
    /// No free slot left in a pool
    PoolExhausted = 2001,
    /// Handle does not refer to a live slot (freed or never allocated)
    HandleStale = 2002,

    // ============ Timer errors ============
    /// Absolute target too far from its reference to disambiguate from lateness
    AbsoluteOutOfRange = 3001,
    /// Timer is not armed
    TimerInactive = 3002,

    // ============ Pend errors ============
    /// Blocking call made with interrupts masked
    PendInCritical = 4001,
    /// Blocking call made from interrupt context
    PendIsr = 4002,
    /// Resource not available and the caller asked not to block
    PendWouldBlock = 4003,
    /// Operation timed out
    Timeout = 4004,

    // ============ Semaphore errors ============
    /// Semaphore overflow
    SemOvf = 5001,

    // ============ Mutex errors ============
    /// Release of a mutex that is not held
    MutexNotOwner = 6001,

    // ============ Queue errors ============
    /// Queue is full
    QFull = 7001,
    /// Queue is empty
    QEmpty = 7002,
}

/// Result type alias for fallible operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Numeric code, stable across releases
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// True for errors that stem from caller misuse rather than load
    #[inline]
    pub fn is_misuse(self) -> bool {
        matches!(
            self,
            OsError::SchedNotInit
                | OsError::PrioInvalid
                | OsError::HandleStale
                | OsError::PendInCritical
                | OsError::PendIsr
                | OsError::MutexNotOwner
        )
    }
}
