//! Power-management collaborator
//!
//! The scheduler holds one sleep block while any task is queued or running,
//! so the processor cannot drop into the modes that would add wake-up latency
//! to time-slotted work.

use crate::core::cs_cell::CsCell;

/// Power mode index; 0 is the deepest sleep mode
pub type PmLevel = u8;

/// Advisory sleep-mode blocking, implemented by the platform
pub trait PowerManager {
    /// Forbid entering `level`
    fn block(&self, level: PmLevel);

    /// Allow entering `level` again
    fn unblock(&self, level: PmLevel);

    /// Level the scheduler blocks while work is pending
    fn scheduler_blocker(&self) -> PmLevel;

    /// Blocks held since boot that the run-loop releases when it starts
    fn boot_blocks(&self) -> &[PmLevel] {
        &[]
    }
}

impl<P: PowerManager + ?Sized> PowerManager for &P {
    fn block(&self, level: PmLevel) {
        (**self).block(level)
    }

    fn unblock(&self, level: PmLevel) {
        (**self).unblock(level)
    }

    fn scheduler_blocker(&self) -> PmLevel {
        (**self).scheduler_blocker()
    }

    fn boot_blocks(&self) -> &[PmLevel] {
        (**self).boot_blocks()
    }
}

/// Platforms without tiered sleep modes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPowerManagement;

impl PowerManager for NoPowerManagement {
    fn block(&self, _level: PmLevel) {}

    fn unblock(&self, _level: PmLevel) {}

    fn scheduler_blocker(&self) -> PmLevel {
        0
    }
}

/// Counting per-mode blocker table with `MODES` power modes.
///
/// A mode is usable only when it and every lighter mode above it are
/// unblocked, so the deepest usable mode is one below the lightest blocked one.
pub struct LayeredPm<const MODES: usize> {
    blockers: CsCell<[u8; MODES]>,
    boot: &'static [PmLevel],
}

impl<const MODES: usize> LayeredPm<MODES> {
    /// Create the table with `boot` levels already blocked
    pub const fn new(boot: &'static [PmLevel]) -> Self {
        let mut blockers = [0u8; MODES];
        let mut i = 0;
        while i < boot.len() {
            blockers[boot[i] as usize] += 1;
            i += 1;
        }
        LayeredPm {
            blockers: CsCell::new(blockers),
            boot,
        }
    }

    /// Number of outstanding blocks on `level`
    pub fn block_count(&self, level: PmLevel) -> u8 {
        self.blockers.with(|b| b[level as usize])
    }

    #[inline]
    pub fn is_blocked(&self, level: PmLevel) -> bool {
        self.block_count(level) > 0
    }

    /// Deepest mode currently allowed, `None` if even the lightest is blocked
    pub fn allowed_mode(&self) -> Option<PmLevel> {
        self.blockers.with(|b| match b.iter().rposition(|&n| n > 0) {
            None => Some(0),
            Some(i) if i + 1 >= MODES => None,
            Some(i) => Some((i + 1) as PmLevel),
        })
    }
}

impl<const MODES: usize> PowerManager for LayeredPm<MODES> {
    fn block(&self, level: PmLevel) {
        self.blockers.with(|b| {
            let n = &mut b[level as usize];
            debug_assert!(*n < u8::MAX, "pm blocker overflow");
            *n = n.saturating_add(1);
        });
    }

    fn unblock(&self, level: PmLevel) {
        self.blockers.with(|b| {
            let n = &mut b[level as usize];
            debug_assert!(*n > 0, "pm unblock without block");
            *n = n.saturating_sub(1);
        });
    }

    fn scheduler_blocker(&self) -> PmLevel {
        (MODES - 1) as PmLevel
    }

    fn boot_blocks(&self) -> &[PmLevel] {
        self.boot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_blocks_applied() {
        static BOOT: [PmLevel; 2] = [2, 3];
        let pm: LayeredPm<4> = LayeredPm::new(&BOOT);
        assert!(pm.is_blocked(3));
        assert!(pm.is_blocked(2));
        assert_eq!(pm.allowed_mode(), None);

        pm.unblock(3);
        assert_eq!(pm.allowed_mode(), Some(3));
        pm.unblock(2);
        assert_eq!(pm.allowed_mode(), Some(0));
    }

    #[test]
    fn test_block_counts_nest() {
        let pm: LayeredPm<4> = LayeredPm::new(&[]);
        pm.block(1);
        pm.block(1);
        pm.unblock(1);
        assert_eq!(pm.block_count(1), 1);
        assert_eq!(pm.allowed_mode(), Some(2));
    }
}
