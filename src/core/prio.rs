//! Priority bitmap for O(1) "highest non-empty queue" lookup
//!
//! One bit per priority level, set while that level's FIFO holds at least one
//! task. Bit 31 of word 0 is priority 0, so the first set bit found by a
//! leading-zero count is the level to service next.

use crate::config::CFG_TASKPRIO_MAX;
use crate::types::TaskPrio;

/// Number of words needed for the priority bitmap
const PRIO_TBL_SIZE: usize = (CFG_TASKPRIO_MAX + 31) / 32;

/// Bitmap of priority levels with pending tasks
#[derive(Debug, Clone, Copy)]
pub struct PrioTable {
    bitmap: [u32; PRIO_TBL_SIZE],
}

impl PrioTable {
    pub const fn new() -> Self {
        PrioTable {
            bitmap: [0; PRIO_TBL_SIZE],
        }
    }

    #[inline(always)]
    fn locate(prio: TaskPrio) -> (usize, u32) {
        debug_assert!((prio as usize) < CFG_TASKPRIO_MAX);
        ((prio / 32) as usize, 1 << (31 - (prio % 32)))
    }

    /// Mark `prio` as having pending work
    #[inline]
    pub fn insert(&mut self, prio: TaskPrio) {
        let (word, mask) = Self::locate(prio);
        self.bitmap[word] |= mask;
    }

    /// Mark `prio` as drained
    #[inline]
    pub fn remove(&mut self, prio: TaskPrio) {
        let (word, mask) = Self::locate(prio);
        self.bitmap[word] &= !mask;
    }

    /// Highest (numerically lowest) level with pending work
    #[inline]
    pub fn highest(&self) -> Option<TaskPrio> {
        self.bitmap
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(i, &word)| (i * 32) as TaskPrio + word.leading_zeros() as TaskPrio)
    }

    #[inline]
    pub fn is_set(&self, prio: TaskPrio) -> bool {
        let (word, mask) = Self::locate(prio);
        self.bitmap[word] & mask != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap.iter().all(|&w| w == 0)
    }

    pub fn clear(&mut self) {
        self.bitmap = [0; PRIO_TBL_SIZE];
    }
}

impl Default for PrioTable {
    fn default() -> Self {
        Self::new()
    }
}
