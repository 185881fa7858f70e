//! Priority queue set - one FIFO of task slots per priority level
//!
//! Tasks are appended at the tail of their level and taken from the head of
//! the highest non-empty level, tracked by a [`PrioTable`] bitmap.

use heapless::Deque;

use crate::config::{CFG_TASKPRIO_MAX, CFG_TASK_LIST_DEPTH};
use crate::pool::SlotId;
use crate::prio::PrioTable;
use crate::types::TaskPrio;

type TaskFifo = Deque<SlotId, CFG_TASK_LIST_DEPTH>;

const EMPTY_FIFO: TaskFifo = Deque::new();

/// `CFG_TASKPRIO_MAX` independent FIFOs
///
/// Each FIFO can hold the whole task pool, so pushing a freshly allocated
/// slot never fails for lack of queue space.
pub struct QueueSet {
    fifos: [TaskFifo; CFG_TASKPRIO_MAX],
    ready: PrioTable,
}

impl QueueSet {
    pub const fn new() -> Self {
        QueueSet {
            fifos: [EMPTY_FIFO; CFG_TASKPRIO_MAX],
            ready: PrioTable::new(),
        }
    }

    /// Append a task slot at the tail of `prio`
    pub fn push(&mut self, prio: TaskPrio, id: SlotId) -> Result<(), SlotId> {
        self.fifos[prio as usize].push_back(id)?;
        self.ready.insert(prio);
        Ok(())
    }

    /// Take the oldest task of the highest non-empty level
    pub fn pop_highest(&mut self) -> Option<(TaskPrio, SlotId)> {
        let prio = self.ready.highest()?;
        let fifo = &mut self.fifos[prio as usize];
        let id = fifo.pop_front();

        if fifo.is_empty() {
            self.ready.remove(prio);
        }

        id.map(|id| (prio, id))
    }

    /// Number of queued tasks at `prio`
    #[inline]
    pub fn len_at(&self, prio: TaskPrio) -> usize {
        self.fifos[prio as usize].len()
    }

    /// Number of queued tasks across all levels
    pub fn len(&self) -> usize {
        self.fifos.iter().map(|f| f.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn clear(&mut self) {
        for fifo in self.fifos.iter_mut() {
            fifo.clear();
        }
        self.ready.clear();
    }
}

impl Default for QueueSet {
    fn default() -> Self {
        Self::new()
    }
}
