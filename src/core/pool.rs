//! Fixed-capacity object pool
//!
//! Index-based slot arena with generation-checked handles. Allocation and
//! release are O(1), never touch a heap, and run under a critical section so
//! both are callable from interrupt context. A handle to a freed slot is
//! rejected instead of aliasing whatever reuses the slot.

use crate::core::critical::CriticalSection;
use crate::core::cs_cell::CsCell;

/// Handle to a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId {
    index: u16,
    generation: u16,
}

impl SlotId {
    /// Slot index inside the pool
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Reuse counter of the slot at the time the handle was issued
    #[inline]
    pub fn generation(self) -> u16 {
        self.generation
    }

    /// Pack into one word, e.g. to pass through a [`Callback`](crate::Callback) argument
    #[inline]
    pub fn to_bits(self) -> u32 {
        ((self.generation as u32) << 16) | self.index as u32
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        SlotId {
            index: bits as u16,
            generation: (bits >> 16) as u16,
        }
    }
}

#[derive(Clone, Copy)]
struct Slot<T> {
    value: Option<T>,
    generation: u16,
    next_free: Option<u16>,
}

impl<T: Copy> Slot<T> {
    const EMPTY: Self = Slot {
        value: None,
        generation: 0,
        next_free: None,
    };
}

/// Slot storage; reachable through [`Pool::lock`] for multi-step updates
pub struct PoolSlots<T, const N: usize> {
    slots: [Slot<T>; N],
    /// Head of the list of released slots
    free_head: Option<u16>,
    /// Slots at or above this index were never handed out
    fresh: u16,
    live: u16,
    peak: u16,
}

impl<T: Copy, const N: usize> PoolSlots<T, N> {
    const fn new() -> Self {
        PoolSlots {
            slots: [Slot::EMPTY; N],
            free_head: None,
            fresh: 0,
            live: 0,
            peak: 0,
        }
    }

    /// Take a slot and store `value` in it
    pub fn alloc(&mut self, value: T) -> Option<SlotId> {
        let index = match self.free_head {
            Some(i) => {
                self.free_head = self.slots[i as usize].next_free.take();
                i
            }
            None if (self.fresh as usize) < N => {
                let i = self.fresh;
                self.fresh += 1;
                i
            }
            None => return None,
        };

        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        self.live += 1;
        self.peak = self.peak.max(self.live);

        Some(SlotId {
            index,
            generation: slot.generation,
        })
    }

    /// Release a slot, returning its value; stale handles are ignored
    pub fn free(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_head;
        self.free_head = Some(id.index);
        self.live -= 1;

        Some(value)
    }

    #[inline]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Live slots with their handles
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.value.as_mut().map(|v| {
                (
                    SlotId {
                        index: i as u16,
                        generation,
                    },
                    v,
                )
            })
        })
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.live as usize
    }

    /// Release every slot; outstanding handles become stale
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.next_free = None;
        }
        // Rebuild the free list over slots already handed out once
        self.free_head = None;
        for i in (0..self.fresh).rev() {
            self.slots[i as usize].next_free = self.free_head;
            self.free_head = Some(i);
        }
        self.live = 0;
    }
}

/// Fixed-capacity pool of `N` values of `T`
pub struct Pool<T, const N: usize> {
    slots: CsCell<PoolSlots<T, N>>,
}

impl<T: Copy + Send, const N: usize> Pool<T, N> {
    pub const fn new() -> Self {
        Pool {
            slots: CsCell::new(PoolSlots::new()),
        }
    }

    /// Borrow the slot storage for several operations under one guard
    #[inline]
    pub fn lock<'cs>(&'cs self, cs: &'cs CriticalSection) -> &'cs mut PoolSlots<T, N> {
        self.slots.borrow_mut(cs)
    }

    /// Allocate a slot holding `value`, `None` when the pool is exhausted
    #[inline]
    pub fn alloc(&self, value: T) -> Option<SlotId> {
        self.slots.with(|s| s.alloc(value))
    }

    /// Allocate a default-initialized slot
    #[inline]
    pub fn calloc(&self) -> Option<SlotId>
    where
        T: Default,
    {
        self.alloc(T::default())
    }

    /// Return a slot to the pool
    #[inline]
    pub fn free(&self, id: SlotId) -> Option<T> {
        self.slots.with(|s| s.free(id))
    }

    /// Copy of the value in a live slot
    #[inline]
    pub fn get(&self, id: SlotId) -> Option<T> {
        self.slots.with(|s| s.get(id).copied())
    }

    /// Modify the value in a live slot
    #[inline]
    pub fn update<R>(&self, id: SlotId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.slots.with(|s| s.get_mut(id).map(f))
    }

    #[inline]
    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.with(|s| s.get(id).is_some())
    }

    /// Number of slots currently handed out
    #[inline]
    pub fn live(&self) -> usize {
        self.slots.with(|s| s.live())
    }

    /// Highest number of simultaneously live slots
    #[inline]
    pub fn peak(&self) -> usize {
        self.slots.with(|s| s.peak as usize)
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.live() == N
    }

    /// Release every slot
    pub fn clear(&self) {
        self.slots.with(|s| s.clear())
    }
}

impl<T: Copy + Send, const N: usize> Default for Pool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_and_reuse() {
        let pool: Pool<u32, 3> = Pool::new();
        let a = pool.alloc(1).unwrap();
        let b = pool.alloc(2).unwrap();
        let _c = pool.alloc(3).unwrap();
        assert!(pool.is_full());
        assert!(pool.alloc(4).is_none());

        assert_eq!(pool.free(b), Some(2));
        let d = pool.alloc(5).unwrap();
        assert_eq!(d.index(), b.index());
        assert_ne!(d.generation(), b.generation());
        assert_eq!(pool.get(a), Some(1));
        assert_eq!(pool.get(d), Some(5));
    }

    #[test]
    fn test_stale_handle_rejected() {
        let pool: Pool<u32, 2> = Pool::new();
        let a = pool.alloc(7).unwrap();
        assert_eq!(pool.free(a), Some(7));
        assert_eq!(pool.free(a), None);
        let b = pool.alloc(8).unwrap();
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.update(a, |v| *v = 0), None);
        assert_eq!(pool.get(b), Some(8));
    }

    #[test]
    fn test_cycles_do_not_leak_capacity() {
        let pool: Pool<u8, 4> = Pool::new();
        for round in 0..1000u32 {
            let ids: [SlotId; 4] = core::array::from_fn(|i| pool.alloc(i as u8).unwrap());
            assert!(pool.alloc(0).is_none(), "round {round}");
            for id in ids {
                assert!(pool.free(id).is_some());
            }
            assert_eq!(pool.live(), 0);
        }
        assert_eq!(pool.peak(), 4);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let pool: Pool<u8, 2> = Pool::new();
        let a = pool.alloc(1).unwrap();
        pool.clear();
        assert!(!pool.contains(a));
        assert_eq!(pool.live(), 0);
        assert!(pool.alloc(2).is_some());
        assert!(pool.alloc(3).is_some());
        assert!(pool.alloc(4).is_none());
    }

    #[test]
    fn test_bits_round_trip() {
        let pool: Pool<u8, 2> = Pool::new();
        let a = pool.alloc(1).unwrap();
        pool.free(a);
        let b = pool.alloc(2).unwrap();
        assert_eq!(SlotId::from_bits(b.to_bits()), b);
    }
}
