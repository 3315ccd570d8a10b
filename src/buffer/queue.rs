use std::marker::PhantomData;
use std::ptr;

use crossbeam_utils::CachePadded;

use super::sync::{yield_now, AtomicPtr, AtomicU32, Ordering};

/// One physical ring of payload slots, half of a [`CircularBuffer`] pair.
///
/// ### Concurrency design
/// - **Producers** claim an index by atomically incrementing `acquired`, then
///   install their payload into `slots[index & mask]` with a single
///   compare-and-swap. The CAS is attempted exactly once; failure means a
///   fresher push wrapped around and superseded this one, which is the
///   intended outcome for a lossy sample store. Every reservation finishes by
///   incrementing `written`, whether or not its payload landed.
/// - **The drainer** never touches a queue until it is off the active path and
///   `acquired == written`, i.e. no push is between its reservation and its
///   completion. `draining_post_check` then rejects stragglers that loaded the
///   queue selector before the switch but had not yet reserved.
/// - The counters are `CachePadded` so the producer-side `fetch_add` traffic
///   on `acquired` does not false-share with `written`.
///
/// Counters are 32-bit: a queue never accumulates anywhere near 4e9
/// reservations between drains, and the narrower word keeps parity with the
/// wire-level counters elsewhere in the runtime.
///
/// [`CircularBuffer`]: super::CircularBuffer
pub(crate) struct Queue<T> {
    slots: Box<[AtomicPtr<T>]>,
    mask: u32,
    /// Reservations attempted on this queue since the last reset.
    acquired: CachePadded<AtomicU32>,
    /// Reservations that completed their slot store step (or lost its CAS).
    written: CachePadded<AtomicU32>,
    /// Nonzero while the drainer is harvesting; producers that observe it
    /// abandon their push on this queue.
    draining_post_check: AtomicU32,
    _marker: PhantomData<Box<T>>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    /// `capacity` must already be validated as a nonzero power of two.
    pub(crate) fn new(capacity: u32) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let slots = (0..capacity)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Queue {
            slots,
            mask: capacity - 1,
            acquired: CachePadded::new(AtomicU32::new(0)),
            written: CachePadded::new(AtomicU32::new(0)),
            draining_post_check: AtomicU32::new(0),
            _marker: PhantomData,
        }
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.mask + 1
    }

    /// Install a payload, or drop it if this push lost a race.
    ///
    /// Wait-free: one fetch_add, one flag load, one slot load, one CAS (no
    /// retry), one fetch_add. Never blocks and never allocates.
    pub(crate) fn push(&self, payload: Box<T>) {
        let acquired = self.acquired.fetch_add(1, Ordering::AcqRel);

        if self.draining_post_check.load(Ordering::Acquire) != 0 {
            // A drainer switched the active queue between the caller's
            // selector load and our reservation. We cannot tell whether the
            // reservation landed before or after the drainer's quiescence
            // check, so abandon. The orphaned `acquired` increment is erased
            // when the drainer resets the counters.
            return;
        }

        let slot = &self.slots[(acquired & self.mask) as usize];
        let old = slot.load(Ordering::Acquire);

        // A plain store would be wrong here: between the load above and the
        // store, a push a full lap ahead of us may have installed a fresher
        // payload in this slot. The CAS succeeds only if the slot still holds
        // what we saw. On failure we are either the wrapped or the wrapper's
        // victim; both simply forfeit. There is no retry loop — losing the
        // CAS *is* the supersession outcome the buffer wants.
        let new = Box::into_raw(payload);
        match slot.compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire) {
            Ok(prev) => {
                // We displaced `prev`; no other push or drain can still reach
                // it through the slot, so ownership is ours.
                if !prev.is_null() {
                    drop(unsafe { Box::from_raw(prev) });
                }
            }
            Err(_) => {
                // Superseded. Reclaim our own payload and walk away.
                drop(unsafe { Box::from_raw(new) });
            }
        }

        // Unconditional: `written` counts completed reservations, not
        // successful stores. The drainer's quiescence check depends on it.
        self.written.fetch_add(1, Ordering::AcqRel);
    }

    /// Spin until every reservation on this queue has completed its store
    /// step. Only meaningful once the queue is no longer the active push
    /// target; after that, `acquired` can only advance via stragglers that
    /// the post-check barrier will turn away.
    pub(crate) fn drain_wait(&self) {
        while self.acquired.load(Ordering::Acquire) != self.written.load(Ordering::Acquire) {
            yield_now();
        }
    }

    pub(crate) fn set_post_check(&self) {
        self.draining_post_check.store(1, Ordering::Release);
    }

    pub(crate) fn clear_post_check(&self) {
        self.draining_post_check.store(0, Ordering::Release);
    }

    /// Move every retained payload out of the queue, oldest first.
    ///
    /// Callable only between `set_post_check` and the counter reset, when the
    /// drain protocol guarantees exclusive slot access. Taking the pointers
    /// (rather than copying) is what keeps ownership single: a payload leaves
    /// the ring exactly once.
    pub(crate) fn harvest(&self) -> Vec<Box<T>> {
        let written = self.written.load(Ordering::Acquire);
        let capacity = self.capacity();

        let mut result = Vec::with_capacity(written.min(capacity) as usize);
        if written < capacity {
            // Not yet wrapped: slots [0, written) in place.
            for index in 0..written {
                self.take_slot(index, &mut result);
            }
        } else {
            // Wrapped: the oldest retained payload sits at written & mask.
            let cur = written & self.mask;
            for index in cur..capacity {
                self.take_slot(index, &mut result);
            }
            for index in 0..cur {
                self.take_slot(index, &mut result);
            }
        }
        result
    }

    fn take_slot(&self, index: u32, out: &mut Vec<Box<T>>) {
        let p = self.slots[index as usize].swap(ptr::null_mut(), Ordering::AcqRel);
        if !p.is_null() {
            out.push(unsafe { Box::from_raw(p) });
        }
    }

    /// Zero both counters. Also erases any `acquired` increments left behind
    /// by pushes that abandoned at the post-check barrier.
    pub(crate) fn reset(&self) {
        self.acquired.store(0, Ordering::Release);
        self.written.store(0, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> (u32, u32) {
        (
            self.acquired.load(Ordering::Acquire),
            self.written.load(Ordering::Acquire),
        )
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Exclusive access: reclaim whatever payloads were never drained.
        for slot in self.slots.iter() {
            let p = slot.load(Ordering::Relaxed);
            if !p.is_null() {
                drop(unsafe { Box::from_raw(p) });
            }
        }
    }
}
