//! Lossy, lock-free sample store: a double-buffered pair of fixed-capacity
//! rings that absorbs pushes from any number of request threads and hands the
//! retained payloads to a single periodic collector.
//!
//! ### Concurrency design
//! - **Push** is wait-free and lock-free across all producers: an atomic
//!   reservation, one compare-and-swap on the slot, and a completion counter.
//!   When producers outrun the collector, older samples are silently
//!   overwritten — profiling data is statistical and freshness beats
//!   completeness.
//! - **Drain** never stalls producers. It atomically retargets new pushes at
//!   the second queue of the pair, waits for in-flight pushes on the first to
//!   quiesce, and only then walks the slots. Drainers are serialized among
//!   themselves by a mutex that no producer ever touches.

mod queue;
pub(crate) mod sync;

use std::fmt;

use queue::Queue;
use sync::{AtomicU32, DrainMutex, Ordering};

/// Error returned when a buffer is constructed with a capacity that is zero
/// or not a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadCapacity(pub u32);

impl fmt::Display for BadCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capacity must be a nonzero power of two, got {}", self.0)
    }
}

impl std::error::Error for BadCapacity {}

/// A fixed-capacity circular buffer retaining the most recent payloads pushed
/// into it.
///
/// The buffer owns two [`Queue`]s of identical capacity and an atomic
/// selector naming the one that new pushes target. Draining switches the
/// selector first, so producers keep running on the other queue while the
/// drainer harvests; the switch is the only coupling between the two sides.
///
/// Payloads are transferred in as `Box<T>` and come back out of [`drain`] in
/// arrival order (up to the race window between concurrent pushes). Capacity
/// is restricted to powers of two so slot indexing is a mask, not a modulo.
///
/// [`drain`]: CircularBuffer::drain
pub struct CircularBuffer<T> {
    queues: [Queue<T>; 2],
    /// Index (0 or 1) of the queue receiving pushes.
    active: AtomicU32,
    drain_lock: DrainMutex,
}

impl<T> CircularBuffer<T> {
    /// Create a buffer retaining up to `capacity` payloads.
    pub fn with_capacity(capacity: u32) -> Result<Self, BadCapacity> {
        if capacity == 0 || capacity & (capacity - 1) != 0 {
            return Err(BadCapacity(capacity));
        }
        Ok(CircularBuffer {
            queues: [Queue::new(capacity), Queue::new(capacity)],
            active: AtomicU32::new(0),
            drain_lock: DrainMutex::new(),
        })
    }

    pub fn capacity(&self) -> u32 {
        self.queues[0].capacity()
    }

    /// Push a payload into the buffer.
    ///
    /// Never blocks, never fails visibly. The payload either becomes visible
    /// to the next drain of its queue (until overwritten by wrap-around) or
    /// is dropped because a concurrent drain or a fresher wrapped push won
    /// the race — both deliberate outcomes for a lossy store.
    pub fn push(&self, payload: Box<T>) {
        let active = self.active.load(Ordering::Acquire);
        self.queues[(active & 1) as usize].push(payload);
    }

    /// Retarget pushes at the other queue and return the one that was active.
    /// Callers must hold the drain lock.
    fn switch_queues(&self) -> &Queue<T> {
        if self
            .active
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            &self.queues[0]
        } else {
            // Not 0, so it was 1; this cannot race because drains are
            // serialized and producers never write the selector.
            let _ = self
                .active
                .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire);
            &self.queues[1]
        }
    }

    /// Remove and return the retained payloads, oldest first.
    ///
    /// Concurrent drains are serialized; producers are never made to wait.
    /// The returned length is at most [`capacity`](CircularBuffer::capacity).
    ///
    /// The ordering of the steps below is load-bearing. Quiescence must be
    /// observed before the post-check barrier goes up: a reservation made
    /// before the switch is allowed to finish its store and must be waited
    /// for, while one made after cannot be distinguished from it and is
    /// rejected by the barrier instead. Harvest happens strictly between the
    /// two, and the counter reset erases any reservations the barrier turned
    /// away.
    pub fn drain(&self) -> Vec<Box<T>> {
        let _guard = self.drain_lock.lock();

        let queue = self.switch_queues();
        queue.drain_wait();
        queue.set_post_check();

        let result = queue.harvest();

        queue.clear_post_check();
        queue.reset();

        result
    }
}

impl<T> fmt::Debug for CircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
