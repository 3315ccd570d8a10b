// Atomic primitives for the ring buffer, switchable to loom's instrumented
// versions so the push/drain protocol can be model-checked with
// `RUSTFLAGS="--cfg loom" cargo test --test loom`.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicU32, Ordering};
#[cfg(loom)]
pub(crate) use loom::thread::yield_now;

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};
#[cfg(not(loom))]
pub(crate) use std::thread::yield_now;

/// Mutex serializing drainers. parking_lot in production, loom's mutex under
/// model tests (loom cannot observe a lock it does not instrument).
#[cfg(not(loom))]
pub(crate) struct DrainMutex(parking_lot::Mutex<()>);

#[cfg(not(loom))]
impl DrainMutex {
    pub(crate) fn new() -> Self {
        DrainMutex(parking_lot::Mutex::new(()))
    }

    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.0.lock()
    }
}

#[cfg(loom)]
pub(crate) struct DrainMutex(loom::sync::Mutex<()>);

#[cfg(loom)]
impl DrainMutex {
    pub(crate) fn new() -> Self {
        DrainMutex(loom::sync::Mutex::new(()))
    }

    pub(crate) fn lock(&self) -> loom::sync::MutexGuard<'_, ()> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
