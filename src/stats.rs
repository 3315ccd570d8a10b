//! Per-request timing samples: a [`Stat`] groups the [`Timer`]s recorded over
//! one logical operation (typically the lifetime of a single RPC) together
//! with a tag and opaque metadata for post-processing.
//!
//! A stat is built by the request task that owns it and only then pushed into
//! the sample store, transferring ownership. That keeps the recording path
//! free of synchronization: appending a timer is a plain `Vec` push into
//! pre-reserved capacity.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Timer slots reserved at stat construction. A typical unary RPC records
/// slightly under 60 timers, so appends on the request path stay within the
/// initial allocation.
pub const DEFAULT_TIMER_CAPACITY: usize = 64;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

std::thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Process-local sequential id of the calling OS thread. Stable for the
/// thread's lifetime; recorded on timers so interleaved work can be untangled
/// offline.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// The wall-clock beginning and end of one logical operation.
///
/// An unfinished timer carries `UNIX_EPOCH` as its end; [`Timer::stop`]
/// stamps the real end time. Both timestamps use the same clock so the
/// difference is meaningful even if the clock itself is not UTC-exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    /// Identifies the timer within its stat, usually a
    /// forward-slash-separated hierarchical name.
    pub tag: Cow<'static, str>,
    pub begin: SystemTime,
    pub end: SystemTime,
    /// See [`current_thread_id`].
    pub thread_id: u64,
}

impl Timer {
    /// Start a standalone timer. Useful before a [`Stat`] exists, e.g. for
    /// transport work that precedes the creation of a request context; attach
    /// it later with [`Stat::append_timer`].
    pub fn span(tag: impl Into<Cow<'static, str>>) -> Timer {
        Timer {
            tag: tag.into(),
            thread_id: current_thread_id(),
            end: UNIX_EPOCH,
            // Stamped last so setup cost is not billed to the measured span.
            begin: SystemTime::now(),
        }
    }

    /// Mark the end of the measured span.
    pub fn stop(&mut self) {
        self.end = SystemTime::now();
    }

    /// Elapsed time between begin and end; zero if the timer never stopped.
    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.begin).unwrap_or_default()
    }
}

/// One sample: a tag, opaque metadata, and the timers recorded during the
/// operation the stat describes.
///
/// The metadata bytes are chosen by the runtime that emits the stat — for
/// per-stream stats they encode the connection and stream ids so a sample can
/// be matched to a wire-level query. The store never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stat {
    pub tag: Cow<'static, str>,
    pub metadata: Vec<u8>,
    pub timers: Vec<Timer>,
}

impl Stat {
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Stat {
        Stat {
            tag: tag.into(),
            metadata: Vec::new(),
            timers: Vec::with_capacity(DEFAULT_TIMER_CAPACITY),
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<u8>) -> Stat {
        self.metadata = metadata;
        self
    }

    /// Start a timer inside this stat and return its index.
    ///
    /// The index, not a reference, is the handle: later appends may move the
    /// backing storage. Close the span with [`Stat::end_timer`].
    pub fn begin_timer(&mut self, tag: impl Into<Cow<'static, str>>) -> usize {
        let index = self.timers.len();
        self.timers.push(Timer::span(tag));
        index
    }

    /// Stamp the end time of the timer at `index`. An out-of-range index is
    /// ignored.
    pub fn end_timer(&mut self, index: usize) {
        // Take the timestamp before the bounds check so the measured span
        // does not absorb it.
        let end = SystemTime::now();
        if let Some(timer) = self.timers.get_mut(index) {
            timer.end = end;
        }
    }

    /// Append an externally recorded timer.
    pub fn append_timer(&mut self, timer: Timer) -> usize {
        let index = self.timers.len();
        self.timers.push(timer);
        index
    }
}
