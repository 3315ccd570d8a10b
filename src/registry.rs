//! Process-wide profiling state: the enable flag, the global sample store,
//! and the connection counters used to stamp stat metadata.
//!
//! Enabling applies to every server and client in the binary at once — if the
//! flag were per-server, a process could not profile its own outbound calls.
//! Each stat carries a tag naming its side, so post-processing can filter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::buffer::{BadCapacity, CircularBuffer};
use crate::stats::Stat;

static PROFILING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Whether profiling is currently enabled.
pub fn is_enabled() -> bool {
    PROFILING_ENABLED.load(Ordering::Acquire)
}

/// Turn profiling on or off, process-wide. Orthogonal to the store's
/// lifetime: disabling only suppresses producer calls, buffered samples stay
/// drainable.
pub fn set_enabled(enabled: bool) {
    PROFILING_ENABLED.store(enabled, Ordering::Release);
}

/// Capacity used when [`init_stats`] is called with zero: stats for the last
/// 16Ki requests.
pub const DEFAULT_STREAM_STATS_CAPACITY: u32 = 16 << 10;

static STREAM_STATS: OnceLock<CircularBuffer<Stat>> = OnceLock::new();

/// Initialize the global per-request sample store.
///
/// Idempotent: the first call allocates the store, every later call is a
/// no-op regardless of the capacity it passes. A `capacity` of zero selects
/// [`DEFAULT_STREAM_STATS_CAPACITY`].
pub fn init_stats(capacity: u32) -> Result<(), BadCapacity> {
    if STREAM_STATS.get().is_some() {
        return Ok(());
    }

    let capacity = if capacity == 0 {
        DEFAULT_STREAM_STATS_CAPACITY
    } else {
        capacity
    };

    let buffer = CircularBuffer::with_capacity(capacity)?;
    // Lost the init race: another thread's buffer is already in place, which
    // is the same outcome as a late idempotent call.
    let _ = STREAM_STATS.set(buffer);
    Ok(())
}

/// The store holding stats for the most recent requests, or `None` before
/// [`init_stats`] has run.
pub fn stream_stats() -> Option<&'static CircularBuffer<Stat>> {
    STREAM_STATS.get()
}

static SERVER_CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);
static CLIENT_CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Next id for a server-side connection. Embedded in stat metadata together
/// with the stream id to uniquely identify a query.
pub fn next_server_connection_id() -> u64 {
    SERVER_CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// Next id for a client-initiated connection.
pub fn next_client_connection_id() -> u64 {
    CLIENT_CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}
