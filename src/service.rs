//! Control surface backing the remote profiling RPC.
//!
//! The RPC framework wiring (request/response message types, stream setup)
//! lives with the transport; this module is the transport-agnostic body it
//! calls into: initialize the store, flip the enable flag, and collect the
//! retained samples as encoded frames ready to stream.

use log::info;

use crate::buffer::BadCapacity;
use crate::registry;
use crate::stats::Stat;
use crate::wire;

/// Configuration applied once at process startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfilingConfig {
    /// Initial state of the enable flag.
    pub enabled: bool,
    /// Capacity of the per-request sample store; zero selects the default.
    pub sample_count: u32,
}

/// Initialize the global store from `config` and register-time state.
///
/// Safe to call more than once; only the first call sizes the store. The
/// enable flag is applied last, after everything is allocated, so no producer
/// observes an enabled-but-uninitialized process.
pub fn init(config: &ProfilingConfig) -> Result<(), BadCapacity> {
    registry::init_stats(config.sample_count)?;
    registry::set_enabled(config.enabled);
    Ok(())
}

/// Handler state for the profiling control service.
#[derive(Debug, Default)]
pub struct ProfilingService;

impl ProfilingService {
    pub fn new() -> ProfilingService {
        ProfilingService
    }

    /// Toggle profiling; returns whether the request was applied.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        info!("processing set_enabled ({enabled})");
        registry::set_enabled(enabled);
        true
    }

    /// Drain the per-request store and return one encoded frame per stat,
    /// oldest first.
    ///
    /// Profiling is suspended while the frames are built so the collection
    /// pass does not profile itself, then restored to its previous state.
    /// Returns an empty vector when the store was never initialized.
    pub fn collect_stream_stats(&self) -> Vec<Vec<u8>> {
        info!("processing stream request for stream stats");
        let Some(buffer) = registry::stream_stats() else {
            info!("stream stats not initialized, nothing to collect");
            return Vec::new();
        };

        let results = buffer.drain();
        info!("stream stats size: {} records", results.len());

        let was_enabled = registry::is_enabled();
        if was_enabled {
            registry::set_enabled(false);
        }

        let frames = results
            .iter()
            .map(|stat| wire::encode_stat(stat))
            .collect();

        if was_enabled {
            registry::set_enabled(true);
        }

        frames
    }

    /// Drain the store into decoded stats rather than frames. Used by
    /// in-process collectors (snapshot writers, tests).
    pub fn drain_stream_stats(&self) -> Vec<Stat> {
        registry::stream_stats()
            .map(|buffer| buffer.drain().into_iter().map(|stat| *stat).collect())
            .unwrap_or_default()
    }
}
