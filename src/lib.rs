//! In-process profiling sample store for a high-throughput RPC runtime.
//!
//! The crate has two halves. [`buffer`] implements a lossy, lock-free
//! circular buffer: producers on the request hot path push at arbitrary
//! concurrency with a handful of atomic operations, and a periodic collector
//! drains the most recent samples without ever stalling them. [`stats`]
//! defines what gets pushed: per-request [`Stat`]s, each a tree of [`Timer`]s
//! covering components such as encoding, compression, and transport.
//!
//! The remaining modules are the thin shell around that core: [`registry`]
//! holds the process-wide enable flag and the global store, [`wire`] encodes
//! stats into frames for the control channel, [`service`] is the body of the
//! remote control RPC, and [`snapshot`] round-trips collected stats through a
//! file for the offline report tool.
//!
//! The store is deliberately not a lossless queue. When requests outrun
//! collection, old samples are overwritten in place; profiling data is
//! statistical, and bounded memory with zero producer-side blocking is the
//! contract that matters.

pub mod buffer;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod stats;
pub mod wire;

pub use buffer::{BadCapacity, CircularBuffer};
pub use registry::{init_stats, is_enabled, set_enabled, stream_stats};
pub use service::{init, ProfilingConfig, ProfilingService};
pub use snapshot::Snapshot;
pub use stats::{Stat, Timer};
