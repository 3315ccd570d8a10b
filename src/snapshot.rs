//! On-disk snapshot of collected stats, for offline processing with the
//! report tool.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::stats::Stat;

/// Everything a collection run retrieved from a target process.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub stream_stats: Vec<Stat>,
}

impl Snapshot {
    /// Write the snapshot as JSON to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self).map_err(io::Error::from)
    }

    /// Load a snapshot previously written by [`Snapshot::save`].
    pub fn load(path: impl AsRef<Path>) -> io::Result<Snapshot> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(io::Error::from)
    }
}
