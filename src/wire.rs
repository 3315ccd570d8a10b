//! Transport frame encoding for stats.
//!
//! Stats cross the control channel as self-describing frames: a fixed header,
//! the stat tag and metadata bytes, then one record per timer. All integers
//! are little-endian and the record layouts are `#[repr(C)]` with explicit
//! padding, so the format doubles as a stable ABI for non-Rust readers; the
//! layout tests assert the offsets on every platform the crate builds on.

use std::borrow::Cow;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::stats::{Stat, Timer};

/// Leading header of an encoded stat frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct FrameHeader {
    pub timer_count: u32,
    pub tag_len: u32,
    pub metadata_len: u32,
}

/// Per-timer record, followed on the wire by `tag_len` bytes of tag.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct TimerRecord {
    pub begin_sec: i64,
    pub end_sec: i64,
    pub thread_id: u64,
    pub begin_nsec: u32,
    pub end_nsec: u32,
    pub tag_len: u32,
    pub _reserved: u32,
}

fn unix_parts(t: SystemTime) -> (i64, u32) {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
        // Pre-epoch stamps only arise from a badly skewed clock; clamp.
        Err(_) => (0, 0),
    }
}

fn from_unix_parts(sec: i64, nsec: u32) -> SystemTime {
    if sec < 0 {
        return UNIX_EPOCH;
    }
    UNIX_EPOCH
        .checked_add(Duration::new(sec as u64, nsec.min(999_999_999)))
        .unwrap_or(UNIX_EPOCH)
}

/// Serialize a stat into one frame.
pub fn encode_stat(stat: &Stat) -> Vec<u8> {
    let timers_len: usize = stat
        .timers
        .iter()
        .map(|t| std::mem::size_of::<TimerRecord>() + t.tag.len())
        .sum();
    let mut out = Vec::with_capacity(
        std::mem::size_of::<FrameHeader>() + stat.tag.len() + stat.metadata.len() + timers_len,
    );

    out.extend_from_slice(&(stat.timers.len() as u32).to_le_bytes());
    out.extend_from_slice(&(stat.tag.len() as u32).to_le_bytes());
    out.extend_from_slice(&(stat.metadata.len() as u32).to_le_bytes());
    out.extend_from_slice(stat.tag.as_bytes());
    out.extend_from_slice(&stat.metadata);

    for timer in &stat.timers {
        let (begin_sec, begin_nsec) = unix_parts(timer.begin);
        let (end_sec, end_nsec) = unix_parts(timer.end);
        out.extend_from_slice(&begin_sec.to_le_bytes());
        out.extend_from_slice(&end_sec.to_le_bytes());
        out.extend_from_slice(&timer.thread_id.to_le_bytes());
        out.extend_from_slice(&begin_nsec.to_le_bytes());
        out.extend_from_slice(&end_nsec.to_le_bytes());
        out.extend_from_slice(&(timer.tag.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(timer.tag.as_bytes());
    }

    out
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Option<i64> {
        let b = self.take(8)?;
        Some(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn u64(&mut self) -> Option<u64> {
        self.i64().map(|v| v as u64)
    }

    fn string(&mut self, len: u32) -> Option<String> {
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

/// Deserialize one frame produced by [`encode_stat`].
///
/// Returns `None` on any truncation, length inconsistency, or non-UTF-8 tag;
/// malformed input never panics.
pub fn decode_stat(buf: &[u8]) -> Option<Stat> {
    let mut r = Reader { buf, pos: 0 };

    let timer_count = r.u32()?;
    let tag_len = r.u32()?;
    let metadata_len = r.u32()?;

    let tag = r.string(tag_len)?;
    let metadata = r.take(metadata_len as usize)?.to_vec();

    let mut timers = Vec::with_capacity(timer_count.min(1024) as usize);
    for _ in 0..timer_count {
        let begin_sec = r.i64()?;
        let end_sec = r.i64()?;
        let thread_id = r.u64()?;
        let begin_nsec = r.u32()?;
        let end_nsec = r.u32()?;
        let timer_tag_len = r.u32()?;
        let _reserved = r.u32()?;
        let timer_tag = r.string(timer_tag_len)?;
        timers.push(Timer {
            tag: Cow::Owned(timer_tag),
            begin: from_unix_parts(begin_sec, begin_nsec),
            end: from_unix_parts(end_sec, end_nsec),
            thread_id,
        });
    }

    if r.pos != buf.len() {
        // Trailing garbage means the frame boundary was miscomputed.
        return None;
    }

    Some(Stat {
        tag: Cow::Owned(tag),
        metadata,
        timers,
    })
}
