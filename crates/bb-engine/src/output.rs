//! Versioned output snapshot register.
//!
//! The audio context writes channel voltages; the host context reads them.
//! Single-channel reads are plain acquire loads. Whole-register reads use a
//! version check so a snapshot never mixes two writes. The version is odd
//! while a write is in flight.

use core::sync::atomic::{fence, AtomicI32, AtomicU32, Ordering};

use bb_ir::{Q16, CHANNEL_COUNT};

use crate::error::{CaslError, IndexKind, Result};

/// Attempts `get_all` makes before reporting a torn read.
pub const SNAPSHOT_RETRIES: usize = 10;

/// Four Q16 output voltages plus a write counter.
pub struct OutputState {
    values: [AtomicI32; CHANNEL_COUNT],
    version: AtomicU32,
}

impl OutputState {
    pub const fn new() -> Self {
        Self {
            values: [const { AtomicI32::new(0) }; CHANNEL_COUNT],
            version: AtomicU32::new(0),
        }
    }

    /// Publish a new value for `channel` and bump the version.
    pub fn set(&self, channel: usize, value: Q16) -> Result<()> {
        let slot = self.values.get(channel).ok_or(CaslError::InvalidIndex {
            kind: IndexKind::Channel,
            index: channel,
        })?;
        self.version.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        slot.store(value.raw(), Ordering::Release);
        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Last value written to `channel`.
    pub fn get(&self, channel: usize) -> Result<Q16> {
        let slot = self.values.get(channel).ok_or(CaslError::InvalidIndex {
            kind: IndexKind::Channel,
            index: channel,
        })?;
        Ok(Q16::from_raw(slot.load(Ordering::Acquire)))
    }

    /// A self-consistent copy of every channel.
    ///
    /// Retries while a write lands between the two version reads; gives up
    /// with `SnapshotTornRead` after [`SNAPSHOT_RETRIES`] attempts rather
    /// than spinning.
    pub fn get_all(&self) -> Result<[Q16; CHANNEL_COUNT]> {
        for _ in 0..SNAPSHOT_RETRIES {
            let before = self.version.load(Ordering::Acquire);
            if before & 1 == 1 {
                core::hint::spin_loop();
                continue;
            }
            let mut snapshot = [Q16::ZERO; CHANNEL_COUNT];
            for (out, slot) in snapshot.iter_mut().zip(&self.values) {
                *out = Q16::from_raw(slot.load(Ordering::Acquire));
            }
            fence(Ordering::Acquire);
            let after = self.version.load(Ordering::Relaxed);
            if before == after {
                return Ok(snapshot);
            }
        }
        tracing::warn!("output snapshot torn after {} attempts", SNAPSHOT_RETRIES);
        Err(CaslError::SnapshotTornRead)
    }

    /// Write counter: advances by two per completed `set` (wraps).
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}

impl Default for OutputState {
    fn default() -> Self {
        Self::new()
    }
}
