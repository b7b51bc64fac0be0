//! Per-instance dynamic slot store.
//!
//! Slots hold either host-visible variables (allocated through the control
//! surface) or expression operands (allocated by ingestion). Access is
//! unsynchronized: the store only ever lives on the audio context.

use bb_ir::{DynIndex, Elem, Q16, DYN_COUNT};

use crate::error::{CaslError, Pool, Result};

/// Fixed array of slots with a bump allocator.
#[derive(Clone, Debug)]
pub struct Dynamics {
    slots: [Elem; DYN_COUNT],
    cursor: usize,
}

impl Dynamics {
    /// Every slot free.
    pub fn new() -> Self {
        Self { slots: [Elem::default(); DYN_COUNT], cursor: 0 }
    }

    /// Hand out the next free slot, initialised to zero.
    pub fn allocate(&mut self) -> Result<DynIndex> {
        if self.cursor >= DYN_COUNT {
            tracing::error!("no dynamic slots remain");
            return Err(CaslError::PoolExhausted { pool: Pool::Dynamic });
        }
        let ix = DynIndex(self.cursor as u8);
        self.slots[self.cursor] = Elem::default();
        self.cursor += 1;
        Ok(ix)
    }

    /// Release every slot.
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Number of allocated slots.
    pub fn allocated(&self) -> usize {
        self.cursor
    }

    /// Validate a raw index against the allocated range.
    pub fn index(&self, raw: usize) -> Result<DynIndex> {
        if raw < self.cursor {
            Ok(DynIndex(raw as u8))
        } else {
            Err(CaslError::dynamic(raw))
        }
    }

    /// Whatever slot `ix` holds, scalar or expression.
    pub fn elem(&self, ix: DynIndex) -> Result<Elem> {
        self.slots
            .get(ix.get())
            .filter(|_| ix.get() < self.cursor)
            .copied()
            .ok_or(CaslError::dynamic(ix.get()))
    }

    /// Store an expression in slot `ix`.
    pub fn put(&mut self, ix: DynIndex, elem: Elem) -> Result<()> {
        if ix.get() >= self.cursor {
            return Err(CaslError::dynamic(ix.get()));
        }
        self.slots[ix.get()] = elem;
        Ok(())
    }

    /// Overwrite a slot with a scalar.
    pub fn set(&mut self, ix: DynIndex, value: Q16) -> Result<()> {
        self.put(ix, Elem::Fixed(value))
    }

    /// Read a slot that must hold a scalar.
    pub fn get(&self, ix: DynIndex) -> Result<Q16> {
        match self.elem(ix)? {
            Elem::Fixed(q) => Ok(q),
            other => {
                tracing::warn!(slot = ix.get(), kind = other.kind(), "get_dynamic: wrong type");
                Err(CaslError::NotScalar(ix))
            }
        }
    }
}

impl Default for Dynamics {
    fn default() -> Self {
        Self::new()
    }
}
