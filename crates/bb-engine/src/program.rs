//! The compiled form of one description: sequence and stage pools.

use arrayvec::ArrayVec;
use bb_ir::{SeqIndex, Sequence, To, ToIndex, SEQ_COUNT, TO_COUNT};

use crate::error::{CaslError, Pool, Result};

/// Sequence tree and stage list for one instance.
///
/// Built once per load by the ingestion adapter and never reshaped while
/// running; only program counters move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    seqs: ArrayVec<Sequence, SEQ_COUNT>,
    tos: ArrayVec<To, TO_COUNT>,
}

impl Program {
    /// No sequences, no stages.
    pub fn new() -> Self {
        Self::default()
    }

    /// True until a description compiles.
    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.seqs
    }

    pub fn stages(&self) -> &[To] {
        &self.tos
    }

    /// Sequence `ix`, if allocated.
    pub fn sequence(&self, ix: SeqIndex) -> Option<&Sequence> {
        self.seqs.get(ix.get())
    }

    pub(crate) fn sequence_mut(&mut self, ix: SeqIndex) -> Option<&mut Sequence> {
        self.seqs.get_mut(ix.get())
    }

    /// Stage `ix`, if allocated.
    pub fn stage(&self, ix: ToIndex) -> Option<To> {
        self.tos.get(ix.get()).copied()
    }

    /// Whether any stage satisfies `pred`.
    pub fn contains(&self, pred: impl Fn(&To) -> bool) -> bool {
        self.tos.iter().any(pred)
    }

    /// Reset every program counter to the start.
    pub fn rewind_all(&mut self) {
        for seq in &mut self.seqs {
            seq.rewind();
        }
    }

    /// Allocate a new empty sequence under `parent`.
    pub(crate) fn push_sequence(&mut self, parent: Option<SeqIndex>) -> Result<SeqIndex> {
        let ix = SeqIndex(self.seqs.len() as u8);
        self.seqs
            .try_push(Sequence::new(parent))
            .map_err(|_| CaslError::PoolExhausted { pool: Pool::Sequence })?;
        Ok(ix)
    }

    /// Allocate a stage and append it to `seq`.
    pub(crate) fn push_stage(&mut self, seq: SeqIndex, to: To) -> Result<ToIndex> {
        let ix = ToIndex(self.tos.len() as u8);
        let target = self
            .seqs
            .get_mut(seq.get())
            .ok_or(CaslError::Malformed("stage appended to unknown sequence"))?;
        if target.len() == target.stages.capacity() {
            return Err(CaslError::PoolExhausted { pool: Pool::SequenceLength });
        }
        self.tos
            .try_push(to)
            .map_err(|_| CaslError::PoolExhausted { pool: Pool::Stage })?;
        // capacity checked above
        let _ = target.push_stage(ix);
        Ok(ix)
    }

    /// Patch a stage after allocation (used to point an `Enter` at its child).
    pub(crate) fn set_stage(&mut self, ix: ToIndex, to: To) {
        if let Some(slot) = self.tos.get_mut(ix.get()) {
            *slot = to;
        }
    }
}
