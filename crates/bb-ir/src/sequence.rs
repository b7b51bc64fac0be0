//! Sequences and the stages ("To" instructions) they hold.

use arrayvec::ArrayVec;
use core::fmt;

use crate::elem::Elem;
use crate::SEQ_LENGTH;

/// Index into an instance's sequence pool. Sequence 0 is the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqIndex(pub u8);

impl SeqIndex {
    pub const ROOT: SeqIndex = SeqIndex(0);

    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SeqIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq{}", self.0)
    }
}

/// Index into an instance's stage pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToIndex(pub u8);

impl ToIndex {
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

/// One executable stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum To {
    /// Ramp toward `volts` over `seconds` using `shape`.
    Literal { volts: Elem, seconds: Elem, shape: Elem },
    /// Abandon the rest of the current sequence unless the predicate is positive.
    If(Elem),
    /// Jump back to the start of the current sequence.
    Recur,
    /// Descend into a child sequence.
    Enter(SeqIndex),
    Hold,
    /// Halt until the next external action.
    Wait,
    /// Marks the end of a held section; only reached by the release search.
    Unheld,
    Lock,
    Open,
}

/// An ordered list of stages with its own program counter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    pub stages: ArrayVec<ToIndex, SEQ_LENGTH>,
    /// Next stage to execute, always within `0..=stages.len()`.
    pub pc: usize,
    /// `None` only for the root.
    pub parent: Option<SeqIndex>,
}

impl Sequence {
    /// An empty sequence under `parent`.
    pub fn new(parent: Option<SeqIndex>) -> Self {
        Self { stages: ArrayVec::new(), pc: 0, parent }
    }

    /// Append a stage. Returns the stage back if the sequence is full.
    pub fn push_stage(&mut self, to: ToIndex) -> Result<(), ToIndex> {
        self.stages.try_push(to).map_err(|e| e.element())
    }

    /// Fetch the stage at the program counter and step past it.
    pub fn advance(&mut self) -> Option<ToIndex> {
        let to = self.stages.get(self.pc).copied()?;
        self.pc += 1;
        Some(to)
    }

    pub fn rewind(&mut self) {
        self.pc = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.pc >= self.stages.len()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
