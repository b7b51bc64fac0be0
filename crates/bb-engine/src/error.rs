//! Error taxonomy for the CASL runtime.
//!
//! Every condition here is local and recoverable: the failing call is a
//! no-op (or a fallback), the error is logged, and the process carries on.

use bb_ir::DynIndex;

/// Which fixed pool ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pool {
    Sequence,
    Stage,
    Dynamic,
    /// Stage list of a single sequence.
    SequenceLength,
}

/// Which kind of index was out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    Instance,
    Channel,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaslError {
    #[error("{pool:?} pool exhausted")]
    PoolExhausted { pool: Pool },

    #[error("malformed description: {0}")]
    Malformed(&'static str),

    #[error("{kind:?} index {index} out of range")]
    InvalidIndex { kind: IndexKind, index: usize },

    #[error("dynamic slot {0} does not hold a scalar")]
    NotScalar(DynIndex),

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("division by zero")]
    DivideByZero,

    #[error("expression nesting too deep (reference cycle?)")]
    ResolveDepth,

    #[error("no description loaded")]
    NotLoaded,

    #[error("stage loop never yields")]
    Runaway,

    #[error("no reachable Unheld stage")]
    SearchNotFound,

    #[error("event queue full")]
    QueueFull,

    #[error("output snapshot torn after retry budget")]
    SnapshotTornRead,
}

impl CaslError {
    pub(crate) fn dynamic(index: usize) -> Self {
        CaslError::InvalidIndex { kind: IndexKind::Dynamic, index }
    }
}

pub type Result<T> = core::result::Result<T, CaslError>;
