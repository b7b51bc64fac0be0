//! Core value types for the blackbird CASL runtime.
//!
//! This crate defines the fixed-point scalar, easing shapes, expression
//! elements, sequences and stages, and the parsed description tree that
//! the ingestion adapter consumes. Pool capacities live here so every
//! crate agrees on them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod elem;
mod fixed;
mod node;
mod sequence;
mod shape;

pub use elem::{DynIndex, Elem, Value};
pub use fixed::{Q16, Q16_SHIFT};
pub use node::Node;
pub use sequence::{SeqIndex, Sequence, To, ToIndex};
pub use shape::Shape;

/// Independent interpreter instances (one per output).
pub const SELVES_COUNT: usize = 4;
/// Sequences per instance.
pub const SEQ_COUNT: usize = 8;
/// Stages per sequence.
pub const SEQ_LENGTH: usize = 8;
/// Stages per instance.
pub const TO_COUNT: usize = 16;
/// Dynamic slots per instance (shared by host variables and expression operands).
pub const DYN_COUNT: usize = 40;
/// Output channels in the snapshot register.
pub const CHANNEL_COUNT: usize = 4;
