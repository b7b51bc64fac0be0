//! CASL interpreter and lock-free channel layer for blackbird.
//!
//! Runs up to four action-sequence programs on the audio context. Each
//! instance compiles a parsed description into fixed pools, evaluates
//! fixed-point expressions, and drives an external ramp service. Results
//! cross to the host context only through [`OutputState`] and
//! [`EventQueue`].

#![cfg_attr(not(feature = "std"), no_std)]

mod casl;
mod dynamics;
mod error;
mod event_queue;
pub mod ingest;
mod output;
mod program;
mod ramp;
mod registry;
pub mod resolve;

pub use casl::{Action, Casl, Halt, SearchScope, MAX_STEPS};
pub use dynamics::Dynamics;
pub use error::{CaslError, IndexKind, Pool, Result};
pub use event_queue::{Event, EventQueue, EventSink, QueueItem, EVENT_QUEUE_SIZE};
pub use output::{OutputState, SNAPSHOT_RETRIES};
pub use program::Program;
pub use ramp::{RampService, ResumeToken};
pub use registry::Registry;
