//! blackbird: CASL action-sequence interpreter with a lock-free bridge
//! between the audio and host contexts.
//!
//! - [`ir`]: fixed-point values, shapes, sequences and the description tree
//! - [`engine`]: interpreter instances, registry and channel layer
//! - [`host`]: headless controller and reference slopes

pub use bb_engine as engine;
pub use bb_host as host;
pub use bb_ir as ir;

pub use bb_engine::{Action, CaslError, Event, EventQueue, Halt, OutputState, RampService, Registry, ResumeToken};
pub use bb_host::{init_tracing, Controller, HostConfig, HostError};
pub use bb_ir::{Node, Q16, Shape};
