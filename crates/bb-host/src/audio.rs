//! The audio context: owns the interpreters and the slopes.
//!
//! Commands arrive over a `ringbuf` SPSC ring from the controller. Results
//! leave only through the shared [`Bridge`].

use bb_engine::{Event, EventQueue, OutputState, Registry};
use bb_ir::Node;
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use crate::config::HostConfig;
use crate::slopes::Slopes;

/// Lock-free state shared between the audio and host contexts.
#[derive(Default)]
pub struct Bridge {
    pub outputs: OutputState,
    pub events: EventQueue<Event>,
}

/// Requests from the host context.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the instance's slots with `dynamics`, then load `description`.
    Load { index: usize, dynamics: Vec<f32>, description: Node },
    Action { index: usize, code: i32 },
    SetDynamic { index: usize, slot: usize, value: f32 },
    ClearDynamics { index: usize },
}

pub struct AudioContext {
    registry: Registry,
    slopes: Slopes,
    commands: HeapCons<Command>,
    bridge: std::sync::Arc<Bridge>,
    block_size: usize,
}

impl AudioContext {
    pub fn new(config: &HostConfig, commands: HeapCons<Command>, bridge: std::sync::Arc<Bridge>) -> Self {
        Self {
            registry: Registry::new(),
            slopes: Slopes::new(config.sample_rate),
            commands,
            bridge,
            block_size: config.block_size,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn slopes(&self) -> &Slopes {
        &self.slopes
    }

    /// Apply pending commands, step the slopes one block, then resume any
    /// instance whose ramp finished.
    pub fn process_block(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            self.apply(command);
        }
        let done = self.slopes.step_block(self.block_size, &self.bridge.outputs);
        for token in done {
            if let Err(e) = self.registry.resume(token, &mut self.slopes, &self.bridge.events) {
                tracing::warn!(instance = token.instance, error = %e, "resume failed");
            }
        }
    }

    fn apply(&mut self, command: Command) {
        tracing::debug!(?command, "command");
        let result = match command {
            Command::Load { index, dynamics, description } => {
                self.registry.load_with_dynamics(index, &dynamics, &description)
            }
            Command::Action { index, code } => self
                .registry
                .start_action(index, code, &mut self.slopes, &self.bridge.events)
                .map(drop),
            Command::SetDynamic { index, slot, value } => self.registry.set_dynamic(index, slot, value),
            Command::ClearDynamics { index } => self.registry.clear_dynamics(index),
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "command failed");
        }
    }
}
