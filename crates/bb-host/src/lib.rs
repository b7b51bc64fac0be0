//! Headless controller for blackbird.
//!
//! Runs the CASL interpreters and reference slopes on a dedicated audio
//! thread and gives the host context a command/event API over the
//! lock-free channel layer.

mod audio;
mod config;
mod error;
mod slopes;

use bb_engine::CaslError;
use bb_ir::{CHANNEL_COUNT, SELVES_COUNT};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

// Re-export common types so callers don't need bb-ir/bb-engine directly.
pub use audio::{AudioContext, Bridge, Command};
pub use bb_engine::{Event, IndexKind};
pub use bb_ir::Node;
pub use config::HostConfig;
pub use error::{HostError, Result};
pub use slopes::{Completions, Slopes};

/// Install a `tracing-subscriber` fmt subscriber.
///
/// `RUST_LOG` wins over `filter` when set. Returns quietly if a global
/// subscriber is already installed.
pub fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .try_init();
}

/// Host-side handle: sends commands, reads outputs and events.
pub struct Controller {
    bridge: Arc<Bridge>,
    commands: HeapProd<Command>,
    playback: Option<AudioHandle>,
}

struct AudioHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// A controller plus the audio context it drives, not yet running.
    ///
    /// Call [`AudioContext::process_block`] yourself, or use [`spawn`](Self::spawn).
    pub fn new(config: &HostConfig) -> Result<(Self, AudioContext)> {
        config.validate()?;
        let (commands, consumer) = HeapRb::<Command>::new(config.command_capacity).split();
        let bridge = Arc::new(Bridge::default());
        let context = AudioContext::new(config, consumer, bridge.clone());
        Ok((Self { bridge, commands, playback: None }, context))
    }

    /// Start the audio context on its own thread, one block per block period.
    ///
    /// Installs a tracing subscriber with `config.log_filter` unless one is
    /// already set.
    pub fn spawn(config: &HostConfig) -> Result<Self> {
        let (mut controller, context) = Self::new(config)?;
        init_tracing(&config.log_filter);
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let period = config.block_duration();

        let thread = std::thread::Builder::new()
            .name("blackbird-audio".into())
            .spawn(move || audio_thread(context, stop, period))?;

        tracing::info!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            "audio context started"
        );
        controller.playback = Some(AudioHandle { stop_signal, thread: Some(thread) });
        Ok(controller)
    }

    /// Stop and join the audio thread. No-op if it is not running.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.playback.take() {
            handle.stop_signal.store(true, Ordering::Relaxed);
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    tracing::error!("audio thread panicked");
                }
            }
        }
    }

    /// Whether an audio thread started by [`spawn`](Self::spawn) is live.
    pub fn is_running(&self) -> bool {
        self.playback.is_some()
    }

    // --- Commands ---

    /// Replace instance `index`'s dynamic slots with `dynamics` (slot `i`
    /// holds `dynamics[i]`) and load `description`.
    pub fn load(&mut self, index: usize, description: Node, dynamics: &[f32]) -> Result<()> {
        check_instance(index)?;
        self.send(Command::Load { index, dynamics: dynamics.to_vec(), description })
    }

    /// Send an action code (0 release, 1 restart, 2 unlock).
    pub fn action(&mut self, index: usize, code: i32) -> Result<()> {
        check_instance(index)?;
        self.send(Command::Action { index, code })
    }

    /// Write `value` (volts) into dynamic slot `slot` of instance `index`.
    pub fn set_dynamic(&mut self, index: usize, slot: usize, value: f32) -> Result<()> {
        check_instance(index)?;
        self.send(Command::SetDynamic { index, slot, value })
    }

    /// Release every dynamic slot of instance `index`.
    pub fn clear_dynamics(&mut self, index: usize) -> Result<()> {
        check_instance(index)?;
        self.send(Command::ClearDynamics { index })
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.commands.try_push(command).map_err(|rejected| {
            tracing::warn!(command = ?rejected, "command queue full");
            HostError::CommandQueueFull
        })
    }

    // --- Results ---

    /// Drain every event published since the last poll.
    pub fn poll_events(&self) -> Vec<Event> {
        std::iter::from_fn(|| self.bridge.events.dequeue()).collect()
    }

    /// Consistent snapshot of every output, in volts.
    pub fn outputs(&self) -> Result<[f32; CHANNEL_COUNT]> {
        let snapshot = self.bridge.outputs.get_all()?;
        Ok(snapshot.map(|q| q.to_f32()))
    }

    /// Last value of one output, in volts.
    pub fn output(&self, channel: usize) -> Result<f32> {
        Ok(self.bridge.outputs.get(channel)?.to_f32())
    }

    /// Shared lock-free state, for callers that read it directly.
    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_instance(index: usize) -> Result<()> {
    if index < SELVES_COUNT {
        Ok(())
    } else {
        Err(CaslError::InvalidIndex { kind: IndexKind::Instance, index }.into())
    }
}

fn audio_thread(mut context: AudioContext, stop_signal: Arc<AtomicBool>, period: std::time::Duration) {
    while !stop_signal.load(Ordering::Relaxed) {
        context.process_block();
        std::thread::sleep(period);
    }
    tracing::info!("audio context stopped");
}
