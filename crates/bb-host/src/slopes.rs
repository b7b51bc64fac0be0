//! Reference ramp service: one shaped slope per output channel.
//!
//! Progress is tracked in samples and advanced a block at a time, so a
//! ramp completes on the first block boundary at or after its deadline.

use bb_engine::{OutputState, RampService, ResumeToken};
use bb_ir::{Q16, Shape, CHANNEL_COUNT};

/// Tokens of ramps that finished during one block.
pub type Completions = heapless::Vec<ResumeToken, CHANNEL_COUNT>;

#[derive(Clone, Debug, Default)]
struct Slope {
    /// Level the current ramp started from.
    last: f32,
    dest: f32,
    /// Current output level.
    shaped: f32,
    /// Linear progress through the ramp, `0..=1`.
    here: f32,
    /// Samples left; zero or less when idle.
    remaining: f32,
    delta: f32,
    shape: Shape,
    resume: Option<ResumeToken>,
}

impl Slope {
    fn toward(&mut self, dest: f32, samples: f32, shape: Shape, resume: Option<ResumeToken>) {
        self.dest = dest;
        self.shape = shape;
        self.resume = resume;
        if samples <= 0.0 {
            self.last = dest;
            self.shaped = dest;
            self.here = 1.0;
            self.remaining = 0.0;
            self.delta = 0.0;
        } else {
            self.last = self.shaped;
            self.here = 0.0;
            self.remaining = samples;
            self.delta = 1.0 / samples;
        }
    }

    /// Advance `frames` samples. Returns the token if the ramp finished.
    fn step(&mut self, frames: usize) -> Option<ResumeToken> {
        if self.remaining <= 0.0 {
            return None;
        }
        let frames = frames as f32;
        self.remaining -= frames;
        if self.remaining <= 0.0 {
            self.here = 1.0;
            self.shaped = self.dest;
            return self.resume.take();
        }
        self.here = (self.here + self.delta * frames).min(1.0);
        self.shaped = self.last + (self.dest - self.last) * self.shape.ease(self.here);
        None
    }
}

/// `CHANNEL_COUNT` slopes stepped in lockstep.
#[derive(Clone, Debug)]
pub struct Slopes {
    samples_per_ms: f32,
    slopes: [Slope; CHANNEL_COUNT],
}

impl Slopes {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples_per_ms: sample_rate as f32 / 1000.0,
            slopes: Default::default(),
        }
    }

    /// Current level of `channel` in volts.
    pub fn level(&self, channel: usize) -> Option<f32> {
        self.slopes.get(channel).map(|s| s.shaped)
    }

    /// Whether `channel` is mid-ramp.
    pub fn is_moving(&self, channel: usize) -> bool {
        self.slopes.get(channel).is_some_and(|s| s.remaining > 0.0)
    }

    /// Advance every channel by `frames` samples, publish levels to
    /// `outputs`, and return tokens of ramps that completed.
    pub fn step_block(&mut self, frames: usize, outputs: &OutputState) -> Completions {
        let mut done = Completions::new();
        for (channel, slope) in self.slopes.iter_mut().enumerate() {
            if let Some(token) = slope.step(frames) {
                // one slope per channel, so at most CHANNEL_COUNT tokens
                let _ = done.push(token);
            }
            if let Err(e) = outputs.set(channel, Q16::from_f32(slope.shaped)) {
                tracing::warn!(channel, error = %e, "output write failed");
            }
        }
        done
    }
}

impl RampService for Slopes {
    fn begin_ramp(&mut self, instance: u8, target: Q16, duration_ms: Q16, shape: Shape, resume: Option<ResumeToken>) {
        let Some(slope) = self.slopes.get_mut(instance as usize) else {
            tracing::warn!(instance, "ramp for unknown channel");
            return;
        };
        let samples = duration_ms.to_f32() * self.samples_per_ms;
        slope.toward(target.to_f32(), samples, shape, resume);
    }
}
