//! One interpreter instance: program, dynamic slots, and run state.
//!
//! `advance` walks the sequence tree from the current position until it
//! reaches a yield point (a timed ramp or a `Wait`), runs off the end of the
//! root, or faults. Timed ramps hand the ramp service a [`ResumeToken`];
//! completion comes back through [`Casl::resume`], which drops tokens from an
//! earlier epoch.

use bb_ir::{DynIndex, Node, Q16, SeqIndex, To, ToIndex};

use crate::dynamics::Dynamics;
use crate::error::{CaslError, Result};
use crate::event_queue::{Event, EventSink};
use crate::ingest;
use crate::program::Program;
use crate::ramp::{RampService, ResumeToken};
use crate::resolve::{resolve, resolve_scalar};

/// Stages `advance` may execute without yielding before the run is
/// declared runaway (a `Recur` loop with no timed ramp or `Wait` in it).
pub const MAX_STEPS: usize = 1024;

/// Milliseconds per second in Q16.
const MS_PER_SECOND: Q16 = Q16::from_int(1000);

/// Externally requested action, decoded from the integer action code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Code 0: jump past the held section if holding.
    Release,
    /// Code 1: start from the top.
    Restart,
    /// Code 2: clear a lock.
    Unlock,
    Other(i32),
}

impl From<i32> for Action {
    fn from(code: i32) -> Self {
        match code {
            0 => Action::Release,
            1 => Action::Restart,
            2 => Action::Unlock,
            other => Action::Other(other),
        }
    }
}

/// Why `advance` returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
    /// Waiting on a timed ramp; resumes through its token.
    Ramp,
    /// Stopped at a `Wait` stage until the next action.
    Wait,
    /// Root sequence exhausted; `AslDone` was published.
    Done,
    /// Evaluation failed; `AslFault` was published.
    Fault,
}

/// Which stages the release search may look inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchScope {
    /// Skip child sequences and the remainder of any conditional branch.
    Local,
    /// Descend into every child sequence.
    Full,
}

#[derive(Clone, Debug)]
pub struct Casl {
    index: u8,
    program: Program,
    dynamics: Dynamics,
    current: SeqIndex,
    holding: bool,
    locked: bool,
    epoch: u32,
}

impl Casl {
    /// An empty, unloaded instance answering to `index`.
    pub fn new(index: u8) -> Self {
        Self {
            index,
            program: Program::new(),
            dynamics: Dynamics::new(),
            current: SeqIndex::ROOT,
            holding: false,
            locked: false,
            epoch: 0,
        }
    }

    /// Instance index, also the output channel it ramps.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// The compiled description; empty when unloaded.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Host variables and expression operand slots.
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// Sequence the program counter walk is currently in.
    pub fn current(&self) -> SeqIndex {
        self.current
    }

    /// Between a `Hold` and the `Unheld` a release jumps to.
    pub fn is_holding(&self) -> bool {
        self.holding
    }

    /// Set by `Lock`; only the unlock action gets through.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether a description compiled successfully.
    pub fn is_loaded(&self) -> bool {
        !self.program.is_empty()
    }

    /// Current generation; any outstanding token from an older one is stale.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Drop the program and every dynamic slot and clear the run flags.
    pub fn init(&mut self) {
        self.program = Program::new();
        self.dynamics.clear();
        self.reset_position();
        tracing::debug!(instance = self.index, epoch = self.epoch, "init");
    }

    /// Compile and install a new description.
    ///
    /// Host-allocated dynamic slots survive. On failure the instance is left
    /// unloaded and the slot allocator is back where it started.
    pub fn load(&mut self, description: &Node) -> Result<()> {
        let scratch = self.dynamics.clone();
        self.install(Ok(scratch), description)
    }

    /// Replace every dynamic slot with `values` (slot `i` holds the `i`th)
    /// and compile `description` against them.
    ///
    /// Nothing is committed unless both steps succeed; on failure the
    /// instance is left unloaded and its current slots are untouched.
    pub fn load_with_dynamics(&mut self, values: impl IntoIterator<Item = Q16>, description: &Node) -> Result<()> {
        let mut scratch = Dynamics::new();
        let staged = values
            .into_iter()
            .try_for_each(|value| {
                let ix = scratch.allocate()?;
                scratch.set(ix, value)
            })
            .map(|()| scratch);
        self.install(staged, description)
    }

    fn install(&mut self, scratch: Result<Dynamics>, description: &Node) -> Result<()> {
        self.reset_position();
        let compiled = scratch.and_then(|mut dyns| {
            let program = ingest::compile(description, &mut dyns)?;
            Ok((program, dyns))
        });
        match compiled {
            Ok((program, dyns)) => {
                tracing::debug!(
                    instance = self.index,
                    sequences = program.sequences().len(),
                    stages = program.stages().len(),
                    slots = dyns.allocated(),
                    "description loaded"
                );
                self.program = program;
                self.dynamics = dyns;
                Ok(())
            }
            Err(e) => {
                tracing::error!(instance = self.index, error = %e, "load failed");
                self.program = Program::new();
                Err(e)
            }
        }
    }

    /// Apply an external action.
    ///
    /// Returns `Ok(None)` when the action had no effect (locked, not holding,
    /// unknown code) and the halt reason when it ran the interpreter.
    pub fn start_action<R, E>(&mut self, action: Action, ramp: &mut R, events: &E) -> Result<Option<Halt>>
    where
        R: RampService + ?Sized,
        E: EventSink + ?Sized,
    {
        if self.locked {
            if action == Action::Unlock {
                tracing::debug!(instance = self.index, "unlocked");
                self.locked = false;
            } else {
                tracing::debug!(instance = self.index, ?action, "locked; action ignored");
            }
            return Ok(None);
        }

        match action {
            Action::Restart => {
                self.ensure_loaded()?;
                self.restart();
            }
            Action::Release if self.holding => {
                self.ensure_loaded()?;
                if self.find_unheld(SearchScope::Local) {
                    self.holding = false;
                    self.epoch = self.epoch.wrapping_add(1);
                } else {
                    self.report_search_miss();
                    self.restart();
                }
            }
            _ => {
                tracing::debug!(instance = self.index, ?action, "action has no effect");
                return Ok(None);
            }
        }
        Ok(Some(self.advance(ramp, events)))
    }

    /// Continue after a timed ramp, unless `token` belongs to an older epoch.
    pub fn resume<R, E>(&mut self, token: ResumeToken, ramp: &mut R, events: &E) -> Option<Halt>
    where
        R: RampService + ?Sized,
        E: EventSink + ?Sized,
    {
        if token.epoch != self.epoch {
            tracing::debug!(
                instance = self.index,
                stale = token.epoch,
                current = self.epoch,
                "stale ramp completion dropped"
            );
            return None;
        }
        Some(self.advance(ramp, events))
    }

    /// Run until the next yield point and publish `AslDone`/`AslFault` as
    /// appropriate.
    pub fn advance<R, E>(&mut self, ramp: &mut R, events: &E) -> Halt
    where
        R: RampService + ?Sized,
        E: EventSink + ?Sized,
    {
        let (halt, event) = match self.run(ramp) {
            Ok(Halt::Done) => (Halt::Done, Some(Event::AslDone(self.index))),
            Ok(halt) => (halt, None),
            Err(e) => {
                tracing::error!(instance = self.index, seq = %self.current, error = %e, "run faulted");
                (Halt::Fault, Some(Event::AslFault(self.index)))
            }
        };
        if let Some(event) = event {
            if let Err(e) = events.publish(event) {
                tracing::warn!(instance = self.index, ?event, error = %e, "event dropped");
            }
        }
        halt
    }

    fn run<R: RampService + ?Sized>(&mut self, ramp: &mut R) -> Result<Halt> {
        for _ in 0..MAX_STEPS {
            let Some(ix) = self.next_stage()? else {
                if self.ascend() {
                    continue;
                }
                tracing::debug!(instance = self.index, "root exhausted");
                return Ok(Halt::Done);
            };
            let to = self
                .program
                .stage(ix)
                .ok_or(CaslError::Malformed("dangling stage index"))?;

            match to {
                To::Literal { volts, seconds, shape } => {
                    let target = resolve_scalar(&mut self.dynamics, volts)?;
                    let secs = resolve_scalar(&mut self.dynamics, seconds)?;
                    let shape = resolve(&mut self.dynamics, shape)?
                        .shape()
                        .ok_or(CaslError::TypeMismatch { expected: "shape", found: "scalar" })?;
                    let ms = secs.saturating_mul(MS_PER_SECOND);
                    let resume = ms.is_positive().then_some(self.token());
                    tracing::trace!(instance = self.index, %target, %ms, ?shape, "ramp");
                    ramp.begin_ramp(self.index, target, ms, shape, resume);
                    if resume.is_some() {
                        return Ok(Halt::Ramp);
                    }
                }
                To::If(pred) => {
                    if !resolve_scalar(&mut self.dynamics, pred)?.is_positive() && !self.ascend() {
                        tracing::debug!(instance = self.index, "condition false at root");
                        return Ok(Halt::Done);
                    }
                }
                To::Recur => self.rewind_current(),
                To::Enter(child) => {
                    if self.program.sequence(child).is_none() {
                        return Err(CaslError::Malformed("enter into unknown sequence"));
                    }
                    self.current = child;
                }
                To::Hold => self.holding = true,
                To::Wait => return Ok(Halt::Wait),
                To::Unheld => self.holding = false,
                To::Lock => self.locked = true,
                To::Open => self.locked = false,
            }
        }
        Err(CaslError::Runaway)
    }

    /// Search forward for an `Unheld` stage, leaving the position just past it.
    ///
    /// Program counters move as the search goes; on failure the position is
    /// wherever the search gave up.
    pub fn find_unheld(&mut self, scope: SearchScope) -> bool {
        loop {
            let Ok(next) = self.next_stage() else { return false };
            let Some(ix) = next else {
                if self.ascend() {
                    continue;
                }
                return false;
            };
            match self.program.stage(ix) {
                Some(To::Unheld) => return true,
                Some(To::Enter(child)) if scope == SearchScope::Full => self.current = child,
                Some(To::If(_)) if scope == SearchScope::Local => {
                    self.ascend();
                }
                _ => {}
            }
        }
    }

    fn report_search_miss(&self) {
        if self.program.contains(|t| matches!(t, To::Unheld)) {
            tracing::warn!(
                instance = self.index,
                error = %CaslError::SearchNotFound,
                "Unheld stage exists outside the release search scope; restarting"
            );
        } else {
            tracing::warn!(
                instance = self.index,
                error = %CaslError::SearchNotFound,
                "description has no Unheld stage; restarting"
            );
        }
    }

    /// Hand out the next free dynamic slot, initialised to zero.
    pub fn allocate_dynamic(&mut self) -> Result<DynIndex> {
        self.dynamics.allocate()
    }

    /// Release every slot, including operand slots of a loaded program.
    pub fn clear_dynamics(&mut self) {
        self.dynamics.clear();
    }

    /// Overwrite slot `slot` with a scalar. The slot must be allocated.
    pub fn set_dynamic(&mut self, slot: usize, value: Q16) -> Result<()> {
        let ix = self.dynamics.index(slot)?;
        self.dynamics.set(ix, value)
    }

    /// Read slot `slot`; `NotScalar` if it holds an expression.
    pub fn get_dynamic(&self, slot: usize) -> Result<Q16> {
        let ix = self.dynamics.index(slot)?;
        self.dynamics.get(ix)
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.program.is_empty() {
            tracing::warn!(instance = self.index, "no description loaded");
            return Err(CaslError::NotLoaded);
        }
        Ok(())
    }

    fn token(&self) -> ResumeToken {
        ResumeToken { instance: self.index, epoch: self.epoch }
    }

    /// Back to the root with every counter rewound, in a new epoch.
    fn restart(&mut self) {
        self.program.rewind_all();
        self.reset_position();
        tracing::debug!(instance = self.index, epoch = self.epoch, "restart");
    }

    fn reset_position(&mut self) {
        self.current = SeqIndex::ROOT;
        self.holding = false;
        self.locked = false;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn next_stage(&mut self) -> Result<Option<ToIndex>> {
        self.program
            .sequence_mut(self.current)
            .map(|seq| seq.advance())
            .ok_or(CaslError::NotLoaded)
    }

    fn rewind_current(&mut self) {
        if let Some(seq) = self.program.sequence_mut(self.current) {
            seq.rewind();
        }
    }

    /// Leave the current sequence for its parent, rewinding it for next
    /// time. `false` at the root.
    fn ascend(&mut self) -> bool {
        let Some(seq) = self.program.sequence_mut(self.current) else {
            return false;
        };
        let Some(parent) = seq.parent else {
            return false;
        };
        seq.rewind();
        self.current = parent;
        true
    }
}
