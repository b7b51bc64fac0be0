//! Index-checked owner of every interpreter instance.
//!
//! This is the runtime control surface. Every call names an instance by
//! index; an out-of-range index is logged and rejected without touching
//! any state.

use bb_ir::{DynIndex, Node, Q16, SELVES_COUNT};

use crate::casl::{Action, Casl, Halt};
use crate::error::{CaslError, IndexKind, Result};
use crate::event_queue::EventSink;
use crate::ramp::{RampService, ResumeToken};

/// Fixed set of `SELVES_COUNT` instances.
#[derive(Clone, Debug)]
pub struct Registry {
    selves: [Casl; SELVES_COUNT],
}

impl Registry {
    /// Four empty, unloaded instances.
    pub fn new() -> Self {
        Self { selves: core::array::from_fn(|i| Casl::new(i as u8)) }
    }

    /// Read-only view of instance `index`.
    pub fn instance(&self, index: usize) -> Result<&Casl> {
        self.selves.get(index).ok_or_else(|| invalid(index))
    }

    fn instance_mut(&mut self, index: usize) -> Result<&mut Casl> {
        self.selves.get_mut(index).ok_or_else(|| invalid(index))
    }

    /// Reset an instance to its freshly constructed state.
    pub fn init(&mut self, index: usize) -> Result<()> {
        self.instance_mut(index)?.init();
        Ok(())
    }

    /// Compile `description` into instance `index`, keeping its dynamic slots.
    pub fn load_description(&mut self, index: usize, description: &Node) -> Result<()> {
        self.instance_mut(index)?.load(description)
    }

    /// Replace instance `index`'s slots with `values` (in volts) and load
    /// `description` against them, all or nothing.
    pub fn load_with_dynamics(&mut self, index: usize, values: &[f32], description: &Node) -> Result<()> {
        let values = values.iter().map(|&v| Q16::from_f32(v));
        self.instance_mut(index)?.load_with_dynamics(values, description)
    }

    /// Apply action `code` (0 release, 1 restart, 2 unlock).
    pub fn start_action<R, E>(&mut self, index: usize, code: i32, ramp: &mut R, events: &E) -> Result<Option<Halt>>
    where
        R: RampService + ?Sized,
        E: EventSink + ?Sized,
    {
        let casl = self.instance_mut(index)?;
        realtime(|| casl.start_action(Action::from(code), ramp, events))
    }

    /// Hand a completed ramp's token back to its instance.
    pub fn resume<R, E>(&mut self, token: ResumeToken, ramp: &mut R, events: &E) -> Result<Option<Halt>>
    where
        R: RampService + ?Sized,
        E: EventSink + ?Sized,
    {
        let casl = self.instance_mut(token.instance as usize)?;
        Ok(realtime(|| casl.resume(token, ramp, events)))
    }

    /// Allocate a host variable on instance `index`.
    pub fn allocate_dynamic(&mut self, index: usize) -> Result<DynIndex> {
        self.instance_mut(index)?.allocate_dynamic()
    }

    /// Release every slot of instance `index`.
    pub fn clear_dynamics(&mut self, index: usize) -> Result<()> {
        self.instance_mut(index)?.clear_dynamics();
        Ok(())
    }

    /// Write a host variable, converting from volts.
    pub fn set_dynamic(&mut self, index: usize, slot: usize, value: f32) -> Result<()> {
        self.set_dynamic_q16(index, slot, Q16::from_f32(value))
    }

    /// Write a host variable in Q16.
    pub fn set_dynamic_q16(&mut self, index: usize, slot: usize, value: Q16) -> Result<()> {
        self.instance_mut(index)?.set_dynamic(slot, value)
    }

    /// Read a host variable as volts.
    pub fn get_dynamic(&self, index: usize, slot: usize) -> Result<f32> {
        self.get_dynamic_q16(index, slot).map(Q16::to_f32)
    }

    /// Read a host variable in Q16.
    pub fn get_dynamic_q16(&self, index: usize, slot: usize) -> Result<Q16> {
        self.instance(index)?.get_dynamic(slot)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(index: usize) -> CaslError {
    tracing::warn!(index, max = SELVES_COUNT - 1, "invalid instance index");
    CaslError::InvalidIndex { kind: IndexKind::Instance, index }
}

#[cfg(feature = "alloc_check")]
fn realtime<T>(f: impl FnOnce() -> T) -> T {
    assert_no_alloc::assert_no_alloc(f)
}

#[cfg(not(feature = "alloc_check"))]
#[inline(always)]
fn realtime<T>(f: impl FnOnce() -> T) -> T {
    f()
}
