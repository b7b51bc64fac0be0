//! Expression evaluator.
//!
//! `resolve` walks an expression through the dynamic slot arena and
//! produces a value. Mutable references travel back up the walk as a
//! pending write-back target instead of living in shared scratch state:
//! a `Mutate` node consumes the target of its own operand, and whatever
//! target is still pending at the top receives the final result. Either
//! way a target is written at most once per `resolve` call.

use bb_ir::{DynIndex, Elem, Q16, Value, DYN_COUNT};

use crate::dynamics::Dynamics;
use crate::error::{CaslError, Result};

/// Deepest chain of slot references followed before assuming a cycle.
const MAX_DEPTH: usize = DYN_COUNT;

/// A resolved subtree plus the mutable slot it wants written back.
#[derive(Clone, Copy, Debug)]
struct Resolution {
    value: Value,
    pending: Option<DynIndex>,
}

impl Resolution {
    fn plain(value: Value) -> Self {
        Self { value, pending: None }
    }

    fn scalar(self) -> Result<Q16> {
        expect_scalar(self.value)
    }
}

/// Resolve an expression, applying any pending mutable write-back.
pub fn resolve(dyns: &mut Dynamics, elem: Elem) -> Result<Value> {
    let r = resolve_inner(dyns, elem, 0)?;
    if let Some(target) = r.pending {
        dyns.put(target, r.value.into_elem())?;
    }
    Ok(r.value)
}

/// Resolve an expression that must produce a scalar.
pub fn resolve_scalar(dyns: &mut Dynamics, elem: Elem) -> Result<Q16> {
    expect_scalar(resolve(dyns, elem)?)
}

pub(crate) fn expect_scalar(value: Value) -> Result<Q16> {
    value.scalar().ok_or(CaslError::TypeMismatch { expected: "scalar", found: "shape" })
}

fn resolve_inner(dyns: &mut Dynamics, elem: Elem, depth: usize) -> Result<Resolution> {
    if depth > MAX_DEPTH {
        return Err(CaslError::ResolveDepth);
    }
    let next = depth + 1;

    let binary = |dyns: &mut Dynamics, a: DynIndex, b: DynIndex| -> Result<(Q16, Q16, Option<DynIndex>)> {
        let lhs = follow(dyns, a, next)?;
        let rhs = follow(dyns, b, next)?;
        Ok((lhs.scalar()?, rhs.scalar()?, rhs.pending.or(lhs.pending)))
    };

    let scalar = |q: Q16, pending: Option<DynIndex>| Resolution { value: Value::Scalar(q), pending };

    match elem {
        Elem::Fixed(q) => Ok(Resolution::plain(Value::Scalar(q))),
        Elem::Shape(s) => Ok(Resolution::plain(Value::Shape(s))),
        Elem::Dynamic(ix) => follow(dyns, ix, next),
        Elem::Mutable(ix) => {
            let r = follow(dyns, ix, next)?;
            Ok(Resolution { value: r.value, pending: r.pending.or(Some(ix)) })
        }
        Elem::Negate(a) => {
            let r = follow(dyns, a, next)?;
            Ok(scalar(r.scalar()?.saturating_neg(), r.pending))
        }
        Elem::Add(a, b) => {
            let (x, y, p) = binary(dyns, a, b)?;
            Ok(scalar(x.saturating_add(y), p))
        }
        Elem::Sub(a, b) => {
            let (x, y, p) = binary(dyns, a, b)?;
            Ok(scalar(x.saturating_sub(y), p))
        }
        Elem::Mul(a, b) => {
            let (x, y, p) = binary(dyns, a, b)?;
            Ok(scalar(x.saturating_mul(y), p))
        }
        Elem::Div(a, b) => {
            let (x, y, p) = binary(dyns, a, b)?;
            Ok(scalar(x.checked_div(y).ok_or(CaslError::DivideByZero)?, p))
        }
        Elem::Mod(a, b) => {
            let (x, y, p) = binary(dyns, a, b)?;
            Ok(scalar(x.checked_floor_mod(y).ok_or(CaslError::DivideByZero)?, p))
        }
        Elem::Mutate(a) => {
            let r = follow(dyns, a, next)?;
            if let Some(target) = r.pending {
                dyns.put(target, r.value.into_elem())?;
            }
            Ok(Resolution::plain(r.value))
        }
    }
}

/// Resolve whatever a slot holds.
fn follow(dyns: &mut Dynamics, ix: DynIndex, depth: usize) -> Result<Resolution> {
    let elem = dyns.elem(ix)?;
    resolve_inner(dyns, elem, depth)
}
