//! Expression elements.
//!
//! Expressions are stored flat: operator operands live in dynamic slots and
//! are referenced by [`DynIndex`], so the dynamic slot array doubles as the
//! expression arena for an instance.

use core::fmt;

use crate::fixed::Q16;
use crate::shape::Shape;

/// Index into an instance's dynamic slot array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynIndex(pub u8);

impl DynIndex {
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DynIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single expression node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Elem {
    /// Literal scalar.
    Fixed(Q16),
    /// Easing shape identifier (only valid as a Literal's shape operand).
    Shape(Shape),
    /// Read another slot.
    Dynamic(DynIndex),
    /// Read another slot and mark it as the pending write-back target.
    Mutable(DynIndex),
    Negate(DynIndex),
    Add(DynIndex, DynIndex),
    Sub(DynIndex, DynIndex),
    Mul(DynIndex, DynIndex),
    Div(DynIndex, DynIndex),
    /// Floor modulo (result follows the divisor's sign).
    Mod(DynIndex, DynIndex),
    /// Resolve the operand and write it back to the pending mutable.
    Mutate(DynIndex),
}

impl Default for Elem {
    fn default() -> Self {
        Elem::Fixed(Q16::ZERO)
    }
}

impl Elem {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Elem::Fixed(_) => "fixed",
            Elem::Shape(_) => "shape",
            Elem::Dynamic(_) => "dynamic",
            Elem::Mutable(_) => "mutable",
            Elem::Negate(_) => "negate",
            Elem::Add(..) => "add",
            Elem::Sub(..) => "sub",
            Elem::Mul(..) => "mul",
            Elem::Div(..) => "div",
            Elem::Mod(..) => "mod",
            Elem::Mutate(_) => "mutate",
        }
    }
}

/// The result of resolving an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Scalar(Q16),
    Shape(Shape),
}

impl Value {
    /// The scalar payload, if this is not a shape.
    pub fn scalar(self) -> Option<Q16> {
        match self {
            Value::Scalar(q) => Some(q),
            Value::Shape(_) => None,
        }
    }

    /// The shape payload, if this is not a scalar.
    pub fn shape(self) -> Option<Shape> {
        match self {
            Value::Shape(s) => Some(s),
            Value::Scalar(_) => None,
        }
    }

    /// Store this value back into a slot.
    pub fn into_elem(self) -> Elem {
        match self {
            Value::Scalar(q) => Elem::Fixed(q),
            Value::Shape(s) => Elem::Shape(s),
        }
    }
}

impl From<Q16> for Value {
    fn from(q: Q16) -> Self {
        Value::Scalar(q)
    }
}
