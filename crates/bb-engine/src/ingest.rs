//! Ingestion adapter: parsed description tree to `Program`.
//!
//! A list whose first element is a string is a stage, keyed on the
//! string's first character. A list whose first element is itself a list
//! is a nested sequence. The root is read the same way, so a plain list of
//! stages compiles to sequence 0 holding a single `Enter` into sequence 1.
//!
//! Operator operands are stored in freshly allocated dynamic slots.

use bb_ir::{DynIndex, Elem, Node, Q16, SeqIndex, Shape, To};

use crate::dynamics::Dynamics;
use crate::error::{CaslError, Result};
use crate::program::Program;

/// Compile `description`, allocating operand slots from `dyns`.
///
/// On error the partially built program is discarded; callers must also
/// discard or roll back `dyns`.
pub fn compile(description: &Node, dyns: &mut Dynamics) -> Result<Program> {
    let mut builder = Builder { program: Program::new(), dyns };
    let root = builder.program.push_sequence(None)?;
    builder.parse(description, root)?;
    Ok(builder.program)
}

struct Builder<'a> {
    program: Program,
    dyns: &'a mut Dynamics,
}

impl Builder<'_> {
    /// Append `node` (a stage or a nested sequence) to `seq`.
    fn parse(&mut self, node: &Node, seq: SeqIndex) -> Result<()> {
        let items = node
            .as_list()
            .ok_or(CaslError::Malformed("expected a stage or sequence list"))?;
        let head = items
            .first()
            .ok_or(CaslError::Malformed("empty stage list"))?;

        match head {
            Node::Str(_) => self.stage(items, seq),
            Node::List(_) => {
                // allocate the Enter first so it sits before the child's stages
                let enter = self.program.push_stage(seq, To::Recur)?;
                let child = self.program.push_sequence(Some(seq))?;
                self.program.set_stage(enter, To::Enter(child));
                for item in items {
                    self.parse(item, child)?;
                }
                Ok(())
            }
            other => {
                tracing::error!(kind = other.kind(), "stage must start with a discriminant or a list");
                Err(CaslError::Malformed("stage must start with a discriminant or a list"))
            }
        }
    }

    fn stage(&mut self, items: &[Node], seq: SeqIndex) -> Result<()> {
        let tag = items[0].discriminant().ok_or(CaslError::Malformed("empty discriminant"))?;
        let to = match tag {
            'T' => {
                let [volts, seconds, shape] = operands::<3>(items)?;
                To::Literal {
                    volts: self.elem(volts)?,
                    seconds: self.elem(seconds)?,
                    shape: self.elem(shape)?,
                }
            }
            'I' => {
                let [pred] = operands::<1>(items)?;
                To::If(self.elem(pred)?)
            }
            'R' => control(items, To::Recur)?,
            'H' => control(items, To::Hold)?,
            'W' => control(items, To::Wait)?,
            'U' => control(items, To::Unheld)?,
            'L' => control(items, To::Lock)?,
            'O' => control(items, To::Open)?,
            other => {
                tracing::error!(discriminant = %other, "unknown stage discriminant");
                return Err(CaslError::Malformed("unknown stage discriminant"));
            }
        };
        self.program.push_stage(seq, to)?;
        Ok(())
    }

    /// Capture an expression-position node.
    fn elem(&mut self, node: &Node) -> Result<Elem> {
        let items = match node {
            Node::Number(f) => return Ok(Elem::Fixed(Q16::from_f32(*f))),
            Node::Bool(b) => return Ok(Elem::Fixed(if *b { Q16::ONE } else { Q16::ZERO })),
            Node::Str(s) => return Ok(Elem::Shape(Shape::from_name(s))),
            Node::List(items) => items,
        };
        let tag = items
            .first()
            .and_then(Node::discriminant)
            .ok_or(CaslError::Malformed("expression list needs a discriminant"))?;

        match tag {
            'D' => {
                let [ix] = operands::<1>(items)?;
                Ok(Elem::Dynamic(self.existing(ix)?))
            }
            'N' => {
                let [ix] = operands::<1>(items)?;
                Ok(Elem::Mutable(self.existing(ix)?))
            }
            'M' => {
                let [init] = operands::<1>(items)?;
                Ok(Elem::Mutable(self.capture(init)?))
            }
            '#' => {
                let [a] = operands::<1>(items)?;
                Ok(Elem::Mutate(self.capture(a)?))
            }
            '~' => {
                let [a] = operands::<1>(items)?;
                Ok(Elem::Negate(self.capture(a)?))
            }
            '+' | '-' | '*' | '/' | '%' => {
                let [a, b] = operands::<2>(items)?;
                let (a, b) = (self.capture(a)?, self.capture(b)?);
                Ok(match tag {
                    '+' => Elem::Add(a, b),
                    '-' => Elem::Sub(a, b),
                    '*' => Elem::Mul(a, b),
                    '/' => Elem::Div(a, b),
                    _ => Elem::Mod(a, b),
                })
            }
            other => {
                tracing::error!(discriminant = %other, "unknown expression discriminant");
                Err(CaslError::Malformed("unknown expression discriminant"))
            }
        }
    }

    /// Allocate a slot and capture `node` into it.
    fn capture(&mut self, node: &Node) -> Result<DynIndex> {
        let slot = self.dyns.allocate()?;
        let elem = self.elem(node)?;
        self.dyns.put(slot, elem)?;
        Ok(slot)
    }

    /// An operand naming an already-allocated slot.
    fn existing(&self, node: &Node) -> Result<DynIndex> {
        let Node::Number(f) = node else {
            return Err(CaslError::Malformed("slot reference must be a number"));
        };
        let raw = *f as usize;
        if raw as f32 != *f {
            return Err(CaslError::Malformed("slot reference must be a non-negative integer"));
        }
        self.dyns.index(raw)
    }
}

/// The `N` operands following a discriminant, exactly.
fn operands<const N: usize>(items: &[Node]) -> Result<[&Node; N]> {
    if items.len() != N + 1 {
        return Err(CaslError::Malformed("wrong operand count"));
    }
    Ok(core::array::from_fn(|i| &items[i + 1]))
}

fn control(items: &[Node], to: To) -> Result<To> {
    operands::<0>(items)?;
    Ok(to)
}
