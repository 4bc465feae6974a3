//! Tree-walking evaluator.
//!
//! Store and recall go through an explicit [`Memory`] owned by the caller.
//! One memory belongs to one evaluation session, so nothing stored by an
//! earlier request can leak into a later one.

use tracing::trace;

use crate::ast::Node;
use crate::error::{ArithmeticFault, CalcResult};

/// The calculator's single memory cell. Starts at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
  value: i64,
}

impl Memory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn recall(&self) -> i64 {
    self.value
  }

  pub fn store(&mut self, value: i64) {
    self.value = value;
  }
}

/// Evaluate `node`, left operand before right.
pub fn evaluate(node: &Node, memory: &mut Memory) -> CalcResult<i64> {
  match node {
    Node::Number { value } => Ok(*value),
    Node::Recall => Ok(memory.recall()),
    Node::Negate { operand } => {
      let value = evaluate(operand, memory)?;
      Ok(value.checked_neg().ok_or(ArithmeticFault::Overflow)?)
    }
    Node::Store { operand } => {
      let value = evaluate(operand, memory)?;
      trace!(value, "storing to memory");
      memory.store(value);
      Ok(value)
    }
    Node::Binary { op, lhs, rhs } => {
      let lhs = evaluate(lhs, memory)?;
      let rhs = evaluate(rhs, memory)?;
      Ok(op.apply(lhs, rhs)?)
    }
  }
}
