//! Expression tree produced by the parser.
//!
//! The node set is closed: evaluation (`eval::evaluate`) and code generation
//! (`codegen::emit`) match on it exhaustively. Integer operator semantics live
//! on [`BinaryOp`] so every backend divides the same way.

use std::fmt;

use crate::error::ArithmeticFault;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Mod => "%",
    }
  }

  pub fn from_symbol(symbol: &str) -> Option<Self> {
    Some(match symbol {
      "+" => BinaryOp::Add,
      "-" => BinaryOp::Sub,
      "*" => BinaryOp::Mul,
      "/" => BinaryOp::Div,
      "%" => BinaryOp::Mod,
      _ => return None,
    })
  }

  /// Combine two operands. Division rounds toward negative infinity and the
  /// remainder takes the sign of the divisor.
  pub fn apply(self, lhs: i64, rhs: i64) -> Result<i64, ArithmeticFault> {
    match self {
      BinaryOp::Add => lhs.checked_add(rhs).ok_or(ArithmeticFault::Overflow),
      BinaryOp::Sub => lhs.checked_sub(rhs).ok_or(ArithmeticFault::Overflow),
      BinaryOp::Mul => lhs.checked_mul(rhs).ok_or(ArithmeticFault::Overflow),
      BinaryOp::Div => floor_div(lhs, rhs),
      BinaryOp::Mod => floor_mod(lhs, rhs),
    }
  }
}

fn floor_div(lhs: i64, rhs: i64) -> Result<i64, ArithmeticFault> {
  if rhs == 0 {
    return Err(ArithmeticFault::DivisionByZero);
  }
  // Only i64::MIN / -1 fails here.
  let quotient = lhs.checked_div(rhs).ok_or(ArithmeticFault::Overflow)?;
  if lhs % rhs != 0 && (lhs < 0) != (rhs < 0) {
    Ok(quotient - 1)
  } else {
    Ok(quotient)
  }
}

fn floor_mod(lhs: i64, rhs: i64) -> Result<i64, ArithmeticFault> {
  if rhs == 0 {
    return Err(ArithmeticFault::ModuloByZero);
  }
  if rhs == -1 {
    return Ok(0);
  }
  let remainder = lhs % rhs;
  if remainder != 0 && (remainder < 0) != (rhs < 0) {
    Ok(remainder + rhs)
  } else {
    Ok(remainder)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Number {
    value: i64,
  },
  /// Read the memory cell.
  Recall,
  Negate {
    operand: Box<Node>,
  },
  /// Write the operand's value to the memory cell and yield it.
  Store {
    operand: Box<Node>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Node>,
    rhs: Box<Node>,
  },
}

impl Node {
  pub fn number(value: i64) -> Self {
    Self::Number { value }
  }

  pub fn negate(operand: Node) -> Self {
    Self::Negate {
      operand: Box::new(operand),
    }
  }

  pub fn store(operand: Node) -> Self {
    Self::Store {
      operand: Box::new(operand),
    }
  }

  pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }
}

/// Prefix S-expression form, e.g. `(+ (S 5) R)`.
impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Node::Number { value } => write!(f, "{value}"),
      Node::Recall => write!(f, "R"),
      Node::Negate { operand } => write!(f, "(- {operand})"),
      Node::Store { operand } => write!(f, "(S {operand})"),
      Node::Binary { op, lhs, rhs } => write!(f, "({} {lhs} {rhs})", op.symbol()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn division_floors() {
    assert_eq!(BinaryOp::Div.apply(7, 2), Ok(3));
    assert_eq!(BinaryOp::Div.apply(-7, 2), Ok(-4));
    assert_eq!(BinaryOp::Div.apply(7, -2), Ok(-4));
    assert_eq!(BinaryOp::Div.apply(-7, -2), Ok(3));
    assert_eq!(BinaryOp::Div.apply(-8, 2), Ok(-4));
  }

  #[test]
  fn modulo_follows_the_divisor() {
    assert_eq!(BinaryOp::Mod.apply(7, 2), Ok(1));
    assert_eq!(BinaryOp::Mod.apply(-7, 2), Ok(1));
    assert_eq!(BinaryOp::Mod.apply(7, -2), Ok(-1));
    assert_eq!(BinaryOp::Mod.apply(-7, -2), Ok(-1));
    assert_eq!(BinaryOp::Mod.apply(6, -3), Ok(0));
  }

  #[test]
  fn zero_divisors_fault() {
    assert_eq!(
      BinaryOp::Div.apply(5, 0),
      Err(ArithmeticFault::DivisionByZero)
    );
    assert_eq!(BinaryOp::Mod.apply(5, 0), Err(ArithmeticFault::ModuloByZero));
  }

  #[test]
  fn overflow_faults_instead_of_wrapping() {
    assert_eq!(
      BinaryOp::Add.apply(i64::MAX, 1),
      Err(ArithmeticFault::Overflow)
    );
    assert_eq!(
      BinaryOp::Div.apply(i64::MIN, -1),
      Err(ArithmeticFault::Overflow)
    );
    assert_eq!(BinaryOp::Mod.apply(i64::MIN, -1), Ok(0));
  }

  #[test]
  fn symbols_round_trip() {
    for op in [
      BinaryOp::Add,
      BinaryOp::Sub,
      BinaryOp::Mul,
      BinaryOp::Div,
      BinaryOp::Mod,
    ] {
      assert_eq!(BinaryOp::from_symbol(op.symbol()), Some(op));
    }
    assert_eq!(BinaryOp::from_symbol("^"), None);
  }

  #[test]
  fn displays_as_s_expression() {
    let node = Node::binary(
      BinaryOp::Add,
      Node::store(Node::number(5)),
      Node::negate(Node::Recall),
    );
    assert_eq!(node.to_string(), "(+ (S 5) (- R))");
  }
}
