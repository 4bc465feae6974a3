//! Shared error types used across the calculator pipeline.
//!
//! Every stage reports through [`CalcError`]. Lexical and syntax errors carry
//! the 1-based line and column of the token that triggered them, and
//! [`CalcError::report`] turns that position into a caret diagnostic in the
//! style of chibicc.

use std::fmt;

use snafu::Snafu;

pub type CalcResult<T> = Result<T, CalcError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CalcError {
  /// A character no token can start with.
  #[snafu(display("{line}:{column}: unrecognized character '{found}'"))]
  Lex {
    line: usize,
    column: usize,
    found: char,
  },

  /// A token that does not fit the grammar at this point.
  #[snafu(display("{line}:{column}: expected {expected}, but got {found}"))]
  Syntax {
    line: usize,
    column: usize,
    expected: String,
    found: String,
  },

  #[snafu(display("arithmetic error: {fault}"))]
  Arithmetic { fault: ArithmeticFault },
}

/// Why an integer operation could not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticFault {
  DivisionByZero,
  ModuloByZero,
  Overflow,
}

impl fmt::Display for ArithmeticFault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArithmeticFault::DivisionByZero => write!(f, "division by zero"),
      ArithmeticFault::ModuloByZero => write!(f, "modulo by zero"),
      ArithmeticFault::Overflow => write!(f, "integer overflow"),
    }
  }
}

impl From<ArithmeticFault> for CalcError {
  fn from(fault: ArithmeticFault) -> Self {
    CalcError::Arithmetic { fault }
  }
}

impl CalcError {
  /// Source position of the error, if it has one.
  pub fn position(&self) -> Option<(usize, usize)> {
    match self {
      CalcError::Lex { line, column, .. } | CalcError::Syntax { line, column, .. } => {
        Some((*line, *column))
      }
      CalcError::Arithmetic { .. } => None,
    }
  }

  /// Render the error against the source it came from, pointing at the
  /// offending column with a caret.
  pub fn report(&self, source: &str) -> String {
    let Some((line, column)) = self.position() else {
      return self.to_string();
    };
    let text = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
    let expr_line = format!("'{text}'");
    let char_offset = column.saturating_sub(1).min(text.chars().count()) + 1; // account for opening quote
    let marker = format!("{}^", " ".repeat(char_offset));
    format!("{expr_line}\n{marker} {self}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn report_points_at_column() {
    let err = CalcError::Syntax {
      line: 1,
      column: 3,
      expected: "a number".to_string(),
      found: "EOF".to_string(),
    };
    assert_eq!(
      err.report("2+"),
      "'2+'\n   ^ 1:3: expected a number, but got EOF"
    );
  }

  #[test]
  fn report_uses_the_offending_line() {
    let err = CalcError::Lex {
      line: 2,
      column: 2,
      found: '$',
    };
    let report = err.report("1 +\n2$");
    assert!(report.starts_with("'2$'\n  ^"));
  }

  #[test]
  fn arithmetic_errors_have_no_position() {
    let err = CalcError::from(ArithmeticFault::DivisionByZero);
    assert_eq!(err.position(), None);
    assert_eq!(err.report("5/0"), "arithmetic error: division by zero");
  }
}
