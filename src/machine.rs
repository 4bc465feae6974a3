//! A small interpreter for EWE programs.
//!
//! It understands the subset `codegen` produces: `equ` aliases, labelled or
//! bare assignment statements, `writeInt` and `halt`. Memory is a flat array
//! of words that starts zeroed. The program is parsed completely before the
//! first statement runs, so a malformed line is reported even if execution
//! would never reach it.

use std::collections::HashMap;

use snafu::Snafu;
use tracing::debug;

use crate::ast::BinaryOp;
use crate::error::ArithmeticFault;

/// Number of addressable words.
pub const MEMORY_WORDS: usize = 1 << 16;

#[derive(Debug, Snafu)]
pub enum MachineError {
  #[snafu(display("line {line}: malformed directive `{text}`"))]
  BadDirective { line: usize, text: String },

  #[snafu(display("line {line}: unrecognized statement `{text}`"))]
  UnknownStatement { line: usize, text: String },

  #[snafu(display("line {line}: unrecognized operand `{text}`"))]
  UnknownOperand { line: usize, text: String },

  #[snafu(display("line {line}: address {address} is outside machine memory"))]
  BadAddress { line: usize, address: i64 },

  #[snafu(display("line {line}: {fault}"))]
  Arithmetic { line: usize, fault: ArithmeticFault },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
  Literal(i64),
  /// `M[k]`, or an alias bound to it.
  Cell(usize),
  /// `M[alias+k]`: the alias's value plus an offset.
  Indirect { base: usize, offset: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
  Move {
    dst: Operand,
    src: Operand,
  },
  Compute {
    dst: Operand,
    lhs: Operand,
    op: BinaryOp,
    rhs: Operand,
  },
  WriteInt(Operand),
  Halt,
}

/// Run `program` and return every value it printed with `writeInt`.
pub fn run(program: &str) -> Result<Vec<i64>, MachineError> {
  let aliases = collect_aliases(program)?;
  let statements = parse_statements(program, &aliases)?;
  debug!(
    statements = statements.len(),
    aliases = aliases.len(),
    "loaded EWE program"
  );

  let mut machine = Machine::default();
  for (line, statement) in statements {
    if !machine.execute(line, statement)? {
      break;
    }
  }
  Ok(machine.output)
}

/// Numbered, trimmed lines that are neither blank nor comments.
fn code_lines(program: &str) -> impl Iterator<Item = (usize, &str)> {
  program
    .lines()
    .enumerate()
    .map(|(index, text)| (index + 1, text.trim()))
    .filter(|(_, text)| !text.is_empty() && !text.starts_with('#'))
}

fn collect_aliases(program: &str) -> Result<HashMap<String, usize>, MachineError> {
  let mut aliases = HashMap::new();
  for (line, text) in code_lines(program) {
    let Some(rest) = text.strip_prefix("equ ") else {
      continue;
    };
    let mut parts = rest.split_whitespace();
    let (Some(name), Some(target), None) = (parts.next(), parts.next(), parts.next()) else {
      return BadDirectiveSnafu { line, text }.fail();
    };
    let Some(address) = cell_address(target) else {
      return BadDirectiveSnafu { line, text }.fail();
    };
    aliases.insert(name.to_string(), address);
  }
  Ok(aliases)
}

fn parse_statements(
  program: &str,
  aliases: &HashMap<String, usize>,
) -> Result<Vec<(usize, Statement)>, MachineError> {
  code_lines(program)
    .filter(|(_, text)| !text.starts_with("equ "))
    .map(|(line, text)| {
      parse_statement(line, strip_label(text), aliases).map(|statement| (line, statement))
    })
    .collect()
}

/// Drop a leading `label:` if there is one.
fn strip_label(text: &str) -> &str {
  if let Some((label, rest)) = text.split_once(':')
    && !rest.starts_with('=')
    && !label.is_empty()
    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
  {
    return rest.trim();
  }
  text
}

fn parse_statement(
  line: usize,
  text: &str,
  aliases: &HashMap<String, usize>,
) -> Result<Statement, MachineError> {
  if text == "halt" {
    return Ok(Statement::Halt);
  }

  if let Some(inner) = text
    .strip_prefix("writeInt(")
    .and_then(|rest| rest.strip_suffix(')'))
  {
    return Ok(Statement::WriteInt(parse_operand(line, inner.trim(), aliases)?));
  }

  let Some((dst, src)) = text.split_once(":=") else {
    return UnknownStatementSnafu { line, text }.fail();
  };
  let dst = match parse_operand(line, dst.trim(), aliases)? {
    Operand::Literal(_) => return UnknownOperandSnafu { line, text: dst.trim() }.fail(),
    operand => operand,
  };

  let parts: Vec<&str> = src.split_whitespace().collect();
  match parts.as_slice() {
    [src] => Ok(Statement::Move {
      dst,
      src: parse_operand(line, src, aliases)?,
    }),
    [lhs, symbol, rhs] => {
      let Some(op) = BinaryOp::from_symbol(symbol) else {
        return UnknownStatementSnafu { line, text }.fail();
      };
      Ok(Statement::Compute {
        dst,
        lhs: parse_operand(line, lhs, aliases)?,
        op,
        rhs: parse_operand(line, rhs, aliases)?,
      })
    }
    _ => UnknownStatementSnafu { line, text }.fail(),
  }
}

fn parse_operand(
  line: usize,
  text: &str,
  aliases: &HashMap<String, usize>,
) -> Result<Operand, MachineError> {
  if let Ok(value) = text.parse::<i64>() {
    return Ok(Operand::Literal(value));
  }

  if let Some(address) = cell_address(text) {
    return Ok(Operand::Cell(address));
  }

  if let Some(inner) = memory_reference(text) {
    let (name, offset) = match inner.find(['+', '-']) {
      Some(split) => (inner[..split].trim(), inner[split..].trim().parse::<i64>().ok()),
      None => (inner, Some(0)),
    };
    if let (Some(&base), Some(offset)) = (aliases.get(name), offset) {
      return Ok(Operand::Indirect { base, offset });
    }
    return UnknownOperandSnafu { line, text }.fail();
  }

  match aliases.get(text) {
    Some(&address) => Ok(Operand::Cell(address)),
    None => UnknownOperandSnafu { line, text }.fail(),
  }
}

fn memory_reference(text: &str) -> Option<&str> {
  text
    .strip_prefix("M[")
    .and_then(|rest| rest.strip_suffix(']'))
    .map(str::trim)
}

/// The address in a literal reference such as `M[7]`.
fn cell_address(text: &str) -> Option<usize> {
  memory_reference(text)?.parse().ok()
}

#[derive(Debug, Default)]
struct Machine {
  memory: Vec<i64>,
  output: Vec<i64>,
}

impl Machine {
  /// Execute one statement; `false` means the program halted.
  fn execute(&mut self, line: usize, statement: Statement) -> Result<bool, MachineError> {
    match statement {
      Statement::Move { dst, src } => {
        let value = self.read(line, src)?;
        self.write(line, dst, value)?;
      }
      Statement::Compute { dst, lhs, op, rhs } => {
        let lhs = self.read(line, lhs)?;
        let rhs = self.read(line, rhs)?;
        let value = op
          .apply(lhs, rhs)
          .map_err(|fault| ArithmeticSnafu { line, fault }.build())?;
        self.write(line, dst, value)?;
      }
      Statement::WriteInt(operand) => {
        let value = self.read(line, operand)?;
        self.output.push(value);
      }
      Statement::Halt => return Ok(false),
    }
    Ok(true)
  }

  fn load(&self, address: usize) -> i64 {
    self.memory.get(address).copied().unwrap_or(0)
  }

  fn address(&self, line: usize, operand: Operand) -> Result<usize, MachineError> {
    let address = match operand {
      Operand::Cell(address) => i64::try_from(address).unwrap_or(i64::MAX),
      Operand::Indirect { base, offset } => self.load(base).saturating_add(offset),
      Operand::Literal(value) => value,
    };
    match usize::try_from(address) {
      Ok(address) if address < MEMORY_WORDS => Ok(address),
      _ => BadAddressSnafu { line, address }.fail(),
    }
  }

  fn read(&self, line: usize, operand: Operand) -> Result<i64, MachineError> {
    match operand {
      Operand::Literal(value) => Ok(value),
      _ => Ok(self.load(self.address(line, operand)?)),
    }
  }

  fn write(&mut self, line: usize, operand: Operand, value: i64) -> Result<(), MachineError> {
    let address = self.address(line, operand)?;
    if address >= self.memory.len() {
      self.memory.resize(address + 1, 0);
    }
    self.memory[address] = value;
    Ok(())
  }
}
