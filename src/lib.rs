//! Crate root: wires together the calculator pipeline.
//!
//! The stages are small and composable:
//! - `tokenizer` scans characters into positioned tokens on demand.
//! - `parser` owns all syntactic knowledge and returns an expression tree.
//! - `eval` walks the tree against a session-scoped memory cell.
//! - `codegen` lowers the tree into EWE stack-machine pseudo-assembly.
//! - `machine` runs EWE programs, which lets generated code be checked
//!   against direct evaluation.
//! - `error` centralises the error type shared by the other modules.
//!
//! None of these stages perform I/O; the `ewecalc` binary owns that.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod eval;
pub mod machine;
pub mod parser;
pub mod tokenizer;

use tracing::debug;

pub use ast::{BinaryOp, Node};
pub use error::{ArithmeticFault, CalcError, CalcResult};
pub use eval::{Memory, evaluate};

/// Parse a single expression.
pub fn parse(source: &str) -> CalcResult<Node> {
  parser::Parser::new(source).parse()
}

/// Evaluate an expression in a fresh session, so `R` starts out as zero.
pub fn calculate(source: &str) -> CalcResult<i64> {
  calculate_node(&parse(source)?)
}

/// Evaluate an already parsed tree in a fresh session.
pub fn calculate_node(node: &Node) -> CalcResult<i64> {
  let mut memory = Memory::new();
  let value = evaluate(node, &mut memory)?;
  debug!(value, "evaluated expression");
  Ok(value)
}

/// Compile an expression into its EWE instruction block.
pub fn compile(source: &str) -> CalcResult<String> {
  let node = parse(source)?;
  Ok(codegen::emit(&node))
}

/// Compile an expression into a complete, runnable EWE program.
pub fn compile_program(source: &str) -> CalcResult<String> {
  let node = parse(source)?;
  let asm = codegen::program(&node);
  debug!(lines = asm.lines().count(), "generated EWE program");
  Ok(asm)
}
