//! Code generation: lower the expression tree into EWE pseudo-assembly.
//!
//! The target is a stack machine addressed through `sp`. Every node's block
//! leaves its value in `M[sp+0]` relative to `sp` at block entry and restores
//! `sp` before it ends. Binary nodes reserve `tres` (3) slots: the result
//! slot plus two staging slots for the operands. Unary nodes reserve `uno`
//! (1) slot. Children are emitted one frame above their parent, so nothing a
//! child writes can clobber a value the parent has already staged.

use crate::ast::{BinaryOp, Node};

const PROLOGUE: &str = "\
#The result is:
#Start root tree
main: sp := 7
     negateNum := 0
     uno := 1
     tres := 3
     sp := sp + uno
";

const EPILOGUE: &str = "\
#End call subtree root
     sp := sp - uno
     tmp := M[sp+1]
     writeInt(tmp)
     halt
equ tmp       M[0]
equ tmp2      M[1]
equ negateNum M[2]
equ uno       M[3]
equ tres      M[4]
equ mem       M[5]
equ sp        M[6]
equ stack     M[7]
";

/// Emit a complete program that evaluates `node` and prints the result.
pub fn program(node: &Node) -> String {
  let mut asm = String::from(PROLOGUE);
  emit_node(node, &mut asm);
  asm.push_str(EPILOGUE);
  asm
}

/// Emit the instruction block for `node` alone, without register setup.
pub fn emit(node: &Node) -> String {
  let mut asm = String::new();
  emit_node(node, &mut asm);
  asm
}

fn emit_node(node: &Node, asm: &mut String) {
  match node {
    Node::Number { value } => {
      asm.push_str("#Start Number\n");
      asm.push_str(&format!("     tmp := {value}\n"));
      asm.push_str("     M[sp+0] := tmp\n");
      asm.push_str("#End Number\n");
    }
    Node::Recall => {
      asm.push_str("#Start Recall\n");
      asm.push_str("     M[sp+0] := mem\n");
      asm.push_str("#End Recall\n");
    }
    Node::Negate { operand } => {
      asm.push_str("#Start Negate\n");
      emit_staged(operand, asm);
      asm.push_str("     tmp := negateNum - tmp\n");
      asm.push_str("     M[sp+0] := tmp\n");
      asm.push_str("#End Negate\n");
    }
    Node::Store { operand } => {
      asm.push_str("#Start Store\n");
      emit_staged(operand, asm);
      asm.push_str("     M[sp+0] := tmp\n");
      asm.push_str("     mem := tmp\n");
      asm.push_str("#End Store\n");
    }
    Node::Binary { op, lhs, rhs } => {
      let name = block_name(*op);
      asm.push_str(&format!("#Start {name}\n"));
      asm.push_str("     sp := sp + tres\n");
      asm.push_str("#Left operand\n");
      emit_node(lhs, asm);
      asm.push_str("     sp := sp - tres\n");
      asm.push_str("     tmp := M[sp+3]\n");
      asm.push_str("     M[sp+1] := tmp\n");
      asm.push_str("     sp := sp + tres\n");
      asm.push_str("#Right operand\n");
      emit_node(rhs, asm);
      asm.push_str("     sp := sp - tres\n");
      asm.push_str("     tmp := M[sp+3]\n");
      asm.push_str("     M[sp+2] := tmp\n");
      asm.push_str("     tmp := M[sp+1]\n");
      asm.push_str("     tmp2 := M[sp+2]\n");
      asm.push_str(&format!("     tmp := tmp {} tmp2\n", op.symbol()));
      asm.push_str("     M[sp+0] := tmp\n");
      asm.push_str(&format!("#End {name}\n"));
    }
  }
}

/// Evaluate a unary node's operand one slot up and load it into `tmp`.
fn emit_staged(operand: &Node, asm: &mut String) {
  asm.push_str("     sp := sp + uno\n");
  emit_node(operand, asm);
  asm.push_str("     sp := sp - uno\n");
  asm.push_str("     tmp := M[sp+1]\n");
}

fn block_name(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Add => "Add",
    BinaryOp::Sub => "Sub",
    BinaryOp::Mul => "Mul",
    BinaryOp::Div => "Div",
    BinaryOp::Mod => "Mod",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn number_block() {
    assert_eq!(
      emit(&Node::number(42)),
      "#Start Number\n     tmp := 42\n     M[sp+0] := tmp\n#End Number\n"
    );
  }

  #[test]
  fn recall_copies_memory_register() {
    assert_eq!(
      emit(&Node::Recall),
      "#Start Recall\n     M[sp+0] := mem\n#End Recall\n"
    );
  }

  #[test]
  fn store_stages_one_slot_and_writes_mem() {
    let asm = emit(&Node::store(Node::number(5)));
    let expected = "\
#Start Store
     sp := sp + uno
#Start Number
     tmp := 5
     M[sp+0] := tmp
#End Number
     sp := sp - uno
     tmp := M[sp+1]
     M[sp+0] := tmp
     mem := tmp
#End Store
";
    assert_eq!(asm, expected);
  }

  #[test]
  fn negate_subtracts_from_zero_constant() {
    let asm = emit(&Node::negate(Node::Recall));
    assert!(asm.contains("     tmp := negateNum - tmp\n"));
    assert!(asm.starts_with("#Start Negate\n     sp := sp + uno\n"));
  }

  #[test]
  fn binary_blocks_use_their_operator() {
    for (op, line) in [
      (BinaryOp::Add, "tmp := tmp + tmp2"),
      (BinaryOp::Sub, "tmp := tmp - tmp2"),
      (BinaryOp::Mul, "tmp := tmp * tmp2"),
      (BinaryOp::Div, "tmp := tmp / tmp2"),
      (BinaryOp::Mod, "tmp := tmp % tmp2"),
    ] {
      let asm = emit(&Node::binary(op, Node::number(1), Node::number(2)));
      assert!(asm.contains(line), "{op:?} block is missing `{line}`");
      assert!(asm.starts_with(&format!("#Start {}\n", block_name(op))));
    }
  }

  #[test]
  fn binary_stack_pointer_is_balanced() {
    let node = Node::binary(
      BinaryOp::Mul,
      Node::binary(BinaryOp::Add, Node::number(1), Node::number(2)),
      Node::negate(Node::store(Node::number(3))),
    );
    let asm = emit(&node);
    let advances = asm.matches("sp := sp +").count();
    let retreats = asm.matches("sp := sp -").count();
    assert_eq!(advances, retreats);
  }

  #[test]
  fn left_operand_is_emitted_first() {
    let asm = emit(&Node::binary(
      BinaryOp::Sub,
      Node::number(8),
      Node::number(3),
    ));
    let left = asm.find("tmp := 8").unwrap();
    let right = asm.find("tmp := 3").unwrap();
    assert!(left < right);
  }

  #[test]
  fn program_wraps_the_block() {
    let asm = program(&Node::number(1));
    assert!(asm.starts_with(PROLOGUE));
    assert!(asm.ends_with(EPILOGUE));
    assert!(asm.contains(&emit(&Node::number(1))));
  }
}
