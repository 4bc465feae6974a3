//! Recursive-descent parser producing the expression tree.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! prog     = expr EOF
//! expr     = term (("+" | "-") term)*
//! term     = storable (("*" | "/" | "%") storable)*
//! storable = negate "S"?
//! negate   = "-" factor | factor
//! factor   = NUMBER | "R" | "(" expr ")"
//! ```
//!
//! Each suffix decision reads one token and pushes it back when it does not
//! belong to the current production. Binary chains loop and fold into the
//! left subtree, which keeps them left-associative.
//!
//! Evaluation, code generation and dropping all recurse once per tree level,
//! and a long operator chain builds a tall left-deep tree without any
//! parentheses. So the parser tracks the height of every subtree it builds
//! and rejects input whose tree, or whose parenthesis nesting, would exceed
//! `max_depth`.

use tracing::debug;

use crate::ast::{BinaryOp, Node};
use crate::error::{CalcError, CalcResult, SyntaxSnafu};
use crate::tokenizer::{Lexer, Token, TokenKind, describe_token};

/// Tree height and parenthesis nesting accepted before the parser gives up.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// A subtree together with its height; leaves have height 1.
type Subtree = (Node, usize);

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  depth: usize,
  max_depth: usize,
}

impl<'a> Parser<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      lexer: Lexer::new(source),
      depth: 0,
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }

  /// Limit the height of the tree and how deeply parentheses may nest.
  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Parse exactly one expression followed by end of input.
  pub fn parse(&mut self) -> CalcResult<Node> {
    let (node, height) = self.expr()?;

    let token = self.lexer.next_token()?;
    if token.kind != TokenKind::Eof {
      return Err(unexpected(&token, "end of input"));
    }

    debug!(height, "parsed expression");
    Ok(node)
  }

  fn expr(&mut self) -> CalcResult<Subtree> {
    let (mut node, mut height) = self.term()?;

    loop {
      let token = self.lexer.next_token()?;
      let op = match token.kind {
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        _ => {
          self.lexer.push_back();
          return Ok((node, height));
        }
      };
      let (rhs, rhs_height) = self.term()?;
      height = self.grow(&token, height.max(rhs_height))?;
      node = Node::binary(op, node, rhs);
    }
  }

  fn term(&mut self) -> CalcResult<Subtree> {
    let (mut node, mut height) = self.storable()?;

    loop {
      let token = self.lexer.next_token()?;
      let op = match token.kind {
        TokenKind::Times => BinaryOp::Mul,
        TokenKind::Divide => BinaryOp::Div,
        TokenKind::Mod => BinaryOp::Mod,
        _ => {
          self.lexer.push_back();
          return Ok((node, height));
        }
      };
      let (rhs, rhs_height) = self.storable()?;
      height = self.grow(&token, height.max(rhs_height))?;
      node = Node::binary(op, node, rhs);
    }
  }

  fn storable(&mut self) -> CalcResult<Subtree> {
    let (node, height) = self.negate()?;

    let token = self.lexer.next_token()?;
    if token.is_keyword("S") {
      return Ok((Node::store(node), self.grow(&token, height)?));
    }
    if token.kind == TokenKind::Keyword {
      return Err(unexpected(&token, "\"S\""));
    }
    self.lexer.push_back();
    Ok((node, height))
  }

  fn negate(&mut self) -> CalcResult<Subtree> {
    let token = self.lexer.next_token()?;
    if token.kind == TokenKind::Sub {
      let (operand, height) = self.factor()?;
      return Ok((Node::negate(operand), self.grow(&token, height)?));
    }
    self.lexer.push_back();
    self.factor()
  }

  fn factor(&mut self) -> CalcResult<Subtree> {
    let token = self.lexer.next_token()?;

    match token.kind {
      TokenKind::Number => Ok((Node::number(number_value(&token)?), 1)),
      TokenKind::Keyword if token.is_keyword("R") => Ok((Node::Recall, 1)),
      TokenKind::Keyword => Err(unexpected(&token, "\"R\"")),
      TokenKind::LParen => {
        if self.depth >= self.max_depth {
          return Err(self.too_deep(&token));
        }
        self.depth += 1;
        let subtree = self.expr()?;
        self.depth -= 1;

        let close = self.lexer.next_token()?;
        if close.kind != TokenKind::RParen {
          return Err(unexpected(&close, "\")\""));
        }
        Ok(subtree)
      }
      _ => Err(unexpected(&token, "a number, \"R\" or \"(\"")),
    }
  }

  /// Height of a node whose tallest child is `height` high, built at `token`.
  fn grow(&self, token: &Token, height: usize) -> CalcResult<usize> {
    if height >= self.max_depth {
      return Err(self.too_deep(token));
    }
    Ok(height + 1)
  }

  fn too_deep(&self, token: &Token) -> CalcError {
    unexpected(
      token,
      &format!("an expression nested at most {} deep", self.max_depth),
    )
  }
}

fn number_value(token: &Token) -> CalcResult<i64> {
  token
    .lexeme
    .as_deref()
    .and_then(|text| text.parse::<i64>().ok())
    .ok_or_else(|| unexpected(token, "an integer literal that fits in 64 bits"))
}

fn unexpected(token: &Token, expected: &str) -> CalcError {
  SyntaxSnafu {
    line: token.line,
    column: token.column,
    expected,
    found: describe_token(token),
  }
  .build()
}
