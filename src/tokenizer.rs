//! Lexical analysis: a pull-based scanner that hands the parser one token at
//! a time.
//!
//! The scanner is a small state machine over characters. Letters and digits
//! are munched maximally, every operator is a single character, and the
//! character that ends a run is left in place for the next call. The parser
//! gets exactly one token of push-back, which is all a grammar with
//! single-token suffix decisions needs.

use std::iter::Peekable;
use std::str::Chars;

use tracing::trace;

use crate::error::{CalcResult, LexSnafu};

/// Words the scanner classifies as keywords instead of identifiers.
pub const KEYWORDS: [&str; 2] = ["S", "R"];

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Identifier,
  Number,
  Keyword,
  Add,
  Sub,
  Times,
  Divide,
  Mod,
  LParen,
  RParen,
  Eof,
}

/// A classified token and where its first character sits in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub line: usize,
  pub column: usize,
  /// Only identifiers, numbers and keywords keep their text.
  pub lexeme: Option<String>,
}

impl Token {
  pub fn new(kind: TokenKind, line: usize, column: usize, lexeme: Option<String>) -> Self {
    Self {
      kind,
      line,
      column,
      lexeme,
    }
  }

  /// True for the keyword token spelled exactly `word`.
  pub fn is_keyword(&self, word: &str) -> bool {
    self.kind == TokenKind::Keyword && self.lexeme.as_deref() == Some(word)
  }
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  let lexeme = token.lexeme.as_deref().unwrap_or_default();
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    TokenKind::Identifier => format!("identifier \"{lexeme}\""),
    TokenKind::Number | TokenKind::Keyword => format!("\"{lexeme}\""),
    TokenKind::Add => "\"+\"".to_string(),
    TokenKind::Sub => "\"-\"".to_string(),
    TokenKind::Times => "\"*\"".to_string(),
    TokenKind::Divide => "\"/\"".to_string(),
    TokenKind::Mod => "\"%\"".to_string(),
    TokenKind::LParen => "\"(\"".to_string(),
    TokenKind::RParen => "\")\"".to_string(),
  }
}

pub struct Lexer<'a> {
  chars: Peekable<Chars<'a>>,
  /// Position of the next unread character.
  line: usize,
  column: usize,
  /// Position just past the last token, where `Eof` is reported.
  end: (usize, usize),
  last: Option<Token>,
  pushed: Option<Token>,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      chars: source.chars().peekable(),
      line: 1,
      column: 1,
      end: (1, 1),
      last: None,
      pushed: None,
    }
  }

  /// Return the next token, replaying the pushed-back one first if present.
  /// Once the input is exhausted every call yields `Eof`.
  pub fn next_token(&mut self) -> CalcResult<Token> {
    if let Some(token) = self.pushed.take() {
      self.last = Some(token.clone());
      return Ok(token);
    }

    let token = self.scan()?;
    trace!(kind = ?token.kind, line = token.line, column = token.column, "scanned token");
    self.last = Some(token.clone());
    Ok(token)
  }

  /// Un-read the token most recently returned by `next_token`.
  ///
  /// Only one token can be pending; pushing back twice without reading in
  /// between is a bug in the caller.
  pub fn push_back(&mut self) {
    debug_assert!(
      self.pushed.is_none(),
      "push_back called twice without an intervening next_token"
    );
    if self.pushed.is_none() {
      self.pushed = self.last.take();
    }
  }

  fn scan(&mut self) -> CalcResult<Token> {
    self.skip_whitespace();

    let (line, column) = (self.line, self.column);
    let Some(c) = self.advance() else {
      let (line, column) = self.end;
      return Ok(Token::new(TokenKind::Eof, line, column, None));
    };

    let (kind, lexeme) = match c {
      '+' => (TokenKind::Add, None),
      '-' => (TokenKind::Sub, None),
      '*' => (TokenKind::Times, None),
      '/' => (TokenKind::Divide, None),
      '%' => (TokenKind::Mod, None),
      '(' => (TokenKind::LParen, None),
      ')' => (TokenKind::RParen, None),
      c if c.is_ascii_alphabetic() => {
        let lexeme = self.munch(c, |c| c.is_ascii_alphanumeric());
        let kind = if KEYWORDS.contains(&lexeme.as_str()) {
          TokenKind::Keyword
        } else {
          TokenKind::Identifier
        };
        (kind, Some(lexeme))
      }
      c if c.is_ascii_digit() => {
        let lexeme = self.munch(c, |c| c.is_ascii_digit());
        (TokenKind::Number, Some(lexeme))
      }
      found => return LexSnafu { line, column, found }.fail(),
    };

    self.end = (self.line, self.column);
    Ok(Token::new(kind, line, column, lexeme))
  }

  /// Accumulate `first` and every following character accepted by `accept`.
  fn munch(&mut self, first: char, accept: impl Fn(char) -> bool) -> String {
    let mut lexeme = String::from(first);
    while let Some(&c) = self.chars.peek()
      && accept(c)
    {
      lexeme.push(c);
      self.advance();
    }
    lexeme
  }

  fn skip_whitespace(&mut self) {
    while matches!(self.chars.peek(), Some(' ' | '\t' | '\r' | '\n')) {
      self.advance();
    }
  }

  fn advance(&mut self) -> Option<char> {
    let c = self.chars.next()?;
    if c == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(c)
  }
}

/// Lex the whole input into a vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CalcResult<Vec<Token>> {
  let mut lexer = Lexer::new(input);
  let mut tokens = Vec::new();
  loop {
    let token = lexer.next_token()?;
    let done = token.kind == TokenKind::Eof;
    tokens.push(token);
    if done {
      return Ok(tokens);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CalcError;

  fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
      .unwrap()
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn scans_operators_and_parens() {
    use TokenKind::*;
    assert_eq!(
      kinds("+ - * / % ( )"),
      vec![Add, Sub, Times, Divide, Mod, LParen, RParen, Eof]
    );
  }

  #[test]
  fn classifies_keywords_and_identifiers() {
    let tokens = tokenize("S R x SR S5").unwrap();
    assert!(tokens[0].is_keyword("S"));
    assert!(tokens[1].is_keyword("R"));
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].lexeme.as_deref(), Some("SR"));
    assert_eq!(tokens[4].kind, TokenKind::Identifier);
    assert_eq!(tokens[4].lexeme.as_deref(), Some("S5"));
  }

  #[test]
  fn digits_then_letter_split() {
    let tokens = tokenize("5S").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].lexeme.as_deref(), Some("5"));
    assert!(tokens[1].is_keyword("S"));
    assert_eq!(tokens[1].column, 2);
  }

  #[test]
  fn numbers_munch_maximally() {
    let tokens = tokenize("1234+5").unwrap();
    assert_eq!(tokens[0].lexeme.as_deref(), Some("1234"));
    assert_eq!(tokens[1].kind, TokenKind::Add);
    assert_eq!(tokens[1].column, 5);
    assert_eq!(tokens[2].lexeme.as_deref(), Some("5"));
  }

  #[test]
  fn operators_carry_no_lexeme() {
    let tokens = tokenize("(").unwrap();
    assert_eq!(tokens[0].lexeme, None);
  }

  #[test]
  fn tracks_first_character_positions() {
    let tokens = tokenize("  12 *\n\t(R)").unwrap();
    let positions: Vec<_> = tokens.iter().map(|t| (t.line, t.column)).collect();
    assert_eq!(positions, vec![(1, 3), (1, 6), (2, 2), (2, 3), (2, 4), (2, 5)]);
  }

  #[test]
  fn eof_sits_after_the_last_character() {
    let tokens = tokenize("2+").unwrap();
    assert_eq!(tokens[2].kind, TokenKind::Eof);
    assert_eq!((tokens[2].line, tokens[2].column), (1, 3));
  }

  #[test]
  fn eof_ignores_trailing_whitespace() {
    let tokens = tokenize("2+ \n\n").unwrap();
    assert_eq!(tokens[2].kind, TokenKind::Eof);
    assert_eq!((tokens[2].line, tokens[2].column), (1, 3));

    let tokens = tokenize("\n  ").unwrap();
    assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
  }

  #[test]
  fn eof_repeats() {
    let mut lexer = Lexer::new("");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
  }

  #[test]
  fn push_back_replays_the_last_token() {
    let mut lexer = Lexer::new("7 +");
    let first = lexer.next_token().unwrap();
    lexer.push_back();
    assert_eq!(lexer.next_token().unwrap(), first);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Add);
  }

  #[test]
  #[should_panic(expected = "push_back called twice")]
  fn double_push_back_is_a_usage_error() {
    let mut lexer = Lexer::new("1 2");
    lexer.next_token().unwrap();
    lexer.push_back();
    lexer.push_back();
  }

  #[test]
  fn unrecognized_character_is_fatal() {
    let err = tokenize("1 + $2").unwrap_err();
    assert!(matches!(
      err,
      CalcError::Lex {
        line: 1,
        column: 5,
        found: '$'
      }
    ));
  }

  #[test]
  fn non_ascii_letters_are_rejected() {
    assert!(matches!(
      tokenize("é").unwrap_err(),
      CalcError::Lex { found: 'é', .. }
    ));
  }

  #[test]
  fn describes_tokens_for_diagnostics() {
    let tokens = tokenize("x 12 S )").unwrap();
    let described: Vec<_> = tokens.iter().map(describe_token).collect();
    assert_eq!(
      described,
      vec!["identifier \"x\"", "\"12\"", "\"S\"", "\")\"", "EOF"]
    );
  }
}
