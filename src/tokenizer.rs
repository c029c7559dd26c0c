//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about grammar beyond grouping digit runs into
//! integer literals and splitting out the six single-character symbols.
//! Tokens carry no source positions. Literals keep their digit text; the
//! parser converts them when it builds a leaf, so a literal that is never
//! parsed can never fail.

use std::fmt;

use log::{debug, trace};

use crate::ast::BinaryOp;
use crate::error::{CompileResult, InvalidCharacterSnafu};

/// Lexical tokens recognised by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  /// A run of ASCII digits, unbounded in length.
  Integer(String),
  Operator(BinaryOp),
  LParen,
  RParen,
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Token::Integer(digits) => f.write_str(digits),
      Token::Operator(op) => write!(f, "{}", op.symbol()),
      Token::LParen => f.write_str("("),
      Token::RParen => f.write_str(")"),
    }
  }
}

/// How the tokenizer treats characters outside the expression alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexMode {
  /// Unrecognised characters are dropped without producing a token.
  #[default]
  Permissive,
  /// Unrecognised characters are reported as `InvalidCharacter`.
  Strict,
}

/// Lex the input permissively.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  tokenize_with(input, LexMode::Permissive)
}

/// Lex the input in a single left-to-right maximal-munch pass.
///
/// Whitespace is removed before scanning, so digits separated only by
/// whitespace form one literal. Reported offsets refer to the original input.
pub fn tokenize_with(input: &str, mode: LexMode) -> CompileResult<Vec<Token>> {
  let chars: Vec<(usize, char)> = input
    .char_indices()
    .filter(|(_, c)| !c.is_whitespace())
    .collect();
  let mut tokens = Vec::new();
  let mut i = 0;

  while i < chars.len() {
    let (offset, c) = chars[i];

    if c.is_ascii_digit() {
      let mut text = String::new();
      while let Some(&(_, d)) = chars.get(i)
        && d.is_ascii_digit()
      {
        text.push(d);
        i += 1;
      }
      tokens.push(Token::Integer(text));
      continue;
    }

    i += 1;
    let token = match c {
      '(' => Some(Token::LParen),
      ')' => Some(Token::RParen),
      _ => BinaryOp::from_symbol(c).ok().map(Token::Operator),
    };
    match token {
      Some(token) => tokens.push(token),
      None if mode == LexMode::Strict => {
        return InvalidCharacterSnafu { ch: c, offset }.fail();
      }
      None => debug!("dropping unrecognised character {c:?} at byte {offset}"),
    }
  }

  trace!("tokens: {}", describe_tokens(&tokens));
  Ok(tokens)
}

/// Space-separated lexemes, used in diagnostics and logs.
pub fn describe_tokens(tokens: &[Token]) -> String {
  tokens
    .iter()
    .map(Token::to_string)
    .collect::<Vec<_>>()
    .join(" ")
}

/// Human-friendly description of an optional token; `None` means end of input.
pub fn describe_token(token: Option<&Token>) -> String {
  match token {
    Some(t) => t.to_string(),
    None => "EOF".to_string(),
  }
}
