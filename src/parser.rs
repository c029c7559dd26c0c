//! Recursive-descent parser producing the expression AST.
//!
//! One helper per grammar rule, with a single token of lookahead:
//!
//! ```text
//! expr   := term ( ('+' | '-') term )*
//! term   := factor ( ('*' | '/') factor )*
//! factor := INTEGER | '(' expr ')'
//! ```
//!
//! `expr` and `term` fold their operands into a left-leaning tree, which is
//! what makes every operator left-associative.

use log::{debug, trace};
use snafu::{OptionExt, ensure};

use crate::ast::{AstNode, BinaryOp};
use crate::error::{
  CompileResult, LiteralOutOfRangeSnafu, TooDeepSnafu, TrailingTokensSnafu, UnexpectedTokenSnafu,
  UnmatchedParenthesisSnafu,
};
use crate::tokenizer::{Token, describe_token};

/// Deepest tree, and deepest parenthesis nesting, the parser accepts.
///
/// Evaluating a tree instantiates one `Eval` per level, so this stays well
/// below the template depth limits of g++ (900) and clang (1024).
pub const MAX_DEPTH: usize = 512;

/// What to do with tokens left over after a complete expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingTokens {
  /// Accept the longest valid prefix and leave the rest unread.
  #[default]
  Ignore,
  /// Fail with `TrailingTokens` unless every token was consumed.
  Reject,
}

/// Parse a token sequence, accepting unconsumed trailing tokens.
pub fn parse(tokens: &[Token]) -> CompileResult<AstNode> {
  parse_with(tokens, TrailingTokens::Ignore)
}

/// Parse a token sequence with an explicit trailing-token policy.
pub fn parse_with(tokens: &[Token], trailing: TrailingTokens) -> CompileResult<AstNode> {
  let mut stream = TokenStream::new(tokens);
  let tree = parse_expr(&mut stream)?;

  if let Some(token) = stream.peek() {
    if trailing == TrailingTokens::Reject {
      return TrailingTokensSnafu {
        found: token.to_string(),
        index: stream.pos,
      }
      .fail();
    }
    debug!(
      "ignoring {} trailing token(s) from index {}",
      tokens.len() - stream.pos,
      stream.pos
    );
  }

  Ok(tree.node)
}

/// A parsed node together with its height.
struct Subtree {
  node: AstNode,
  depth: usize,
}

impl Subtree {
  fn leaf(value: u64) -> Self {
    Self {
      node: AstNode::leaf(value),
      depth: 1,
    }
  }

  fn join(op: BinaryOp, lhs: Subtree, rhs: Subtree) -> CompileResult<Self> {
    let depth = lhs.depth.max(rhs.depth) + 1;
    ensure!(depth <= MAX_DEPTH, TooDeepSnafu { limit: MAX_DEPTH });
    Ok(Self {
      node: AstNode::binary(op, lhs.node, rhs.node),
      depth,
    })
  }
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Subtree> {
  let mut tree = parse_term(stream)?;

  while let Some(op) = stream.peek_operator(&[BinaryOp::Add, BinaryOp::Sub]) {
    stream.consume();
    let rhs = parse_term(stream)?;
    trace!("reduce expr {}", op.symbol());
    tree = Subtree::join(op, tree, rhs)?;
  }

  Ok(tree)
}

fn parse_term(stream: &mut TokenStream) -> CompileResult<Subtree> {
  let mut tree = parse_factor(stream)?;

  while let Some(op) = stream.peek_operator(&[BinaryOp::Mul, BinaryOp::Div]) {
    stream.consume();
    let rhs = parse_factor(stream)?;
    trace!("reduce term {}", op.symbol());
    tree = Subtree::join(op, tree, rhs)?;
  }

  Ok(tree)
}

fn parse_factor(stream: &mut TokenStream) -> CompileResult<Subtree> {
  match stream.peek() {
    Some(Token::LParen) => {
      stream.consume();
      stream.open_group()?;
      let tree = parse_expr(stream)?;
      stream.expect_rparen()?;
      Ok(tree)
    }
    Some(Token::Integer(digits)) => {
      stream.consume();
      let value = digits
        .parse::<u64>()
        .ok()
        .context(LiteralOutOfRangeSnafu { literal: digits })?;
      Ok(Subtree::leaf(value))
    }
    other => UnexpectedTokenSnafu {
      found: describe_token(other),
      index: stream.pos,
    }
    .fail(),
  }
}

/// Read cursor over the token slice; only `consume` advances it.
struct TokenStream<'a> {
  tokens: &'a [Token],
  pos: usize,
  /// Currently open parentheses.
  groups: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: &'a [Token]) -> Self {
    Self {
      tokens,
      pos: 0,
      groups: 0,
    }
  }

  fn peek(&self) -> Option<&'a Token> {
    self.tokens.get(self.pos)
  }

  fn consume(&mut self) -> Option<&'a Token> {
    let token = self.peek();
    self.pos += 1;
    token
  }

  /// The current token's operator, if it is one of `accepted`.
  fn peek_operator(&self, accepted: &[BinaryOp]) -> Option<BinaryOp> {
    match self.peek() {
      Some(Token::Operator(op)) if accepted.contains(op) => Some(*op),
      _ => None,
    }
  }

  fn open_group(&mut self) -> CompileResult<()> {
    self.groups += 1;
    ensure!(self.groups <= MAX_DEPTH, TooDeepSnafu { limit: MAX_DEPTH });
    Ok(())
  }

  fn expect_rparen(&mut self) -> CompileResult<()> {
    let index = self.pos;
    match self.consume() {
      Some(Token::RParen) => {
        self.groups -= 1;
        Ok(())
      }
      other => UnmatchedParenthesisSnafu {
        found: describe_token(other),
        index,
      }
      .fail(),
    }
  }
}
