//! Expression tree shared by the parser and the code generator.

use std::fmt;

use crate::error::{CompileResult, UnknownOperatorSnafu};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  /// Map a source symbol to its operator, rejecting anything outside `+ - * /`.
  pub fn from_symbol(symbol: char) -> CompileResult<Self> {
    match symbol {
      '+' => Ok(Self::Add),
      '-' => Ok(Self::Sub),
      '*' => Ok(Self::Mul),
      '/' => Ok(Self::Div),
      _ => UnknownOperatorSnafu { symbol }.fail(),
    }
  }

  pub fn symbol(self) -> char {
    match self {
      Self::Add => '+',
      Self::Sub => '-',
      Self::Mul => '*',
      Self::Div => '/',
    }
  }

  /// Name of the tag type the metaprogramming header declares for this operator.
  pub fn type_name(self) -> &'static str {
    match self {
      Self::Add => "Add",
      Self::Sub => "Sub",
      Self::Mul => "Mul",
      Self::Div => "Div",
    }
  }

  /// Binding power: higher binds tighter.
  pub fn precedence(self) -> u8 {
    match self {
      Self::Add | Self::Sub => 1,
      Self::Mul | Self::Div => 2,
    }
  }
}

/// Expression tree produced by the parser.
///
/// Children are owned through `Box`, so every node has exactly one parent
/// and the tree cannot contain cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Leaf {
    value: u64,
  },
  Operator {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
}

impl AstNode {
  pub fn leaf(value: u64) -> Self {
    Self::Leaf { value }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Operator {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  /// Build an operator node from a raw symbol, as a caller assembling a tree
  /// by hand would.
  pub fn operator(symbol: char, lhs: AstNode, rhs: AstNode) -> CompileResult<Self> {
    Ok(Self::binary(BinaryOp::from_symbol(symbol)?, lhs, rhs))
  }

  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf { .. })
  }

  /// Operator-only precedence; leaves bind tighter than any operator.
  fn precedence(&self) -> u8 {
    match self {
      Self::Leaf { .. } => u8::MAX,
      Self::Operator { op, .. } => op.precedence(),
    }
  }

  /// Constructor-style rendering such as `Mul(Int(7), Add(Int(2), Int(3)))`.
  pub fn outline(&self) -> String {
    match self {
      Self::Leaf { value } => format!("Int({value})"),
      Self::Operator { op, lhs, rhs } => {
        format!("{}({}, {})", op.type_name(), lhs.outline(), rhs.outline())
      }
    }
  }
}

/// Infix rendering with the fewest parentheses that re-parse to the same tree.
///
/// A left operand needs parentheses only when it binds looser than its
/// parent; a right operand also needs them at equal precedence, since all
/// operators associate to the left.
impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf { value } => write!(f, "{value}"),
      Self::Operator { op, lhs, rhs } => {
        let prec = op.precedence();
        if lhs.precedence() < prec {
          write!(f, "({lhs})")?;
        } else {
          write!(f, "{lhs}")?;
        }
        write!(f, " {} ", op.symbol())?;
        if rhs.precedence() <= prec {
          write!(f, "({rhs})")
        } else {
          write!(f, "{rhs}")
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;

  fn int(value: u64) -> AstNode {
    AstNode::leaf(value)
  }

  #[test]
  fn symbols_round_trip_through_operators() {
    for symbol in ['+', '-', '*', '/'] {
      assert_eq!(BinaryOp::from_symbol(symbol).unwrap().symbol(), symbol);
    }
  }

  #[test]
  fn unknown_symbol_is_rejected() {
    let err = BinaryOp::from_symbol('^').unwrap_err();
    assert!(matches!(err, CompileError::UnknownOperator { symbol: '^' }));
    assert!(AstNode::operator('%', int(1), int(2)).is_err());
  }

  #[test]
  fn leaves_have_no_children() {
    assert!(int(3).is_leaf());
    assert!(!AstNode::binary(BinaryOp::Add, int(1), int(2)).is_leaf());
  }

  #[test]
  fn outline_names_operator_types() {
    let tree = AstNode::binary(
      BinaryOp::Mul,
      int(7),
      AstNode::binary(BinaryOp::Add, int(2), int(3)),
    );
    assert_eq!(tree.outline(), "Mul(Int(7), Add(Int(2), Int(3)))");
  }

  #[test]
  fn display_keeps_only_needed_parentheses() {
    let left_nested = AstNode::binary(
      BinaryOp::Sub,
      AstNode::binary(BinaryOp::Sub, int(8), int(3)),
      int(2),
    );
    assert_eq!(left_nested.to_string(), "8 - 3 - 2");

    let right_nested = AstNode::binary(
      BinaryOp::Sub,
      int(8),
      AstNode::binary(BinaryOp::Sub, int(3), int(2)),
    );
    assert_eq!(right_nested.to_string(), "8 - (3 - 2)");

    let grouped = AstNode::binary(
      BinaryOp::Mul,
      AstNode::binary(BinaryOp::Add, int(2), int(3)),
      int(4),
    );
    assert_eq!(grouped.to_string(), "(2 + 3) * 4");

    let tight = AstNode::binary(
      BinaryOp::Add,
      int(2),
      AstNode::binary(BinaryOp::Mul, int(3), int(4)),
    );
    assert_eq!(tight.to_string(), "2 + 3 * 4");
  }
}
