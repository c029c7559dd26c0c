//! Code generation: lower the parsed AST into C++ template types.
//!
//! Every leaf becomes `Int<v>` and every operator node becomes
//! `Expr<Op, L, R>`. Nothing is evaluated here; the C++ compiler does the
//! arithmetic while instantiating `Eval<ExprType>`, so division by zero or
//! overflow only shows up as a compiler diagnostic.

use log::debug;
use snafu::ensure;

use crate::ast::AstNode;
use crate::error::{CompileResult, LiteralOutOfRangeSnafu, TooDeepSnafu};
use crate::parser::MAX_DEPTH;

/// Metaprogramming header the generated program includes.
pub const META_FUNC_HPP: &str = include_str!("../assets/meta_func.hpp");

/// Default name under which the header is included and written.
pub const DEFAULT_HEADER: &str = "meta_func.hpp";

/// Knobs for the program skeleton wrapped around the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOptions {
  pub header: String,
  /// Wait for Enter before `main` returns.
  pub pause_on_exit: bool,
}

impl Default for ProgramOptions {
  fn default() -> Self {
    Self {
      header: DEFAULT_HEADER.to_string(),
      pause_on_exit: false,
    }
  }
}

/// Emit the nested template type for an expression tree.
pub fn generate_expr(node: &AstNode) -> CompileResult<String> {
  let mut code = String::new();
  emit_node(node, 1, &mut code)?;
  debug!("generated expression type: {code}");
  Ok(code)
}

/// Post-order walk: both children are emitted inside their parent's `Expr<..>`.
///
/// Trees built by hand skip the parser's depth check, so it is repeated here.
fn emit_node(node: &AstNode, depth: usize, code: &mut String) -> CompileResult<()> {
  ensure!(depth <= MAX_DEPTH, TooDeepSnafu { limit: MAX_DEPTH });
  match node {
    AstNode::Leaf { value } => {
      // Template arguments for `int N` must be valid int literals.
      if i32::try_from(*value).is_err() {
        return LiteralOutOfRangeSnafu {
          literal: value.to_string(),
        }
        .fail();
      }
      code.push_str(&format!("Int<{value}>"));
    }
    AstNode::Operator { op, lhs, rhs } => {
      code.push_str(&format!("Expr<{}, ", op.type_name()));
      emit_node(lhs, depth + 1, code)?;
      code.push_str(", ");
      emit_node(rhs, depth + 1, code)?;
      code.push('>');
    }
  }
  Ok(())
}

/// Wrap an expression type into a complete C++ program.
///
/// The expression text is inserted as-is.
pub fn build_program(expr_code: &str, options: &ProgramOptions) -> String {
  let mut src = String::new();
  src.push_str(&format!("#include \"{}\"\n", options.header));
  src.push_str("#include <iostream>\n");
  if options.pause_on_exit {
    src.push_str("#include <limits>\n");
  }
  src.push('\n');
  src.push_str(&format!("using ExprType = {expr_code};\n"));
  src.push_str("constexpr int result = Eval<ExprType>::result::value;\n");
  src.push('\n');
  src.push_str("int main() {\n");
  src.push_str("    std::cout << \"Result: \" << result << std::endl;\n");
  if options.pause_on_exit {
    src.push_str("    std::cout << \"Press Enter to exit...\";\n");
    src.push_str(
      "    std::cin.ignore(std::numeric_limits<std::streamsize>::max(), '\\n');\n",
    );
  }
  src.push_str("    return 0;\n");
  src.push_str("}\n");
  src
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::BinaryOp;
  use crate::error::CompileError;

  fn int(value: u64) -> AstNode {
    AstNode::leaf(value)
  }

  #[test]
  fn leaf_becomes_int_literal_type() {
    assert_eq!(generate_expr(&int(42)).unwrap(), "Int<42>");
  }

  #[test]
  fn operators_map_to_tag_types() {
    let cases = [
      (BinaryOp::Add, "Add"),
      (BinaryOp::Sub, "Sub"),
      (BinaryOp::Mul, "Mul"),
      (BinaryOp::Div, "Div"),
    ];
    for (op, tag) in cases {
      let code = generate_expr(&AstNode::binary(op, int(6), int(3))).unwrap();
      assert_eq!(code, format!("Expr<{tag}, Int<6>, Int<3>>"));
    }
  }

  #[test]
  fn children_keep_their_order_and_nesting() {
    let tree = AstNode::binary(
      BinaryOp::Mul,
      int(7),
      AstNode::binary(BinaryOp::Add, int(2), int(3)),
    );
    assert_eq!(
      generate_expr(&tree).unwrap(),
      "Expr<Mul, Int<7>, Expr<Add, Int<2>, Int<3>>>"
    );
  }

  #[test]
  fn division_by_zero_is_left_to_the_compiler() {
    let tree = AstNode::binary(BinaryOp::Div, int(1), int(0));
    assert_eq!(generate_expr(&tree).unwrap(), "Expr<Div, Int<1>, Int<0>>");
  }

  #[test]
  fn literals_must_fit_in_int() {
    assert!(generate_expr(&int(i32::MAX as u64)).is_ok());
    let tree = AstNode::binary(BinaryOp::Add, int(1), int(3_000_000_000));
    let err = generate_expr(&tree).unwrap_err();
    assert!(matches!(
      err,
      CompileError::LiteralOutOfRange { ref literal } if literal == "3000000000"
    ));
  }

  #[test]
  fn hand_built_trees_are_depth_checked() {
    let mut tree = int(1);
    for _ in 1..MAX_DEPTH {
      tree = AstNode::binary(BinaryOp::Add, tree, int(1));
    }
    assert!(generate_expr(&tree).is_ok());

    let tree = AstNode::binary(BinaryOp::Add, tree, int(1));
    let err = generate_expr(&tree).unwrap_err();
    assert!(matches!(err, CompileError::TooDeep { limit: MAX_DEPTH }));
  }

  #[test]
  fn program_binds_expr_type_and_prints_result() {
    let program = build_program("Int<5>", &ProgramOptions::default());
    assert!(program.starts_with("#include \"meta_func.hpp\"\n#include <iostream>\n"));
    assert!(program.contains("using ExprType = Int<5>;\n"));
    assert!(program.contains("constexpr int result = Eval<ExprType>::result::value;\n"));
    assert!(program.contains("std::cout << \"Result: \" << result << std::endl;"));
    assert!(!program.contains("Press Enter"));
  }

  #[test]
  fn program_options_change_header_and_pause() {
    let options = ProgramOptions {
      header: "tmp/meta.hpp".to_string(),
      pause_on_exit: true,
    };
    let program = build_program("Int<1>", &options);
    assert!(program.starts_with("#include \"tmp/meta.hpp\"\n"));
    assert!(program.contains("#include <limits>\n"));
    assert!(program.contains("Press Enter to exit..."));
    assert!(program.contains(
      "std::cin.ignore(std::numeric_limits<std::streamsize>::max(), '\\n');"
    ));
  }

  #[test]
  fn header_declares_every_tag_type() {
    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
      assert!(META_FUNC_HPP.contains(&format!("struct {};", op.type_name())));
    }
    assert!(META_FUNC_HPP.contains("struct Eval<Int<N>>"));
  }

  #[test]
  fn header_keeps_the_list_helpers() {
    let helpers = [
      "struct Apply",
      "struct Compose",
      "struct Map",
      "struct Tessellate",
      "struct At",
    ];
    for helper in helpers {
      assert!(META_FUNC_HPP.contains(helper), "missing {helper}");
    }
    assert!(META_FUNC_HPP.contains("void print_result()"));
  }
}
