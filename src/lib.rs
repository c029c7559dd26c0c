//! Crate root: wires together the compilation pipeline.
//!
//! An arithmetic expression is compiled into a C++ program whose value is
//! computed by the C++ compiler during template instantiation:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the expression AST.
//! - `ast` holds the tree shared by the parser and the generator.
//! - `codegen` lowers the tree into nested template types and wraps them in a program.
//! - `driver` writes, compiles and runs generated programs with an external compiler.
//! - `error` centralises the error type shared by the other modules.

pub mod ast;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod parser;
pub mod tokenizer;

use log::debug;

pub use ast::{AstNode, BinaryOp};
pub use codegen::ProgramOptions;
pub use error::{CompileError, CompileResult};
pub use parser::TrailingTokens;
pub use tokenizer::{LexMode, Token};

/// Front-end settings for one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
  pub lex_mode: LexMode,
  pub trailing: TrailingTokens,
  pub program: ProgramOptions,
}

impl Options {
  /// Reject unknown characters and unconsumed tokens.
  pub fn strict() -> Self {
    Self {
      lex_mode: LexMode::Strict,
      trailing: TrailingTokens::Reject,
      ..Self::default()
    }
  }
}

/// Tokenize, parse and lower an expression into its template type.
pub fn lower_expr(expr: &str, options: &Options) -> CompileResult<String> {
  let tokens = tokenizer::tokenize_with(expr, options.lex_mode)?;
  let ast = parser::parse_with(&tokens, options.trailing)?;
  debug!("parsed {expr:?} as {}", ast.outline());
  codegen::generate_expr(&ast)
}

/// Compile an expression into a complete C++ program with default settings.
pub fn generate_program(expr: &str) -> CompileResult<String> {
  generate_program_with(expr, &Options::default())
}

/// Compile an expression into a complete C++ program.
pub fn generate_program_with(expr: &str, options: &Options) -> CompileResult<String> {
  let code = lower_expr(expr, options)?;
  Ok(codegen::build_program(&code, &options.program))
}
