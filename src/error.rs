//! Shared error type for every stage of the pipeline.
//!
//! Front-end failures (lexing, parsing, code generation) abort the current
//! invocation before anything is emitted. Driver failures carry the
//! compiler's or program's stderr untouched so callers can relay it as-is.

use std::process::ExitStatus;
use std::time::Duration;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("invalid character '{ch}' at byte {offset}"))]
  InvalidCharacter { ch: char, offset: usize },

  #[snafu(display("unexpected token \"{found}\" at token {index}"))]
  UnexpectedToken { found: String, index: usize },

  #[snafu(display("expected \")\", but got \"{found}\" at token {index}"))]
  UnmatchedParenthesis { found: String, index: usize },

  #[snafu(display("unexpected trailing token \"{found}\" at token {index}"))]
  TrailingTokens { found: String, index: usize },

  #[snafu(display("unknown operator '{symbol}'"))]
  UnknownOperator { symbol: char },

  #[snafu(display("integer literal {literal} does not fit in a C++ int"))]
  LiteralOutOfRange { literal: String },

  #[snafu(display("expression nests deeper than {limit} levels"))]
  TooDeep { limit: usize },

  #[snafu(display("{context}: {source}"))]
  Io {
    context: String,
    source: std::io::Error,
  },

  #[snafu(display("compiler exited with {status}\n{stderr}"))]
  CompilerFailed { status: ExitStatus, stderr: String },

  #[snafu(display("program exited with {status}\n{stderr}"))]
  ProgramFailed { status: ExitStatus, stderr: String },

  #[snafu(display("{step} timed out after {limit:?}"))]
  Timeout { step: String, limit: Duration },
}
