pub mod ast;
pub mod lexer;
mod parser;

use std::fmt::Display;

pub use ast::{Module, Node, ScopeId, Scopes, Slot};
pub use lexer::{Lexer, Token, TokenKind};

use parser::Parser;

/// A lex or parse diagnostic. The position is baked into the message the
/// way the error handler expects to receive it.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
  pub message: String,
  pub line: u32,
  pub column: u32,
}

impl SyntaxError {
  pub(crate) fn lex(module: &str, line: u32, column: u32, what: impl Display) -> Self {
    Self {
      message: format!("lex error in {module} at {line},{column}: {what}"),
      line,
      column,
    }
  }

  pub(crate) fn parse(module: &str, line: u32, column: u32, what: impl Display) -> Self {
    Self {
      message: format!("parse error in {module} at {line},{column}: {what}"),
      line,
      column,
    }
  }
}

/// Parse `source` into a [`Module`].
///
/// On failure every collected diagnostic is returned, lex errors
/// included, so more than one problem can surface per run.
pub fn parse<'src>(source: &'src str, module: &'src str) -> Result<Module<'src>, Vec<SyntaxError>> {
  let mut parser = Parser::new(source, module);
  let root = parser.root();

  let mut errors = std::mem::take(&mut parser.lex.errors);
  errors.append(&mut parser.errors);

  match root {
    Ok(root) if errors.is_empty() => Ok(Module {
      root,
      scopes: parser.scopes,
      identifiers: parser.lex.identifiers,
      literals: parser.lex.literals,
    }),
    _ => Err(errors),
  }
}
