use std::fmt::Display;

use super::ast::{self, Node, ScopeId, Scopes};
use super::lexer::{Lexer, Token, TokenKind};
use super::SyntaxError;
use crate::buffer::Buffer;

use TokenKind::*;

/// Marker for an already-reported parse failure; the diagnostics live in
/// `Parser::errors`.
pub(super) struct Fail;

type PResult<T> = Result<T, Fail>;

/// Precedence ladder, lowest binds loosest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
  Lowest,
  Assigns,     // =
  Ternary,     // ?
  Coalesce,    // ?? ?:
  BoolOr,      // ||
  BoolAnd,     // &&
  BitOr,       // |
  BitXor,      // ^
  BitAnd,      // &
  Equalities,  // == !=
  Comparisons, // < <= > >= <=>
  Shifts,      // << >>
  Range,       // .. ...
  Terms,       // + -
  Factors,     // * / %
  Power,       // **
  Unaries,     // ! - ~
  Updates,     // ++ --
  Properties,  // . ?. ( [
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Assoc {
  Left,
  Right,
}

struct Rule<'src> {
  prec: Prec,
  assoc: Assoc,
  prefix: Option<fn(&mut Parser<'src>) -> PResult<Node>>,
  infix: Option<fn(&mut Parser<'src>, Node) -> PResult<Node>>,
}

impl<'src> Rule<'src> {
  const fn none() -> Self {
    Rule {
      prec: Prec::Lowest,
      assoc: Assoc::Left,
      prefix: None,
      infix: None,
    }
  }

  const fn prefix(f: fn(&mut Parser<'src>) -> PResult<Node>) -> Self {
    Rule {
      prec: Prec::Lowest,
      assoc: Assoc::Right,
      prefix: Some(f),
      infix: None,
    }
  }

  const fn infix(prec: Prec, assoc: Assoc, f: fn(&mut Parser<'src>, Node) -> PResult<Node>) -> Self {
    Rule {
      prec,
      assoc,
      prefix: None,
      infix: Some(f),
    }
  }

  /// An operator that only exists in the precedence table; using it in
  /// an expression is "expected expression".
  const fn reserved(prec: Prec, assoc: Assoc) -> Self {
    Rule {
      prec,
      assoc,
      prefix: None,
      infix: None,
    }
  }
}

fn rule<'src>(kind: TokenKind) -> Rule<'src> {
  use Assoc::*;
  use Prec::*;
  match kind {
    Op_Amp => Rule::infix(BitAnd, Left, Parser::binary),
    Op_AmpAmp => Rule::infix(BoolAnd, Left, Parser::binary),
    Op_AmpAmpEqual | Op_AmpEqual => Rule::reserved(Assigns, Right),
    Op_Star => Rule::infix(Factors, Left, Parser::binary),
    Op_StarStar => Rule::infix(Power, Right, Parser::binary),
    Op_StarStarEqual | Op_StarEqual => Rule::reserved(Assigns, Right),
    Op_Caret => Rule::infix(BitXor, Left, Parser::binary),
    Op_CaretEqual => Rule::reserved(Assigns, Right),
    Op_Dot => Rule::infix(Properties, Left, Parser::property),
    Op_DotDot | Op_DotDotDot => Rule::reserved(Range, Left),
    Op_Equal => Rule::infix(Assigns, Right, Parser::assign),
    Op_EqualEqual => Rule::infix(Equalities, Left, Parser::binary),
    Op_Bang => Rule::prefix(Parser::unary),
    Op_BangEqual => Rule::infix(Equalities, Left, Parser::binary),
    Lit_False | Lit_True | Lit_Null | Lit_Number | Lit_String => Rule::prefix(Parser::literal),
    Kw_Fn => Rule::prefix(Parser::function),
    Op_More | Op_MoreEqual => Rule::infix(Comparisons, Left, Parser::binary),
    Op_MoreMore => Rule::infix(Shifts, Left, Parser::binary),
    Op_MoreMoreEqual => Rule::reserved(Assigns, Right),
    Lit_Ident => Rule::prefix(Parser::identifier),
    Brk_SquareL => Rule::reserved(Properties, Left),
    Brk_ParenL => Rule {
      prec: Properties,
      assoc: Left,
      prefix: Some(Parser::grouping),
      infix: Some(Parser::call),
    },
    Op_Less | Op_LessEqual | Op_LessEqualMore => Rule::infix(Comparisons, Left, Parser::binary),
    Op_LessLess => Rule::infix(Shifts, Left, Parser::binary),
    Op_LessLessEqual => Rule::reserved(Assigns, Right),
    Op_Minus => Rule {
      prec: Terms,
      assoc: Left,
      prefix: Some(Parser::unary),
      infix: Some(Parser::binary),
    },
    Op_MinusEqual => Rule::reserved(Assigns, Right),
    Op_MinusMinus => Rule::prefix(Parser::unary),
    Op_Percent => Rule::infix(Factors, Left, Parser::binary),
    Op_PercentEqual => Rule::reserved(Assigns, Right),
    Op_Pipe => Rule::infix(BitOr, Left, Parser::binary),
    Op_PipeEqual => Rule::reserved(Assigns, Right),
    Op_PipePipe => Rule::infix(BoolOr, Left, Parser::binary),
    Op_PipePipeEqual => Rule::reserved(Assigns, Right),
    Op_Plus => Rule::infix(Terms, Left, Parser::binary),
    Op_PlusEqual => Rule::reserved(Assigns, Right),
    Op_PlusPlus => Rule::prefix(Parser::unary),
    Tok_Question => Rule::infix(Ternary, Right, Parser::ternary),
    Op_QuestionColon | Op_QuestionQuestion => Rule::reserved(Coalesce, Left),
    Op_QuestionQuestionEqual => Rule::reserved(Assigns, Right),
    Op_QuestionDot => Rule::infix(Properties, Left, Parser::property),
    Op_Slash => Rule::infix(Factors, Left, Parser::binary),
    Op_SlashEqual => Rule::reserved(Assigns, Right),
    Op_Tilde => Rule::prefix(Parser::unary),
    _ => Rule::none(),
  }
}

pub(super) struct Parser<'src> {
  pub(super) lex: Lexer<'src>,
  pub(super) scopes: Scopes,
  pub(super) errors: Vec<SyntaxError>,
  module: &'src str,
  previous: Token,
  current: Token,
  scope: ScopeId,
}

impl<'src> Parser<'src> {
  pub(super) fn new(source: &'src str, module: &'src str) -> Self {
    let mut lex = Lexer::new(source, module);
    let current = lex.next_token();
    let mut scopes = Scopes::new();
    // the root scope doubles as the entry function's body scope
    let scope = scopes.push(None, true);
    Self {
      lex,
      scopes,
      errors: Vec::new(),
      module,
      previous: current,
      current,
      scope,
    }
  }

  pub(super) fn root(&mut self) -> PResult<Node> {
    let scope = self.scope;
    let mut body = Vec::new();
    while !self.consumes(Tok_Eof) {
      if self.consumes(Tok_Semicolon) {
        continue;
      }
      body.push(self.declaration()?);
    }
    Ok(ast::block(body, scope))
  }

  fn peek(&self) -> TokenKind {
    self.current.kind
  }

  fn consume(&mut self) -> Token {
    self.previous = self.current;
    self.current = self.lex.next_token();
    self.previous
  }

  fn consumes(&mut self, kind: TokenKind) -> bool {
    if self.peek() != kind {
      return false;
    }
    self.consume();
    true
  }

  fn must_consume(&mut self, kind: TokenKind, what: &str) -> PResult<()> {
    if !self.consumes(kind) {
      self.error(format_args!("expected {what}"));
      return Err(Fail);
    }
    Ok(())
  }

  fn error(&mut self, message: impl Display) {
    self.errors.push(SyntaxError::parse(
      self.module,
      self.current.line,
      self.current.column,
      message,
    ));
  }

  fn name(&self, token: &Token) -> &'src str {
    self.lex.identifiers[token.index as usize].name
  }

  // Scopes -------------------------------------------------------------------

  fn begin_scope(&mut self, boundary: bool, parameters: &[Token]) -> PResult<ScopeId> {
    let scope = self.scopes.push(Some(self.scope), boundary);
    self.scope = scope;
    // parameters become locals of the function's own scope; slots are
    // assigned in reverse so that arguments, which are compiled in
    // reverse, bind left to right
    for parameter in parameters.iter().rev() {
      if self.scopes.add_local(scope, *parameter).is_none() {
        self.error(format_args!(
          "duplicate parameter '{}'",
          self.name(parameter)
        ));
        return Err(Fail);
      }
    }
    Ok(scope)
  }

  fn end_scope(&mut self) {
    if let Some(parent) = self.scopes.get(self.scope).parent {
      self.scope = parent;
    }
  }

  // Statements ---------------------------------------------------------------

  fn declaration(&mut self) -> PResult<Node> {
    match self.peek() {
      Kw_Var => self.var_declaration(),
      Kw_Fn => self.fn_statement(),
      _ => self.statement(),
    }
  }

  fn statement(&mut self) -> PResult<Node> {
    match self.peek() {
      Brk_CurlyL => self.block_statement(&[], false),
      Kw_If => self.if_statement(),
      Kw_Return => self.return_statement(),
      _ => self.expression(),
    }
  }

  fn var_declaration(&mut self) -> PResult<Node> {
    self.must_consume(Kw_Var, "'var'")?;
    self.must_consume(Lit_Ident, "identifier after 'var'")?;

    let identifier = self.previous;
    if self.scopes.add_local(self.scope, identifier).is_none() {
      self.error(format_args!(
        "variable '{}' already declared",
        self.name(&identifier)
      ));
      return Err(Fail);
    }

    self.must_consume(Op_Equal, "variable must be initialized")?;
    let initializer = self.expression()?;
    Ok(ast::var_decl(identifier, initializer))
  }

  /// `fn name(params) { … }` declares a variable holding the function;
  /// a nameless `fn` in statement position is just an expression.
  fn fn_statement(&mut self) -> PResult<Node> {
    self.must_consume(Kw_Fn, "'fn'")?;
    if self.peek() != Lit_Ident {
      return self.function_rest();
    }

    let identifier = self.consume();
    if self.scopes.add_local(self.scope, identifier).is_none() {
      self.error(format_args!(
        "variable '{}' already declared",
        self.name(&identifier)
      ));
      return Err(Fail);
    }
    let function = self.function_rest()?;
    Ok(ast::var_decl(identifier, function))
  }

  fn if_statement(&mut self) -> PResult<Node> {
    self.must_consume(Kw_If, "'if'")?;

    let condition = self.expression()?;
    let consequent = self.block_statement(&[], false)?;
    let alternate = if self.consumes(Kw_Else) {
      Some(self.block_statement(&[], false)?)
    } else {
      None
    };

    Ok(ast::branch(condition, consequent, alternate))
  }

  fn return_statement(&mut self) -> PResult<Node> {
    self.must_consume(Kw_Return, "'return'")?;

    let expression = if rule(self.peek()).prefix.is_some() {
      Some(self.expression()?)
    } else {
      None
    };
    Ok(ast::return_stmt(expression))
  }

  fn block_statement(&mut self, parameters: &[Token], boundary: bool) -> PResult<Node> {
    self.must_consume(Brk_CurlyL, "'{' before block statement")?;

    let scope = self.begin_scope(boundary, parameters)?;
    let mut body = Vec::new();
    let mut failed = false;
    while self.peek() != Tok_Eof && self.peek() != Brk_CurlyR {
      if self.consumes(Tok_Semicolon) {
        continue;
      }
      match self.declaration() {
        Ok(node) => body.push(node),
        Err(Fail) => {
          failed = true;
          break;
        }
      }
    }
    self.end_scope();
    if failed {
      return Err(Fail);
    }

    self.must_consume(Brk_CurlyR, "'}' after block statement")?;
    Ok(ast::block(body, scope))
  }

  // Expressions --------------------------------------------------------------

  fn expression(&mut self) -> PResult<Node> {
    self.parse_precedence(Prec::Lowest)
  }

  fn parse_precedence(&mut self, prec: Prec) -> PResult<Node> {
    let Some(prefix) = rule(self.peek()).prefix else {
      self.error("expected expression");
      return Err(Fail);
    };

    let mut node = prefix(self)?;
    loop {
      let next = rule(self.peek());
      let Some(infix) = next.infix else { break };
      if next.prec < prec || (next.prec == prec && next.assoc == Assoc::Left) {
        break;
      }
      node = infix(self, node)?;
    }

    Ok(node)
  }

  fn binary(&mut self, lhs: Node) -> PResult<Node> {
    let op = self.consume();
    let rhs = self.parse_precedence(rule(op.kind).prec)?;
    Ok(ast::binary(op.kind, lhs, rhs))
  }

  /// `target = value`. The target must be a declared local or capture;
  /// there is no global assignment.
  fn assign(&mut self, lhs: Node) -> PResult<Node> {
    let op = self.consume();
    let Node::Ident(target) = &lhs else {
      self.error("invalid assignment target");
      return Err(Fail);
    };
    if self
      .scopes
      .find_local_or_upvalue(self.scope, *target)
      .is_none()
    {
      self.error(format_args!(
        "cannot assign to undefined variable '{}'",
        self.name(target)
      ));
      return Err(Fail);
    }
    let rhs = self.parse_precedence(Prec::Assigns)?;
    Ok(ast::binary(op.kind, lhs, rhs))
  }

  fn unary(&mut self) -> PResult<Node> {
    let op = self.consume();
    let prec = match op.kind {
      Op_PlusPlus | Op_MinusMinus => Prec::Updates,
      _ => Prec::Unaries,
    };
    let lhs = self.parse_precedence(prec)?;
    Ok(ast::unary(op.kind, lhs))
  }

  fn ternary(&mut self, condition: Node) -> PResult<Node> {
    self.must_consume(Tok_Question, "'?'")?;

    let consequent = self.parse_precedence(Prec::Ternary)?;
    self.must_consume(Tok_Colon, "':' in ternary expression")?;
    let alternate = self.parse_precedence(Prec::Ternary)?;

    Ok(ast::branch(condition, consequent, Some(alternate)))
  }

  fn call(&mut self, callee: Node) -> PResult<Node> {
    self.must_consume(Brk_ParenL, "argument list after '('")?;

    let mut arguments = Vec::new();
    while !self.consumes(Brk_ParenR) {
      if !arguments.is_empty() {
        self.must_consume(Tok_Comma, "comma must separate arguments")?;
      }
      arguments.push(self.expression()?);
    }

    Ok(ast::call(callee, arguments))
  }

  fn property(&mut self, lhs: Node) -> PResult<Node> {
    let op = self.consume();
    self.must_consume(Lit_Ident, "identifier after '.'")?;
    Ok(ast::property(op.kind, lhs, self.previous))
  }

  fn grouping(&mut self) -> PResult<Node> {
    self.must_consume(Brk_ParenL, "'('")?;
    let node = self.expression()?;
    self.must_consume(Brk_ParenR, "')' after expression")?;
    Ok(node)
  }

  fn identifier(&mut self) -> PResult<Node> {
    let name = self.consume();
    // resolves locals and wires up captures; anything unresolved is
    // looked up in the global table at run time
    let _ = self.scopes.find_local_or_upvalue(self.scope, name);
    Ok(ast::ident(name))
  }

  fn literal(&mut self) -> PResult<Node> {
    Ok(ast::literal(self.consume()))
  }

  fn function(&mut self) -> PResult<Node> {
    self.must_consume(Kw_Fn, "'fn'")?;
    self.function_rest()
  }

  /// Parses the remainder of a function once `fn` (and an optional name)
  /// has been consumed. `fn(…) => expr` is sugar for `fn(…) { return expr }`.
  fn function_rest(&mut self) -> PResult<Node> {
    self.must_consume(Brk_ParenL, "parameter list after 'fn'")?;

    let mut parameters: Buffer<Token> = Buffer::new();
    while !self.consumes(Brk_ParenR) {
      if !parameters.is_empty() {
        self.must_consume(Tok_Comma, "comma must separate parameters")?;
      }
      self.must_consume(Lit_Ident, "parameter name")?;
      parameters.push(self.previous);
    }

    let body = if self.consumes(Op_Arrow) {
      let scope = self.begin_scope(true, parameters.as_slice())?;
      let result = self.expression();
      self.end_scope();
      ast::block(vec![ast::return_stmt(Some(result?))], scope)
    } else {
      self.block_statement(parameters.as_slice(), true)?
    };

    Ok(ast::func(parameters, body))
  }
}

#[cfg(test)]
mod tests;
