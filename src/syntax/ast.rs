use std::fmt::Write;

use super::lexer::{token_equals, Identifier, Literal, Token, TokenKind};
use crate::buffer::Buffer;

/// A parsed module: the root block, the scope arena, and the lexer's side
/// tables, which the compiler consults for identifier names and literal
/// values.
pub struct Module<'src> {
  pub root: Node,
  pub scopes: Scopes,
  pub identifiers: Buffer<Identifier<'src>>,
  pub literals: Buffer<Literal<'src>>,
}

pub enum Node {
  Binary(Box<Binary>),
  Block(Box<Block>),
  Branch(Box<Branch>),
  Call(Box<Call>),
  Func(Box<Func>),
  Ident(Token),
  Literal(Token),
  Property(Box<Property>),
  Return(Box<Return>),
  Unary(Box<Unary>),
  VarDecl(Box<VarDecl>),
}

pub struct Binary {
  pub op: TokenKind,
  pub lhs: Node,
  pub rhs: Node,
}

pub struct Block {
  pub body: Vec<Node>,
  pub scope: ScopeId,
}

pub struct Branch {
  pub condition: Node,
  pub consequent: Node,
  pub alternate: Option<Node>,
}

pub struct Call {
  pub callee: Node,
  pub arguments: Vec<Node>,
}

pub struct Func {
  pub parameters: Buffer<Token>,
  pub body: Node,
}

pub struct Property {
  pub op: TokenKind,
  pub lhs: Node,
  pub name: Token,
}

pub struct Return {
  pub expression: Option<Node>,
}

pub struct Unary {
  pub op: TokenKind,
  pub lhs: Node,
}

pub struct VarDecl {
  pub identifier: Token,
  pub initializer: Node,
}

pub fn binary(op: TokenKind, lhs: Node, rhs: Node) -> Node {
  Node::Binary(Box::new(Binary { op, lhs, rhs }))
}

pub fn block(body: Vec<Node>, scope: ScopeId) -> Node {
  Node::Block(Box::new(Block { body, scope }))
}

pub fn branch(condition: Node, consequent: Node, alternate: Option<Node>) -> Node {
  Node::Branch(Box::new(Branch {
    condition,
    consequent,
    alternate,
  }))
}

pub fn call(callee: Node, arguments: Vec<Node>) -> Node {
  Node::Call(Box::new(Call { callee, arguments }))
}

pub fn func(parameters: Buffer<Token>, body: Node) -> Node {
  Node::Func(Box::new(Func { parameters, body }))
}

pub fn ident(token: Token) -> Node {
  Node::Ident(token)
}

pub fn literal(token: Token) -> Node {
  Node::Literal(token)
}

pub fn property(op: TokenKind, lhs: Node, name: Token) -> Node {
  Node::Property(Box::new(Property { op, lhs, name }))
}

pub fn return_stmt(expression: Option<Node>) -> Node {
  Node::Return(Box::new(Return { expression }))
}

pub fn unary(op: TokenKind, lhs: Node) -> Node {
  Node::Unary(Box::new(Unary { op, lhs }))
}

pub fn var_decl(identifier: Token, initializer: Node) -> Node {
  Node::VarDecl(Box::new(VarDecl {
    identifier,
    initializer,
  }))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeId(u32);

pub struct Local {
  pub token: Token,
  pub captured: bool,
}

/// One lexical scope. A scope is a "boundary" when it is a function body;
/// boundary scopes accumulate upvalues, plain block scopes forward
/// lookups to their parent untouched since they share the enclosing
/// frame's slots.
pub struct Scope {
  pub parent: Option<ScopeId>,
  pub boundary: bool,
  pub locals: Buffer<Local>,
  pub upvalues: Buffer<Token>,
}

/// Where an identifier resolved: a frame slot or a capture index.
/// Unresolved identifiers fall through to the global table at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
  Local { slot: u16, captured: bool },
  Upvalue(u16),
}

#[derive(Default)]
pub struct Scopes {
  scopes: Vec<Scope>,
}

impl Scopes {
  pub fn new() -> Self {
    Self { scopes: Vec::new() }
  }

  pub fn push(&mut self, parent: Option<ScopeId>, boundary: bool) -> ScopeId {
    self.scopes.push(Scope {
      parent,
      boundary,
      locals: Buffer::new(),
      upvalues: Buffer::new(),
    });
    ScopeId((self.scopes.len() - 1) as u32)
  }

  pub fn get(&self, id: ScopeId) -> &Scope {
    &self.scopes[id.0 as usize]
  }

  /// Declare `token` as a local of `id` and return its slot, or `None`
  /// if an identical token is already declared there.
  pub fn add_local(&mut self, id: ScopeId, token: Token) -> Option<u16> {
    let scope = &mut self.scopes[id.0 as usize];
    if scope
      .locals
      .iter()
      .any(|l| token_equals(&l.token, &token))
    {
      return None;
    }
    scope.locals.push(Local {
      token,
      captured: false,
    });
    Some((scope.locals.len() - 1) as u16)
  }

  /// Parse-time resolution. Searches this scope's locals and upvalues,
  /// then the parent chain; a hit across a function boundary is recorded
  /// as an upvalue of that function and the origin local is marked
  /// captured. The capture is transitive through nested functions.
  pub fn find_local_or_upvalue(&mut self, id: ScopeId, token: Token) -> Option<Slot> {
    self.find_inner(id, token).map(|(slot, _)| slot)
  }

  fn find_inner(&mut self, id: ScopeId, token: Token) -> Option<(Slot, ScopeId)> {
    let scope = &self.scopes[id.0 as usize];
    if let Some(i) = scope
      .locals
      .iter()
      .position(|l| token_equals(&l.token, &token))
    {
      let captured = scope.locals[i].captured;
      return Some((
        Slot::Local {
          slot: i as u16,
          captured,
        },
        id,
      ));
    }
    if let Some(i) = scope.upvalues.iter().position(|u| token_equals(u, &token)) {
      return Some((Slot::Upvalue(i as u16), id));
    }

    let parent = scope.parent?;
    let (found, owner) = self.find_inner(parent, token)?;
    if !self.scopes[id.0 as usize].boundary {
      return Some((found, owner));
    }

    // crossing a function boundary: the variable becomes a capture
    if let Slot::Local { slot, .. } = found {
      self.scopes[owner.0 as usize].locals[slot as usize].captured = true;
    }
    let scope = &mut self.scopes[id.0 as usize];
    scope.upvalues.push(token);
    Some((Slot::Upvalue((scope.upvalues.len() - 1) as u16), id))
  }

  /// Compile-time resolution: read-only, walks up to (and including) the
  /// nearest function boundary. Upvalues were fully collected at parse
  /// time, so anything not found here is a global.
  pub fn resolve(&self, id: ScopeId, token: Token) -> Option<Slot> {
    let scope = &self.scopes[id.0 as usize];
    if let Some(i) = scope
      .locals
      .iter()
      .position(|l| token_equals(&l.token, &token))
    {
      return Some(Slot::Local {
        slot: i as u16,
        captured: scope.locals[i].captured,
      });
    }
    if let Some(i) = scope.upvalues.iter().position(|u| token_equals(u, &token)) {
      return Some(Slot::Upvalue(i as u16));
    }
    if scope.boundary {
      return None;
    }
    self.resolve(scope.parent?, token)
  }
}

impl<'src> Module<'src> {
  pub fn identifier_name(&self, token: &Token) -> &'src str {
    self.identifiers[token.index as usize].name
  }

  /// Debug dump of the tree, one node per line.
  pub fn dump(&self) -> String {
    let mut out = String::new();
    self.dump_node(&mut out, &self.root, 0);
    out
  }

  fn dump_node(&self, out: &mut String, node: &Node, depth: usize) {
    let _ = write!(out, "{:width$}", "", width = depth * 2);
    match node {
      Node::Binary(n) => {
        let _ = writeln!(out, "BINARY ({})", n.op.name());
        self.dump_node(out, &n.lhs, depth + 1);
        self.dump_node(out, &n.rhs, depth + 1);
      }
      Node::Block(n) => {
        let scope = self.scopes.get(n.scope);
        let locals: Vec<_> = scope
          .locals
          .iter()
          .map(|l| self.identifier_name(&l.token))
          .collect();
        let upvalues: Vec<_> = scope
          .upvalues
          .iter()
          .map(|u| self.identifier_name(u))
          .collect();
        let _ = writeln!(
          out,
          "BLOCK ({}) [{}] [{}]",
          n.body.len(),
          locals.join(", "),
          upvalues.join(", ")
        );
        for child in &n.body {
          self.dump_node(out, child, depth + 1);
        }
      }
      Node::Branch(n) => {
        let _ = writeln!(out, "BRANCH");
        self.dump_node(out, &n.condition, depth + 1);
        self.dump_node(out, &n.consequent, depth + 1);
        if let Some(alternate) = &n.alternate {
          self.dump_node(out, alternate, depth + 1);
        }
      }
      Node::Call(n) => {
        let _ = writeln!(out, "CALL");
        self.dump_node(out, &n.callee, depth + 1);
        for argument in &n.arguments {
          self.dump_node(out, argument, depth + 1);
        }
      }
      Node::Func(n) => {
        let parameters: Vec<_> = n
          .parameters
          .iter()
          .map(|p| self.identifier_name(p))
          .collect();
        let _ = writeln!(out, "FUNCTION ({})", parameters.join(", "));
        self.dump_node(out, &n.body, depth + 1);
      }
      Node::Ident(token) => {
        let _ = writeln!(out, "IDENTIFIER {}", self.identifier_name(token));
      }
      Node::Literal(token) => match token.kind {
        TokenKind::Lit_Number => {
          let Literal::Number(n) = self.literals[token.index as usize] else {
            unreachable!()
          };
          let _ = writeln!(out, "LITERAL {n}");
        }
        TokenKind::Lit_String => {
          let Literal::Str(s) = self.literals[token.index as usize] else {
            unreachable!()
          };
          let _ = writeln!(out, "LITERAL {s:?}");
        }
        _ => {
          let _ = writeln!(out, "LITERAL {}", token.kind.name());
        }
      },
      Node::Property(n) => {
        let _ = writeln!(
          out,
          "PROPERTY ({}) {}",
          n.op.name(),
          self.identifier_name(&n.name)
        );
        self.dump_node(out, &n.lhs, depth + 1);
      }
      Node::Return(n) => {
        let _ = writeln!(out, "RETURN");
        if let Some(expression) = &n.expression {
          self.dump_node(out, expression, depth + 1);
        }
      }
      Node::Unary(n) => {
        let _ = writeln!(out, "UNARY ({})", n.op.name());
        self.dump_node(out, &n.lhs, depth + 1);
      }
      Node::VarDecl(n) => {
        let _ = writeln!(out, "VAR_DECL {}", self.identifier_name(&n.identifier));
        self.dump_node(out, &n.initializer, depth + 1);
      }
    }
  }
}
