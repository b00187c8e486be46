use indexmap::IndexMap;

use crate::bytecode::{Op, OpCode};
use crate::object::{Function, Gc};
use crate::syntax::ast::{Block, Func, Module, Node, ScopeId, Slot};
use crate::syntax::lexer::{Literal, Token, TokenKind};
use crate::value::Value;
use crate::vm::Vm;

/// Lower a parsed module into `entry`, a function of arity 0 whose body
/// is the program. If the top level declares `main`, the entry function
/// returns it so the embedder can invoke it with arguments.
pub fn emit(vm: &mut Vm, module: &Module<'_>, entry: Gc<Function>) {
  let mut compiler = Compiler { vm, module };
  compiler.entry(entry);
}

struct Compiler<'a, 'src> {
  vm: &'a mut Vm,
  module: &'a Module<'src>,
}

/// Per-function emission state: the target function and its constant
/// pool, deduplicated by value bit pattern.
struct FnCtx {
  fun: Gc<Function>,
  constants: IndexMap<u64, i16>,
  // highest patched jump target; a block whose end is a jump target
  // still needs a final RETURN for the jump to land on
  last_patch_target: usize,
}

impl FnCtx {
  fn new(fun: Gc<Function>) -> Self {
    Self {
      fun,
      constants: IndexMap::new(),
      last_patch_target: usize::MAX,
    }
  }
}

impl<'a, 'src> Compiler<'a, 'src> {
  fn entry(&mut self, entry: Gc<Function>) {
    let mut ctx = FnCtx::new(entry);
    let module = self.module;
    let Node::Block(block) = &module.root else {
      unreachable!("the root node is a block");
    };
    for child in &block.body {
      self.node(&mut ctx, child, block.scope);
    }

    if self.needs_return(&ctx) {
      match self.find_main(block.scope) {
        Some((slot, captured)) => {
          self.op(&mut ctx, OpCode::Load, slot as i16);
          if captured {
            self.op0(&mut ctx, OpCode::CellGet);
          }
          self.op(&mut ctx, OpCode::Return, 1);
        }
        None => self.op(&mut ctx, OpCode::Return, 0),
      }
    }
  }

  /// The top-level `main` declaration, if any.
  fn find_main(&self, scope: ScopeId) -> Option<(u16, bool)> {
    let scope = self.module.scopes.get(scope);
    for (slot, local) in scope.locals.iter().enumerate() {
      if self.module.identifier_name(&local.token) == "main" {
        return Some((slot as u16, local.captured));
      }
    }
    None
  }

  // Emission helpers ---------------------------------------------------------

  fn op(&mut self, ctx: &mut FnCtx, code: OpCode, arg: i16) {
    ctx.fun.compiled_mut().code.push(Op::new(code, arg));
  }

  fn op0(&mut self, ctx: &mut FnCtx, code: OpCode) {
    self.op(ctx, code, 0)
  }

  fn ends_with_return(&self, ctx: &FnCtx) -> bool {
    ctx
      .fun
      .compiled()
      .code
      .last()
      .map(|op| op.code == OpCode::Return)
      .unwrap_or(false)
  }

  /// A block needs a trailing `RETURN 0` unless its last op already
  /// returns, and that return is not the target of a pending jump.
  fn needs_return(&self, ctx: &FnCtx) -> bool {
    !self.ends_with_return(ctx) || ctx.last_patch_target == ctx.fun.compiled().code.len()
  }

  /// Emit a jump with a placeholder offset; [`Self::patch_jump`] fills it
  /// in once the target is known.
  fn jump(&mut self, ctx: &mut FnCtx, code: OpCode) -> usize {
    let at = ctx.fun.compiled().code.len();
    self.op(ctx, code, 0);
    at
  }

  /// Point the jump at `at` to the current end of the code, PC-relative.
  fn patch_jump(&mut self, ctx: &mut FnCtx, at: usize) {
    let target = ctx.fun.compiled().code.len();
    ctx.fun.compiled_mut().code[at].arg = (target - at) as i16;
    ctx.last_patch_target = target;
  }

  /// Pool index of `value`, deduplicated by bit equality.
  fn constant(&mut self, ctx: &mut FnCtx, value: Value) -> i16 {
    if let Some(&index) = ctx.constants.get(&value.bits()) {
      return index;
    }
    let mut fun = ctx.fun;
    fun.compiled_mut().constants.push(value);
    let index = (fun.compiled().constants.len() - 1) as i16;
    ctx.constants.insert(value.bits(), index);
    index
  }

  fn resolve(&self, scope: ScopeId, token: Token) -> Option<Slot> {
    self.module.scopes.resolve(scope, token)
  }

  // Lowering -----------------------------------------------------------------

  fn node(&mut self, ctx: &mut FnCtx, node: &Node, scope: ScopeId) {
    match node {
      Node::Binary(n) if n.op == TokenKind::Op_Equal => self.assign(ctx, &n.lhs, &n.rhs, scope),
      Node::Binary(n) => {
        // operands pop in reverse
        self.node(ctx, &n.rhs, scope);
        self.node(ctx, &n.lhs, scope);
        self.op0(ctx, binary_op(n.op));
      }
      Node::Block(n) => {
        for child in &n.body {
          self.node(ctx, child, n.scope);
        }
        if self.needs_return(ctx) {
          self.op(ctx, OpCode::Return, 0);
        }
      }
      Node::Branch(n) => {
        self.node(ctx, &n.condition, scope);
        let if_jump = self.jump(ctx, OpCode::JumpIf);
        self.node(ctx, &n.consequent, scope);
        if self.ends_with_return(ctx) {
          // the consequent returned; no jump over the alternate needed
          self.patch_jump(ctx, if_jump);
          if let Some(alternate) = &n.alternate {
            self.node(ctx, alternate, scope);
          }
        } else {
          let else_jump = self.jump(ctx, OpCode::Jump);
          self.patch_jump(ctx, if_jump);
          if let Some(alternate) = &n.alternate {
            self.node(ctx, alternate, scope);
          }
          self.patch_jump(ctx, else_jump);
        }
      }
      Node::Call(n) => {
        for argument in n.arguments.iter().rev() {
          self.node(ctx, argument, scope);
        }
        self.node(ctx, &n.callee, scope);
        self.op(ctx, OpCode::Call, n.arguments.len() as i16);
      }
      Node::Func(n) => self.function(ctx, n, scope),
      Node::Ident(token) => self.identifier(ctx, *token, scope),
      Node::Literal(token) => self.literal(ctx, *token),
      Node::Property(n) => {
        let name = self.module.identifier_name(&n.name);
        let name = self.vm.new_string(name);
        let index = self.constant(ctx, Value::object(name));
        self.op(ctx, OpCode::PushConst, index);
        self.node(ctx, &n.lhs, scope);
        self.op0(ctx, OpCode::Getp);
      }
      Node::Return(n) => {
        if let Some(expression) = &n.expression {
          self.node(ctx, expression, scope);
        }
        self.op(ctx, OpCode::Return, n.expression.is_some() as i16);
      }
      Node::Unary(n) => {
        self.node(ctx, &n.lhs, scope);
        self.op0(ctx, unary_op(n.op));
      }
      Node::VarDecl(n) => {
        let Some(Slot::Local { slot, captured }) = self.resolve(scope, n.identifier) else {
          unreachable!("the parser declares every var-decl in its own scope");
        };
        self.node(ctx, &n.initializer, scope);
        self.op(ctx, OpCode::Store, slot as i16);
        if captured {
          self.op(ctx, OpCode::CellNew, slot as i16);
        }
      }
    }
  }

  /// Expression-position assignment. Plain locals keep the peek-then-store
  /// `STORE`; captured locals and upvalues store through their cell, which
  /// also leaves the value on the stack.
  fn assign(&mut self, ctx: &mut FnCtx, lhs: &Node, rhs: &Node, scope: ScopeId) {
    let Node::Ident(target) = lhs else {
      unreachable!("the parser validates assignment targets");
    };
    self.node(ctx, rhs, scope);
    match self.resolve(scope, *target) {
      Some(Slot::Local {
        slot,
        captured: false,
      }) => self.op(ctx, OpCode::Store, slot as i16),
      Some(Slot::Local {
        slot,
        captured: true,
      }) => {
        self.op(ctx, OpCode::Load, slot as i16);
        self.op0(ctx, OpCode::CellSet);
      }
      Some(Slot::Upvalue(slot)) => {
        self.op(ctx, OpCode::LoadUp, slot as i16);
        self.op0(ctx, OpCode::CellSet);
      }
      None => unreachable!("the parser rejects assignment to undeclared variables"),
    }
  }

  fn function(&mut self, ctx: &mut FnCtx, func: &Func, scope: ScopeId) {
    let inner = self.vm.new_function(func.parameters.len() as u8);
    let index = self.constant(ctx, Value::object(inner));

    let Node::Block(body) = &func.body else {
      unreachable!("a function body is a block");
    };

    // compile the body into its own code buffer
    let mut inner_ctx = FnCtx::new(inner);
    self.box_captured_parameters(&mut inner_ctx, body, func.parameters.len());
    self.node(&mut inner_ctx, &func.body, body.scope);

    // materialise captures: load each one raw from the enclosing frame
    // so closure and frame share the same cell
    let module = self.module;
    let upvalues = &module.scopes.get(body.scope).upvalues;
    if upvalues.is_empty() {
      self.op(ctx, OpCode::PushConst, index);
      return;
    }
    for i in (0..upvalues.len()).rev() {
      match self.resolve(scope, upvalues[i]) {
        Some(Slot::Local { slot, .. }) => self.op(ctx, OpCode::Load, slot as i16),
        Some(Slot::Upvalue(slot)) => self.op(ctx, OpCode::LoadUp, slot as i16),
        None => unreachable!("captures resolve in the enclosing scope"),
      }
    }
    self.op(ctx, OpCode::PushConst, index);
    self.op(ctx, OpCode::Close, upvalues.len() as i16);
  }

  /// Captured parameters are boxed on entry, before anything can close
  /// over them.
  fn box_captured_parameters(&mut self, ctx: &mut FnCtx, body: &Block, arity: usize) {
    let module = self.module;
    let scope = module.scopes.get(body.scope);
    for slot in 0..arity.min(scope.locals.len()) {
      if scope.locals[slot].captured {
        self.op(ctx, OpCode::CellNew, slot as i16);
      }
    }
  }

  fn identifier(&mut self, ctx: &mut FnCtx, token: Token, scope: ScopeId) {
    match self.resolve(scope, token) {
      Some(Slot::Local { slot, captured }) => {
        self.op(ctx, OpCode::Load, slot as i16);
        if captured {
          self.op0(ctx, OpCode::CellGet);
        }
      }
      Some(Slot::Upvalue(slot)) => {
        self.op(ctx, OpCode::LoadUp, slot as i16);
        self.op0(ctx, OpCode::CellGet);
      }
      None => {
        // not a local anywhere: defer to the global table
        let name = self.module.identifier_name(&token);
        let name = self.vm.new_string(name);
        let index = self.constant(ctx, Value::object(name));
        self.op(ctx, OpCode::PushConst, index);
        self.op0(ctx, OpCode::Getg);
      }
    }
  }

  fn literal(&mut self, ctx: &mut FnCtx, token: Token) {
    match token.kind {
      TokenKind::Lit_Null => self.op(ctx, OpCode::Push, 1),
      TokenKind::Lit_False => self.op0(ctx, OpCode::PushFalse),
      TokenKind::Lit_True => self.op0(ctx, OpCode::PushTrue),
      TokenKind::Lit_Number => {
        let Literal::Number(number) = self.module.literals[token.index as usize] else {
          unreachable!("number tokens index number literals");
        };
        let index = self.constant(ctx, Value::number(number));
        self.op(ctx, OpCode::PushConst, index);
      }
      TokenKind::Lit_String => {
        let Literal::Str(s) = self.module.literals[token.index as usize] else {
          unreachable!("string tokens index string literals");
        };
        let string = self.vm.new_string(s);
        let index = self.constant(ctx, Value::object(string));
        self.op(ctx, OpCode::PushConst, index);
      }
      _ => unreachable!("not a literal token"),
    }
  }
}

/// Binary operator token to opcode.
fn binary_op(token: TokenKind) -> OpCode {
  match token {
    TokenKind::Op_Plus => OpCode::Add,
    TokenKind::Op_Minus => OpCode::Sub,
    TokenKind::Op_Star => OpCode::Mul,
    TokenKind::Op_Slash => OpCode::Div,
    TokenKind::Op_Percent => OpCode::Mod,
    TokenKind::Op_StarStar => OpCode::Pow,
    TokenKind::Op_Pipe => OpCode::Bor,
    TokenKind::Op_Amp => OpCode::Band,
    TokenKind::Op_Caret => OpCode::Xor,
    TokenKind::Op_LessLess => OpCode::Lsh,
    TokenKind::Op_MoreMore => OpCode::Rsh,
    TokenKind::Op_EqualEqual => OpCode::Eq,
    TokenKind::Op_BangEqual => OpCode::Neq,
    TokenKind::Op_More => OpCode::Gt,
    TokenKind::Op_MoreEqual => OpCode::Gte,
    TokenKind::Op_Less => OpCode::Lt,
    TokenKind::Op_LessEqual => OpCode::Lte,
    TokenKind::Op_LessEqualMore => OpCode::Cmp,
    TokenKind::Op_AmpAmp => OpCode::And,
    TokenKind::Op_PipePipe => OpCode::Or,
    _ => unreachable!("not a binary operator: {token:?}"),
  }
}

fn unary_op(token: TokenKind) -> OpCode {
  match token {
    TokenKind::Op_Bang => OpCode::Not,
    TokenKind::Op_Minus => OpCode::Neg,
    TokenKind::Op_Tilde => OpCode::Bnot,
    TokenKind::Op_PlusPlus => OpCode::Inc,
    TokenKind::Op_MinusMinus => OpCode::Dec,
    _ => unreachable!("not a unary operator: {token:?}"),
  }
}

#[cfg(test)]
mod tests;
