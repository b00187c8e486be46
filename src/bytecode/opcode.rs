macro_rules! op_codes {
  ($($variant:ident => $name:literal),* $(,)?) => {
    /// One opcode per instruction; every instruction is an `(op, arg)`
    /// pair even when the argument is unused.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    #[repr(u8)]
    pub enum OpCode {
      $($variant),*
    }

    impl OpCode {
      pub fn name(&self) -> &'static str {
        match self {
          $(OpCode::$variant => $name),*
        }
      }
    }
  };
}

op_codes! {
  Nop => "NOP",
  Push => "PUSH",
  PushFalse => "PUSH_FALSE",
  PushTrue => "PUSH_TRUE",
  PushConst => "PUSH_CONST",
  Load => "LOAD",
  Store => "STORE",
  LoadUp => "LOAD_UP",
  StoreUp => "STORE_UP",
  Add => "ADD",
  Sub => "SUB",
  Mul => "MUL",
  Div => "DIV",
  Mod => "MOD",
  Pow => "POW",
  Inc => "INC",
  Dec => "DEC",
  Neg => "NEG",
  Eq => "EQ",
  Neq => "NEQ",
  Gt => "GT",
  Gte => "GTE",
  Lt => "LT",
  Lte => "LTE",
  Cmp => "CMP",
  And => "AND",
  Or => "OR",
  Not => "NOT",
  Band => "BAND",
  Bor => "BOR",
  Bnot => "BNOT",
  Xor => "XOR",
  Lsh => "LSH",
  Rsh => "RSH",
  Getg => "GETG",
  Getp => "GETP",
  Close => "CLOSE",
  Call => "CALL",
  Return => "RETURN",
  Jump => "JUMP",
  JumpIf => "JUMP_IF",
  MakeArray => "MAKE_ARRAY",
  MakeTable => "MAKE_TABLE",
  CellNew => "CELL_NEW",
  CellGet => "CELL_GET",
  CellSet => "CELL_SET",
}

impl OpCode {
  pub fn has_arg(&self) -> bool {
    matches!(
      self,
      OpCode::Push
        | OpCode::PushConst
        | OpCode::Load
        | OpCode::Store
        | OpCode::LoadUp
        | OpCode::StoreUp
        | OpCode::Close
        | OpCode::Call
        | OpCode::Return
        | OpCode::Jump
        | OpCode::JumpIf
        | OpCode::MakeArray
        | OpCode::MakeTable
        | OpCode::CellNew
    )
  }
}

/// A single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Op {
  pub code: OpCode,
  pub arg: i16,
}

impl Op {
  pub fn new(code: OpCode, arg: i16) -> Self {
    Self { code, arg }
  }
}
