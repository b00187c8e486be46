use crate::bytecode::OpCode;
use crate::object::{Function, Gc};
use crate::vm::Vm;

fn compile(src: &str) -> (Vm, Gc<Function>) {
  let mut vm = Vm::new(|message| panic!("unexpected error: {message}"));
  let value = vm.compile(src, "test");
  let function = value.to_function().expect("compile returned null");
  (vm, function)
}

fn codes(function: Gc<Function>) -> Vec<(OpCode, i16)> {
  function
    .compiled()
    .code
    .iter()
    .map(|op| (op.code, op.arg))
    .collect()
}

/// Every function in the constant pool tree.
fn all_functions(function: Gc<Function>) -> Vec<Gc<Function>> {
  let mut out = vec![function];
  let mut i = 0;
  while i < out.len() {
    let function = out[i];
    for constant in &function.compiled().constants {
      if let Some(inner) = constant.to_function() {
        out.push(inner);
      }
    }
    i += 1;
  }
  out
}

#[test]
fn number_literal() {
  use OpCode::*;
  let (_vm, f) = compile("7");
  assert_eq!(codes(f), vec![(PushConst, 0), (Return, 0)]);
  assert_eq!(f.compiled().constants[0].to_number(), Some(7.0));
}

#[test]
fn null_is_a_push() {
  use OpCode::*;
  let (_vm, f) = compile("null");
  assert_eq!(codes(f), vec![(Push, 1), (Return, 0)]);
}

#[test]
fn booleans_have_dedicated_ops() {
  use OpCode::*;
  let (_vm, f) = compile("true false");
  assert_eq!(
    codes(f),
    vec![(PushTrue, 0), (PushFalse, 0), (Return, 0)]
  );
}

#[test]
fn binary_compiles_rhs_first() {
  use OpCode::*;
  let (_vm, f) = compile("1 + 2 * 3");
  assert_eq!(
    codes(f),
    vec![
      (PushConst, 0), // 3
      (PushConst, 1), // 2
      (Mul, 0),
      (PushConst, 2), // 1
      (Add, 0),
      (Return, 0),
    ]
  );
  let constants: Vec<_> = f
    .compiled()
    .constants
    .iter()
    .map(|c| c.to_number().unwrap())
    .collect();
  assert_eq!(constants, vec![3.0, 2.0, 1.0]);
}

#[test]
fn constants_are_deduplicated() {
  let (_vm, f) = compile("var a = 7 var b = 7 var c = \"x\" var d = \"x\"");
  // one 7, one "x"
  assert_eq!(f.compiled().constants.len(), 2);
}

#[test]
fn store_is_peek_then_store() {
  use OpCode::*;
  let (_vm, f) = compile("var a = 1 a = 2");
  assert_eq!(
    codes(f),
    vec![
      (PushConst, 0),
      (Store, 0),
      (PushConst, 1),
      (Store, 0),
      (Return, 0),
    ]
  );
}

#[test]
fn branch_with_returning_arms() {
  use OpCode::*;
  let (_vm, f) = compile("if true { return 1 } else { return 2 }");
  assert_eq!(
    codes(f),
    vec![
      (PushTrue, 0),
      (JumpIf, 3),
      (PushConst, 0),
      (Return, 1),
      (PushConst, 1),
      (Return, 1),
    ]
  );
}

#[test]
fn branch_without_else_falls_through_to_return() {
  use OpCode::*;
  let (_vm, f) = compile("if true { return 1 }");
  assert_eq!(
    codes(f),
    vec![
      (PushTrue, 0),
      (JumpIf, 3),
      (PushConst, 0),
      (Return, 1),
      (Return, 0),
    ]
  );
}

#[test]
fn ternary_jumps_over_the_alternate() {
  use OpCode::*;
  let (_vm, f) = compile("true ? 1 : 2");
  assert_eq!(
    codes(f),
    vec![
      (PushTrue, 0),
      (JumpIf, 3),
      (PushConst, 0),
      (Jump, 2),
      (PushConst, 1),
      (Return, 0),
    ]
  );
}

#[test]
fn call_compiles_arguments_in_reverse() {
  use OpCode::*;
  let (_vm, f) = compile("var f = fn(a, b) => a f(1, 2)");
  assert_eq!(
    codes(f),
    vec![
      (PushConst, 0), // the function
      (Store, 0),
      (PushConst, 1), // 2
      (PushConst, 2), // 1
      (Load, 0),
      (Call, 2),
      (Return, 0),
    ]
  );
}

#[test]
fn parameters_bind_left_to_right() {
  use OpCode::*;
  // with arguments compiled in reverse, the first parameter lives in the
  // highest slot
  let (_vm, f) = compile("var f = fn(a, b) => a");
  let inner = f.compiled().constants[0].to_function().unwrap();
  assert_eq!(inner.arity, 2);
  assert_eq!(codes(inner), vec![(Load, 1), (Return, 1)]);
}

#[test]
fn globals_load_by_interned_name() {
  use OpCode::*;
  let (_vm, f) = compile("undef");
  assert_eq!(
    codes(f),
    vec![(PushConst, 0), (Getg, 0), (Return, 0)]
  );
  let name = f.compiled().constants[0].to_str().unwrap();
  assert_eq!(name.as_str(), "undef");
}

#[test]
fn property_access_pushes_the_name_first() {
  use OpCode::*;
  let (_vm, f) = compile("var t = 1 t.foo");
  assert_eq!(
    codes(f),
    vec![
      (PushConst, 0),
      (Store, 0),
      (PushConst, 1), // "foo"
      (Load, 0),
      (Getp, 0),
      (Return, 0),
    ]
  );
}

#[test]
fn closures_load_their_captures_raw() {
  use OpCode::*;
  let (_vm, f) = compile("var make = fn(x) => fn(y) => x + y");
  let outer = f.compiled().constants[0].to_function().unwrap();
  assert_eq!(outer.arity, 1);
  // the captured parameter is boxed on entry, then the inner function is
  // closed over the raw cell
  assert_eq!(
    codes(outer),
    vec![
      (CellNew, 0),
      (Load, 0),
      (PushConst, 0),
      (Close, 1),
      (Return, 1),
    ]
  );
  let inner = outer.compiled().constants[0].to_function().unwrap();
  assert_eq!(
    codes(inner),
    vec![
      (Load, 0),
      (LoadUp, 0),
      (CellGet, 0),
      (Add, 0),
      (Return, 1),
    ]
  );
}

#[test]
fn captured_local_reads_go_through_the_cell() {
  use OpCode::*;
  let (_vm, f) = compile("fn main() { var s = 0 var f = fn() => s return s }");
  let main = f.compiled().constants[0].to_function().unwrap();
  let ops = codes(main);
  // var s = 0 boxes the slot; return s unboxes it
  assert!(ops.contains(&(CellNew, 0)), "ops: {ops:?}");
  let tail = &ops[ops.len() - 3..];
  assert_eq!(tail, &[(Load, 0), (CellGet, 0), (Return, 1)]);
}

#[test]
fn unary_operators_lower_to_dedicated_ops() {
  use OpCode::*;
  let (_vm, f) = compile("var a = 1 var b = -a var c = !true var d = ~a");
  let ops = codes(f);
  assert!(ops.contains(&(Neg, 0)));
  assert!(ops.contains(&(Not, 0)));
  assert!(ops.contains(&(Bnot, 0)));
}

#[test]
fn entry_returns_main_when_declared() {
  use OpCode::*;
  let (_vm, f) = compile("fn main() { return 1 }");
  assert_eq!(
    codes(f),
    vec![(PushConst, 0), (Store, 0), (Load, 0), (Return, 1)]
  );
}

#[test]
fn every_block_ends_with_return() {
  let sources = [
    "1 + 2",
    "fn main() { return 1 }",
    "fn main() { var a = 10 if a > 5 { return \"big\" } else { return \"small\" } }",
    "var make = fn(x) => fn(y) => x + y",
    "if true { 1 } else { 2 }",
  ];
  for src in sources {
    let (_vm, f) = compile(src);
    for function in all_functions(f) {
      let last = function.compiled().code.last().expect("empty code");
      assert_eq!(last.code, OpCode::Return, "source: {src}");
    }
  }
}

#[test]
fn jump_targets_stay_in_range() {
  use OpCode::*;
  let sources = [
    "if true { return 1 }",
    "if true { return 1 } else { return 2 }",
    "true ? 1 : 2",
    "fn main() { if true { 1 } else { 2 } return 3 }",
  ];
  for src in sources {
    let (_vm, f) = compile(src);
    for function in all_functions(f) {
      let code = &function.compiled().code;
      for (i, op) in code.iter().enumerate() {
        if matches!(op.code, Jump | JumpIf) {
          let target = i as isize + op.arg as isize;
          assert!(
            target >= 0 && (target as usize) < code.len(),
            "jump at {i} with arg {} escapes [0, {}) in {src}",
            op.arg,
            code.len()
          );
        }
      }
    }
  }
}
