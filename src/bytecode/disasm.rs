use std::fmt::{self, Display};

use crate::object::{Function, Gc, Kind};
use crate::value::Value;

/// Debug formatter for a compiled function: its constant pool followed by
/// its code, with nested functions printed recursively.
///
/// ```text
/// Function (0) {
///   + 0 Number 7
///   > 0000 PUSH_CONST   0
///   > 0001 RETURN       1
/// }
/// ```
pub struct Disassembly(pub Gc<Function>);

impl Display for Disassembly {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    function(f, self.0, 0)
  }
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
  write!(f, "{:width$}", "", width = depth * 2)
}

fn function(f: &mut fmt::Formatter<'_>, fun: Gc<Function>, depth: usize) -> fmt::Result {
  write!(f, "Function ({}) ", fun.arity)?;
  if fun.is_native() {
    return writeln!(f, "Native");
  }
  writeln!(f, "{{")?;
  let compiled = fun.compiled();
  for (i, constant) in compiled.constants.iter().enumerate() {
    indent(f, depth + 1)?;
    write!(f, "+ {i} ")?;
    constant_value(f, *constant, depth + 1)?;
  }
  for (i, op) in compiled.code.iter().enumerate() {
    indent(f, depth + 1)?;
    write!(f, "> {i:04} {:<12}", op.code.name())?;
    if op.code.has_arg() {
      write!(f, "{}", op.arg)?;
    }
    writeln!(f)?;
  }
  indent(f, depth)?;
  writeln!(f, "}}")
}

fn constant_value(f: &mut fmt::Formatter<'_>, value: Value, depth: usize) -> fmt::Result {
  if let Some(n) = value.to_number() {
    return writeln!(f, "Number {n}");
  }
  match value.to_object().map(|o| o.kind) {
    Some(Kind::String) => {
      let s = value.to_str().unwrap();
      writeln!(f, "String ({}) {:?}", s.len(), s.as_str())
    }
    Some(Kind::Function) => function(f, value.to_function().unwrap(), depth),
    _ => writeln!(f, "{value}"),
  }
}
