//! Native function registration: the classes backing property access on
//! primitive values, their methods, and the free functions every script
//! can reach through the global table.

use crate::object::{Class, Gc};
use crate::value::Value;
use crate::vm::Vm;

pub fn register(vm: &mut Vm) {
  let array = define_class(vm, "Array");
  define_method(vm, array, "at", array_at, 1);
  define_method(vm, array, "each", array_each, 1);
  vm.classes.array = Some(array);

  let table = define_class(vm, "Table");
  define_method(vm, table, "get", table_get, 1);
  define_method(vm, table, "set", table_set, 2);
  vm.classes.table = Some(table);

  vm.classes.bool_ = Some(define_class(vm, "Bool"));
  vm.classes.function = Some(define_class(vm, "Function"));
  vm.classes.number = Some(define_class(vm, "Number"));
  vm.classes.string = Some(define_class(vm, "String"));

  define_global(vm, "range", range, 2);
  define_global(vm, "print", print, 1);
  define_global(vm, "println", println, 1);
}

fn define_class(vm: &mut Vm, name: &str) -> Gc<Class> {
  let name = vm.new_string(name);
  let class = vm.new_class(None, name);
  // class registry entries live for the whole VM
  vm.gc_keep_alive(class.erase());
  class
}

fn define_method(vm: &mut Vm, class: Gc<Class>, name: &str, f: crate::object::NativeFn, arity: u8) {
  let name = vm.new_string(name);
  let function = vm.new_native_function(f, arity);
  let mut properties = class.properties;
  properties.set(Value::object(name), Value::object(function));
}

fn define_global(vm: &mut Vm, name: &str, f: crate::object::NativeFn, arity: u8) {
  let function = vm.new_native_function(f, arity);
  vm.set_global(name, Value::object(function));
}

// Array -----------------------------------------------------------------------

/// `array.at(index)` — the element, or null when out of range.
fn array_at(vm: &mut Vm, _argc: u8) -> i8 {
  let Some(this) = vm.pop().to_array() else {
    vm.runtime_error("at: receiver is not an Array");
    vm.push(Value::null());
    return 1;
  };
  let index = vm.pop();
  let Some(index) = index.to_number() else {
    vm.runtime_error("at: index is not a Number");
    vm.push(Value::null());
    return 1;
  };
  let value = this
    .values
    .at(index as usize)
    .copied()
    .unwrap_or(Value::null());
  vm.push(value);
  1
}

/// `array.each(fn)` — invokes the callback once per element.
///
/// Calls back into the interpreter; the stack is restored to its
/// pre-call depth after every invocation.
fn array_each(vm: &mut Vm, _argc: u8) -> i8 {
  let Some(this) = vm.pop().to_array() else {
    vm.runtime_error("each: receiver is not an Array");
    return 0;
  };
  let callback = vm.pop();
  if !callback.is_function() {
    vm.runtime_error("each: callback is not a Function");
    return 0;
  }

  for i in 0..this.values.len() {
    let depth = vm.stack_len();
    vm.push(this.values[i]);
    vm.interpret(callback, 1);
    vm.truncate_stack(depth);
  }
  0
}

/// `range(min, max)` or `range(min, max, step)` — an Array of numbers.
fn range(vm: &mut Vm, argc: u8) -> i8 {
  let min = vm.pop().to_number();
  let max = vm.pop().to_number();
  let step = if argc >= 3 { vm.pop().to_number() } else { Some(1.0) };
  let (Some(min), Some(max), Some(step)) = (min, max, step) else {
    vm.runtime_error("range: bounds are not Numbers");
    vm.push(Value::null());
    return 1;
  };

  let mut array = vm.new_array();
  let mut i = min;
  while i < max {
    array.values.push(Value::number(i));
    i += step;
  }
  vm.push(Value::object(array));
  1
}

// Table -----------------------------------------------------------------------

fn table_get(vm: &mut Vm, _argc: u8) -> i8 {
  let Some(this) = vm.pop().to_table() else {
    vm.runtime_error("get: receiver is not a Table");
    vm.push(Value::null());
    return 1;
  };
  let key = vm.pop();
  vm.push(this.get(key));
  1
}

fn table_set(vm: &mut Vm, _argc: u8) -> i8 {
  let Some(mut this) = vm.pop().to_table() else {
    vm.runtime_error("set: receiver is not a Table");
    return 0;
  };
  let key = vm.pop();
  let value = vm.pop();
  this.set(key, value);
  0
}

// Io --------------------------------------------------------------------------

/// `print(format, args…)` — writes `format` with every `{}` replaced by
/// the next argument.
fn print(vm: &mut Vm, argc: u8) -> i8 {
  format_to_stdout(vm, argc);
  0
}

fn println(vm: &mut Vm, argc: u8) -> i8 {
  let result = print(vm, argc);
  println!();
  result
}

fn format_to_stdout(vm: &mut Vm, argc: u8) {
  let format = vm.pop();
  let Some(format) = format.to_str() else {
    vm.runtime_error("print: format is not a String");
    return;
  };

  let mut remaining = argc.saturating_sub(1);
  let mut chars = format.as_str().chars().peekable();
  while let Some(c) = chars.next() {
    if c == '{' && chars.peek() == Some(&'}') {
      chars.next();
      if remaining > 0 {
        remaining -= 1;
        let argument = vm.pop();
        print!("{argument}");
      } else {
        print!("{{}}");
      }
    } else {
      print!("{c}");
    }
  }

  // unreferenced arguments still belong to this call
  for _ in 0..remaining {
    vm.pop();
  }
}
