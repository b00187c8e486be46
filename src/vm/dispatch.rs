use super::Vm;
use crate::buffer::Buffer;
use crate::bytecode::OpCode;
use crate::object::{FnKind, Function, Gc};
use crate::value::{self, Value};

/// Activation record of one call. `stack_start` is the stack depth just
/// before the callee was pushed; the frame's locals live at
/// `stack[stack_start..]`. Native frames record the caller's `argc`
/// instead of owning bytecode.
#[derive(Clone, Copy)]
pub struct Frame {
  pub callee: Gc<Function>,
  pub stack_start: usize,
  pub ip: usize,
  pub argc: u8,
}

/// Pops both operands, requires numbers, pushes the result.
macro_rules! binary_num {
  ($vm:expr, $name:literal, $result:expr, |$x:ident, $y:ident| $body:expr) => {{
    let a = $vm.pop();
    let b = $vm.pop();
    match (a.to_number(), b.to_number()) {
      (Some($x), Some($y)) => $vm.push($result($body)),
      _ => {
        $vm.runtime_error(concat!("operand of ", $name, " is not a Number"));
        return;
      }
    }
  }};
}

/// Pops one operand, requires a number, pushes the result.
macro_rules! unary_num {
  ($vm:expr, $name:literal, |$x:ident| $body:expr) => {{
    let a = $vm.pop();
    match a.to_number() {
      Some($x) => $vm.push(Value::number($body)),
      None => {
        $vm.runtime_error(concat!("operand of ", $name, " is not a Number"));
        return;
      }
    }
  }};
}

/// Pops both operands, requires booleans (strict, no truthiness).
macro_rules! binary_bool {
  ($vm:expr, $name:literal, |$x:ident, $y:ident| $body:expr) => {{
    let a = $vm.pop();
    let b = $vm.pop();
    match (a.to_bool(), b.to_bool()) {
      (Some($x), Some($y)) => $vm.push(Value::bool($body)),
      _ => {
        $vm.runtime_error(concat!("operand of ", $name, " is not a Bool"));
        return;
      }
    }
  }};
}

impl Vm {
  /// Run `callable` against `argc` arguments already on the stack.
  ///
  /// Runtime errors are reported through the handler and terminate the
  /// call; remaining frames are abandoned and the stack is left as-is
  /// for the embedder to reset. Native functions may re-enter this
  /// method; the nested run uses its own frame list against the shared
  /// stack.
  pub fn interpret(&mut self, callable: Value, argc: u8) {
    let mut frames: Buffer<Frame> = Buffer::new();
    if !self.push_frame(&mut frames, callable, argc) {
      return;
    }

    loop {
      let Some(&frame) = frames.last() else { break };
      let fi = frames.len() - 1;

      // native frames execute synchronously and pop themselves
      if let FnKind::Native(native) = &frame.callee.kind {
        let native = *native;
        let produced = native(self, frame.argc);
        self.pop_frame(&mut frames, produced);
        if let Some(f) = frames.last_mut() {
          f.ip += 1;
        }
        continue;
      }

      let Some(&op) = frame.callee.compiled().code.at(frame.ip) else {
        self.runtime_error("instruction pointer out of range");
        return;
      };
      log::trace!(
        "{:depth$}{} {}",
        "",
        op.code.name(),
        op.arg,
        depth = frames.len() * 2
      );

      match op.code {
        OpCode::Nop => {}
        // Push a number of null values on the stack
        OpCode::Push => {
          for _ in 0..op.arg {
            self.push(Value::null());
          }
        }
        OpCode::PushFalse => self.push(Value::bool(false)),
        OpCode::PushTrue => self.push(Value::bool(true)),
        // Push a constant (number, string, function...) value
        OpCode::PushConst => {
          let Some(&constant) = frame.callee.compiled().constants.at(op.arg as usize) else {
            self.runtime_error("constant index out of range");
            return;
          };
          self.push(constant);
        }
        // Load a local slot onto the stack
        OpCode::Load => {
          let Some(&slot) = self.stack.at(frame.stack_start + op.arg as usize) else {
            self.runtime_error("local slot out of range");
            return;
          };
          self.push(slot);
        }
        // Store the top of the stack into a local slot, leaving it on top
        OpCode::Store => {
          let value = self.peek();
          let index = frame.stack_start + op.arg as usize;
          let Some(slot) = self.stack.at_mut(index) else {
            self.runtime_error("local slot out of range");
            return;
          };
          *slot = value;
        }
        OpCode::LoadUp => {
          let Some(&capture) = frame.callee.compiled().captures.at(op.arg as usize) else {
            self.runtime_error("capture index out of range");
            return;
          };
          self.push(capture);
        }
        OpCode::StoreUp => {
          let value = self.pop();
          let mut callee = frame.callee;
          let Some(capture) = callee.compiled_mut().captures.at_mut(op.arg as usize) else {
            self.runtime_error("capture index out of range");
            return;
          };
          *capture = value;
        }

        OpCode::Add => binary_num!(self, "ADD", Value::number, |x, y| x + y),
        OpCode::Sub => binary_num!(self, "SUB", Value::number, |x, y| x - y),
        OpCode::Mul => binary_num!(self, "MUL", Value::number, |x, y| x * y),
        OpCode::Div => binary_num!(self, "DIV", Value::number, |x, y| x / y),
        OpCode::Mod => binary_num!(self, "MOD", Value::number, |x, y| x % y),
        OpCode::Pow => binary_num!(self, "POW", Value::number, |x, y| x.powf(y)),
        OpCode::Inc => unary_num!(self, "INC", |x| x + 1.0),
        OpCode::Dec => unary_num!(self, "DEC", |x| x - 1.0),
        OpCode::Neg => unary_num!(self, "NEG", |x| -x),

        OpCode::Eq => {
          let a = self.pop();
          let b = self.pop();
          self.push(Value::bool(value::equals(a, b)));
        }
        OpCode::Neq => {
          let a = self.pop();
          let b = self.pop();
          self.push(Value::bool(!value::equals(a, b)));
        }
        OpCode::Gt => binary_num!(self, "GT", Value::bool, |x, y| x > y),
        OpCode::Gte => binary_num!(self, "GTE", Value::bool, |x, y| x >= y),
        OpCode::Lt => binary_num!(self, "LT", Value::bool, |x, y| x < y),
        OpCode::Lte => binary_num!(self, "LTE", Value::bool, |x, y| x <= y),
        OpCode::Cmp => binary_num!(self, "CMP", Value::number, |x, y| x - y),

        OpCode::And => binary_bool!(self, "AND", |x, y| x && y),
        OpCode::Or => binary_bool!(self, "OR", |x, y| x || y),
        OpCode::Not => {
          let a = self.pop();
          let Some(x) = a.to_bool() else {
            self.runtime_error("operand of NOT is not a Bool");
            return;
          };
          self.push(Value::bool(!x));
        }

        // Bitwise operators convert through 64-bit integers
        OpCode::Band => binary_num!(self, "BAND", Value::number, |x, y| ((x as i64)
          & (y as i64)) as f64),
        OpCode::Bor => binary_num!(self, "BOR", Value::number, |x, y| ((x as i64)
          | (y as i64)) as f64),
        OpCode::Xor => binary_num!(self, "XOR", Value::number, |x, y| ((x as i64)
          ^ (y as i64)) as f64),
        OpCode::Lsh => binary_num!(self, "LSH", Value::number, |x, y| (x as i64)
          .wrapping_shl(y as u32) as f64),
        OpCode::Rsh => binary_num!(self, "RSH", Value::number, |x, y| (x as i64)
          .wrapping_shr(y as u32) as f64),
        OpCode::Bnot => unary_num!(self, "BNOT", |x| !(x as i64) as f64),

        // Get a value from the global table
        OpCode::Getg => {
          let key = self.pop();
          let value = self.global.get(key);
          if value.is_null() {
            self.runtime_error(format_args!("undefined variable '{key}'"));
            return;
          }
          self.push(value);
        }
        // Get a property from a value through its class
        OpCode::Getp => {
          let this = self.pop();
          let name = self.pop();
          let Some(class) = self.class_of(this) else {
            self.runtime_error(format_args!("'{this}' has no properties"));
            return;
          };
          let property = class.property(name);
          if property.is_null() {
            self.runtime_error(format_args!(
              "undefined property '{name}' on value of type '{}'",
              class.name
            ));
            return;
          }
          // insert `this` under the property for method calls
          let next_is_call = frame
            .callee
            .compiled()
            .code
            .at(frame.ip + 1)
            .map(|next| next.code == OpCode::Call)
            .unwrap_or(false);
          if property.is_function() && next_is_call {
            self.push(this);
          }
          self.push(property);
        }
        // Instantiate a closure: a fresh copy of the prototype function
        // with the popped values installed as its captures. Sites that
        // run more than once must not share capture slots.
        OpCode::Close => {
          let value = self.pop();
          let Some(prototype) = value.to_function() else {
            self.runtime_error("operand of CLOSE is not a Function");
            return;
          };
          let mut closure = self.new_function(prototype.arity);
          closure.compiled_mut().code = prototype.compiled().code.clone();
          closure.compiled_mut().constants = prototype.compiled().constants.clone();
          for _ in 0..op.arg {
            let capture = self.pop();
            closure.compiled_mut().captures.push(capture);
          }
          self.push(Value::object(closure));
        }

        OpCode::Call => {
          let callee = self.pop();
          if !self.push_frame(&mut frames, callee, op.arg as u8) {
            return;
          }
          continue;
        }
        OpCode::Return => {
          self.pop_frame(&mut frames, op.arg as i8);
          if let Some(f) = frames.last_mut() {
            f.ip += 1;
          }
          continue;
        }

        OpCode::Jump => {
          frames[fi].ip = (frame.ip as isize + op.arg as isize) as usize;
          continue;
        }
        OpCode::JumpIf => {
          let truth = self.pop();
          let Some(truth) = truth.to_bool() else {
            self.runtime_error("condition did not result in a boolean");
            return;
          };
          let step = if truth { 1 } else { op.arg as isize };
          frames[fi].ip = (frame.ip as isize + step) as usize;
          continue;
        }

        OpCode::MakeArray => {
          let count = op.arg as usize;
          let Some(start) = self.stack.len().checked_sub(count) else {
            self.runtime_error("stack is missing array elements");
            return;
          };
          let mut array = self.new_array();
          for i in start..self.stack.len() {
            array.values.push(self.stack[i]);
          }
          self.stack.truncate(start);
          self.push(Value::object(array));
        }
        OpCode::MakeTable => {
          let count = op.arg as usize;
          let Some(start) = self.stack.len().checked_sub(2 * count) else {
            self.runtime_error("stack is missing table entries");
            return;
          };
          let mut table = self.new_table();
          for i in 0..count {
            let key = self.stack[start + 2 * i];
            let value = self.stack[start + 2 * i + 1];
            table.set(key, value);
          }
          self.stack.truncate(start);
          self.push(Value::object(table));
        }

        // Box a local slot in place
        OpCode::CellNew => {
          let index = frame.stack_start + op.arg as usize;
          let Some(&slot) = self.stack.at(index) else {
            self.runtime_error("local slot out of range");
            return;
          };
          let cell = self.new_cell(slot);
          self.stack[index] = Value::object(cell);
        }
        OpCode::CellGet => {
          let value = self.pop();
          let Some(cell) = value.to_cell() else {
            self.runtime_error("operand of CELL_GET is not a Cell");
            return;
          };
          self.push(cell.value);
        }
        // Pops the cell, stores the value below it, leaves the value
        OpCode::CellSet => {
          let value = self.pop();
          let Some(mut cell) = value.to_cell() else {
            self.runtime_error("operand of CELL_SET is not a Cell");
            return;
          };
          cell.value = self.peek();
        }
      }

      frames[fi].ip += 1;
    }
  }

  fn push_frame(&mut self, frames: &mut Buffer<Frame>, callable: Value, argc: u8) -> bool {
    let Some(callee) = callable.to_function() else {
      self.runtime_error("value is not callable");
      return false;
    };
    if argc < callee.arity {
      self.runtime_error(format_args!(
        "not enough arguments to run function, got {argc} instead of {}",
        callee.arity
      ));
      return false;
    }
    let Some(stack_start) = self.stack.len().checked_sub(argc as usize) else {
      self.runtime_error("stack is missing call arguments");
      return false;
    };
    frames.push(Frame {
      callee,
      stack_start,
      ip: 0,
      argc,
    });
    true
  }

  /// Unwind one frame. `produced` says whether the frame left a return
  /// value on top of the stack; compiled frames reset the stack to their
  /// base, natives have already consumed their arguments.
  fn pop_frame(&mut self, frames: &mut Buffer<Frame>, produced: i8) {
    let returned = if produced != 0 { Some(self.pop()) } else { None };

    if let Some(frame) = frames.last() {
      if !frame.callee.is_native() {
        let stack_start = frame.stack_start;
        self.stack.truncate(stack_start);
      }
    }
    frames.pop();

    if let Some(value) = returned {
      self.push(value);
    }
  }
}
