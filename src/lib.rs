//! Sable is a small embeddable scripting language: dynamically typed,
//! NaN-boxed, compiled to a compact bytecode and run on a stack machine
//! with a mark-and-sweep heap.
//!
//! ```no_run
//! let mut vm = sable::Vm::default();
//! let entry = vm.compile("fn main() { return 1 + 2 * 3 }", "example");
//! vm.interpret(entry, 0);
//! let main = vm.pop();
//! vm.reset_stack();
//! vm.call(main, &[]);
//! assert_eq!(vm.pop().to_number(), Some(7.0));
//! ```

mod buffer;
mod builtins;
pub mod bytecode;
pub mod emit;
pub mod object;
pub mod syntax;
pub mod value;
pub mod vm;

pub use buffer::Buffer;
pub use bytecode::{Disassembly, Op, OpCode};
pub use object::{Array, Class, Function, Gc, Kind, NativeFn, Str, Table};
pub use syntax::{parse, SyntaxError};
pub use value::Value;
pub use vm::{ErrorHandler, Frame, Vm};

#[cfg(test)]
mod tests;
