use std::cell::RefCell;
use std::rc::Rc;

use crate::{Value, Vm};

pub struct Script {
  pub vm: Vm,
  pub main: Value,
  pub errors: Rc<RefCell<Vec<String>>>,
}

/// Compile `src`, run its top level, and hold on to the `main` it yields.
pub fn load(src: &str) -> Script {
  let errors: Rc<RefCell<Vec<String>>> = Rc::default();
  let sink = errors.clone();
  let mut vm = Vm::new(move |message| sink.borrow_mut().push(message.to_owned()));

  let entry = vm.compile(src, "test");
  assert!(!entry.is_null(), "compile failed: {:?}", errors.borrow());

  vm.interpret(entry, 0);
  assert_eq!(*errors.borrow(), Vec::<String>::new(), "top level failed");
  let main = vm.pop();
  vm.reset_stack();
  assert!(main.is_function(), "the script did not yield a main function");

  Script { vm, main, errors }
}

/// Compile a script that must not compile; returns the diagnostics.
pub fn compile_errors(src: &str) -> Vec<String> {
  let errors: Rc<RefCell<Vec<String>>> = Rc::default();
  let sink = errors.clone();
  let mut vm = Vm::new(move |message| sink.borrow_mut().push(message.to_owned()));

  let entry = vm.compile(src, "test");
  assert!(entry.is_null(), "compile unexpectedly succeeded");
  let collected = errors.borrow().clone();
  assert!(!collected.is_empty(), "no diagnostics were reported");
  collected
}

impl Script {
  /// Invoke `main` and pop its result.
  pub fn run(&mut self, args: &[Value]) -> Value {
    self.vm.call(self.main, args);
    assert_eq!(
      *self.errors.borrow(),
      Vec::<String>::new(),
      "main reported errors"
    );
    self.vm.pop()
  }

  /// Invoke `main`, expecting at least one runtime error.
  pub fn run_expecting_errors(&mut self, args: &[Value]) -> Vec<String> {
    self.vm.call(self.main, args);
    let collected = self.errors.borrow().clone();
    assert!(!collected.is_empty(), "main unexpectedly succeeded");
    collected
  }
}
