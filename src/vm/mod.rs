mod dispatch;
mod gc;
pub mod intern;


pub use dispatch::Frame;

use crate::buffer::Buffer;
use crate::builtins;
use crate::bytecode::Disassembly;
use crate::emit;
use crate::object::{
  Any, Array, Cell, Class, Function, Gc, Header, Instance, Kind, NativeFn, Str, Table,
};
use crate::syntax;
use crate::value::Value;
use intern::{Lookup, StringPool, STRING_POOL_CAPACITY};

/// Receives every formatted error message the VM produces.
pub type ErrorHandler = Box<dyn FnMut(&str)>;

/// Classes backing property access on primitive values. Registered once
/// at startup by the standard library glue.
#[derive(Default)]
pub(crate) struct Classes {
  pub array: Option<Gc<Class>>,
  pub bool_: Option<Gc<Class>>,
  pub function: Option<Gc<Class>>,
  pub number: Option<Gc<Class>>,
  pub string: Option<Gc<Class>>,
  pub table: Option<Gc<Class>>,
}

/// A single interpreter instance.
///
/// The VM owns all shared-mutable state: the heap list, the root set, the
/// evaluation stack, the string pool and the global table. Two instances
/// share nothing.
pub struct Vm {
  pub debug: bool,
  handler: ErrorHandler,
  pub(crate) heap: Option<Any>,
  pub(crate) roots: Buffer<Any>,
  pub(crate) pool: StringPool,
  pub(crate) global: Gc<Table>,
  pub(crate) stack: Buffer<Value>,
  pub(crate) classes: Classes,
}

impl Vm {
  pub fn new(handler: impl FnMut(&str) + 'static) -> Self {
    // the global table exists before the VM does; adopt it afterwards
    let global = Gc::alloc(Table::new(Header::new(Kind::Table, None)));
    let mut vm = Self {
      debug: false,
      handler: Box::new(handler),
      heap: None,
      roots: Buffer::new(),
      pool: StringPool::new(STRING_POOL_CAPACITY),
      global,
      stack: Buffer::new(),
      classes: Classes::default(),
    };
    vm.adopt(global.erase());
    vm.gc_keep_alive(global.erase());
    builtins::register(&mut vm);
    vm
  }

  /// Thread a freshly allocated object into the heap list.
  fn adopt(&mut self, any: Any) {
    let mut any = any;
    any.next = self.heap;
    self.heap = Some(any);
  }

  pub(crate) fn report(&mut self, message: &str) {
    (self.handler)(message)
  }

  pub(crate) fn runtime_error(&mut self, message: impl std::fmt::Display) {
    let message = format!("runtime error: {message}");
    self.report(&message);
  }

  pub fn global(&self) -> Gc<Table> {
    self.global
  }

  /// Define a global binding; the name is interned.
  pub fn set_global(&mut self, name: &str, value: Value) {
    let name = self.new_string(name);
    let mut global = self.global;
    global.set(Value::object(name), value);
  }

  // Allocation ---------------------------------------------------------------

  pub fn new_array(&mut self) -> Gc<Array> {
    let header = Header::new(Kind::Array, self.classes.array);
    let array = Gc::alloc(Array::new(header));
    self.adopt(array.erase());
    array
  }

  /// Intern `s`: byte-equal strings always share one object.
  pub fn new_string(&mut self, s: &str) -> Gc<Str> {
    match self.pool.lookup(s) {
      Lookup::Found(string) => string,
      Lookup::Vacant { slot, hash } => {
        let header = Header::new(Kind::String, self.classes.string);
        let string = Gc::alloc(Str::new(header, hash, s));
        self.adopt(string.erase());
        self.pool.insert(slot, string);
        string
      }
    }
  }

  pub fn new_function(&mut self, arity: u8) -> Gc<Function> {
    let header = Header::new(Kind::Function, self.classes.function);
    let function = Gc::alloc(Function::new(header, arity));
    self.adopt(function.erase());
    function
  }

  pub fn new_native_function(&mut self, f: NativeFn, arity: u8) -> Gc<Function> {
    let header = Header::new(Kind::Function, self.classes.function);
    let function = Gc::alloc(Function::native(header, f, arity));
    self.adopt(function.erase());
    function
  }

  pub fn new_table(&mut self) -> Gc<Table> {
    let header = Header::new(Kind::Table, self.classes.table);
    let table = Gc::alloc(Table::new(header));
    self.adopt(table.erase());
    table
  }

  pub fn new_class(&mut self, parent: Option<Gc<Class>>, name: Gc<Str>) -> Gc<Class> {
    let properties = self.new_table();
    let header = Header::new(Kind::Class, None);
    let class = Gc::alloc(Class::new(header, name, parent, properties));
    self.adopt(class.erase());
    class
  }

  pub fn new_instance(&mut self, class: Gc<Class>, fields: usize) -> Gc<Instance> {
    let header = Header::new(Kind::Instance, Some(class));
    let fields = (0..fields).map(|_| Value::null()).collect();
    let instance = Gc::alloc(Instance::new(header, fields));
    self.adopt(instance.erase());
    instance
  }

  pub fn new_cell(&mut self, value: Value) -> Gc<Cell> {
    let header = Header::new(Kind::Cell, None);
    let cell = Gc::alloc(Cell::new(header, value));
    self.adopt(cell.erase());
    cell
  }

  // Stack --------------------------------------------------------------------

  pub fn push(&mut self, value: Value) {
    log::trace!(">>> [{}] {value}", self.stack.len());
    self.stack.push(value);
  }

  pub fn pop(&mut self) -> Value {
    match self.stack.pop() {
      Some(value) => value,
      None => panic!("stack underflow"),
    }
  }

  pub(crate) fn peek(&self) -> Value {
    match self.stack.last() {
      Some(value) => *value,
      None => panic!("stack underflow"),
    }
  }

  pub fn stack_len(&self) -> usize {
    self.stack.len()
  }

  /// Drop everything on the evaluation stack. The embedder resets the
  /// stack after a runtime error or between top-level calls.
  pub fn reset_stack(&mut self) {
    self.stack.clear()
  }

  /// Cut the stack back to `len`. Natives that re-enter the interpreter
  /// restore the pre-call depth this way.
  pub fn truncate_stack(&mut self, len: usize) {
    self.stack.truncate(len)
  }

  /// Push `args` in reverse (the calling convention) and run `callable`.
  pub fn call(&mut self, callable: Value, args: &[Value]) {
    for argument in args.iter().rev() {
      self.push(*argument);
    }
    self.interpret(callable, args.len() as u8);
  }

  // Compilation --------------------------------------------------------------

  /// Compile `source` to an entry function of arity 0.
  ///
  /// Returns the null value after reporting to the error handler when the
  /// source does not parse. The produced function is pinned so it survives
  /// collection until the embedder runs it.
  pub fn compile(&mut self, source: &str, module: &str) -> Value {
    let parsed = match syntax::parse(source, module) {
      Ok(parsed) => parsed,
      Err(errors) => {
        for error in &errors {
          let message = error.to_string();
          self.report(&message);
        }
        return Value::null();
      }
    };

    if self.debug {
      print!("{}", parsed.dump());
    }

    let function = self.new_function(0);
    self.gc_keep_alive(function.erase());
    emit::emit(self, &parsed, function);

    if self.debug {
      print!("{}", Disassembly(function));
    }

    Value::object(function)
  }

  /// The class property access dispatches through for `value`.
  pub(crate) fn class_of(&self, value: Value) -> Option<Gc<Class>> {
    if let Some(object) = value.to_object() {
      if let Some(class) = object.class {
        return Some(class);
      }
      return match object.kind {
        Kind::Array => self.classes.array,
        Kind::Function => self.classes.function,
        Kind::String => self.classes.string,
        Kind::Table => self.classes.table,
        _ => None,
      };
    }
    if value.is_bool() {
      return self.classes.bool_;
    }
    if value.is_number() {
      return self.classes.number;
    }
    None
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new(|message| eprintln!("sable error: {message}"))
  }
}

impl Drop for Vm {
  fn drop(&mut self) {
    // unpin everything so the final collection frees the whole heap
    self.roots.clear();
    self.stack.clear();
    self.collect();
  }
}
