use super::intern::StringPool;
use super::Vm;
use crate::object::{Any, Array, Cell, Class, Function, Gc, Instance, Kind, Str, Table};
use crate::value::Value;

impl Vm {
  /// Pin `obj` so it survives collection until released.
  pub fn gc_keep_alive(&mut self, obj: Any) {
    self.roots.push(obj);
  }

  /// Drop one pin for `obj`. Pins nest: an object pinned twice needs two
  /// releases.
  pub fn gc_release(&mut self, obj: Any) {
    for i in (0..self.roots.len()).rev() {
      if self.roots[i] == obj {
        self.roots.splice(i, 1);
        return;
      }
    }
  }

  /// Stop-the-world mark and sweep. Returns the number of freed objects.
  ///
  /// Everything on the heap list is first marked "to collect"; the pinned
  /// set (which includes the global table) and the evaluation stack are
  /// then traversed, clearing marks; whatever stays marked is unlinked
  /// and freed. Cycles need no special handling: the traversal stops at
  /// already-cleared objects.
  pub fn collect(&mut self) -> usize {
    let mut cursor = self.heap;
    while let Some(mut any) = cursor {
      any.mark = true;
      cursor = any.next;
    }

    for i in 0..self.roots.len() {
      unmark(self.roots[i]);
    }
    for i in 0..self.stack.len() {
      unmark_value(self.stack[i]);
    }

    let mut collected = 0;
    let mut previous: Option<Any> = None;
    let mut cursor = self.heap;
    while let Some(any) = cursor {
      let next = any.next;
      if any.mark {
        match previous {
          None => self.heap = next,
          Some(mut p) => p.next = next,
        }
        unsafe { free_object(&mut self.pool, any) };
        collected += 1;
      } else {
        previous = Some(any);
      }
      cursor = next;
    }

    log::debug!("gc collected {collected} objects");
    collected
  }
}

fn unmark_value(value: Value) {
  if let Some(object) = value.to_object() {
    unmark(object);
  }
}

/// Clear the mark on `any` and everything reachable from it.
fn unmark(any: Any) {
  let mut any = any;
  if !any.mark {
    return;
  }
  any.mark = false;

  if let Some(class) = any.class {
    unmark(class.erase());
  }

  match any.kind {
    Kind::Array => {
      let array: Gc<Array> = unsafe { any.cast_unchecked() };
      for value in &array.values {
        unmark_value(*value);
      }
    }
    Kind::Class => {
      let class: Gc<Class> = unsafe { any.cast_unchecked() };
      unmark(class.name.erase());
      if let Some(parent) = class.parent {
        unmark(parent.erase());
      }
      for constant in &class.constants {
        unmark_value(*constant);
      }
      unmark(class.properties.erase());
    }
    Kind::Function => {
      let function: Gc<Function> = unsafe { any.cast_unchecked() };
      if !function.is_native() {
        let compiled = function.compiled();
        for constant in &compiled.constants {
          unmark_value(*constant);
        }
        for capture in &compiled.captures {
          unmark_value(*capture);
        }
      }
    }
    Kind::Instance => {
      let instance: Gc<Instance> = unsafe { any.cast_unchecked() };
      for field in &instance.fields {
        unmark_value(*field);
      }
    }
    Kind::Table => {
      let table: Gc<Table> = unsafe { any.cast_unchecked() };
      for pair in table.pairs() {
        unmark_value(pair.key);
        unmark_value(pair.value);
      }
    }
    Kind::Cell => {
      let cell: Gc<Cell> = unsafe { any.cast_unchecked() };
      unmark_value(cell.value);
    }
    Kind::String | Kind::Native | Kind::Module | Kind::Resource => {}
  }
}

/// Free one swept object. Strings also leave the intern pool.
unsafe fn free_object(pool: &mut StringPool, any: Any) {
  match any.kind {
    Kind::Array => any.cast_unchecked::<Array>().free(),
    Kind::Class => any.cast_unchecked::<Class>().free(),
    Kind::Function => any.cast_unchecked::<Function>().free(),
    Kind::Instance => any.cast_unchecked::<Instance>().free(),
    Kind::String => {
      let string: Gc<Str> = any.cast_unchecked();
      pool.remove(string);
      string.free();
    }
    Kind::Table => any.cast_unchecked::<Table>().free(),
    Kind::Cell => any.cast_unchecked::<Cell>().free(),
    Kind::Native | Kind::Module | Kind::Resource => {}
  }
}
