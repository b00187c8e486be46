#![allow(clippy::unusual_byte_groupings)]

mod nanbox;

use std::fmt::{self, Debug, Display};

pub use nanbox::Value;

use crate::object::{Array, Cell, Class, Function, Gc, Instance, Kind, Object, Str, Table};

macro_rules! object_accessors {
  ($($name:ident => $ty:ty),* $(,)?) => {
    paste::paste! {
      impl Value {
        $(
          #[inline]
          pub fn [<is_ $name>](&self) -> bool {
            self.to_object().map(|o| o.kind == <$ty>::KIND).unwrap_or(false)
          }

          #[inline]
          pub fn [<to_ $name>](self) -> Option<Gc<$ty>> {
            self.to_object()?.cast()
          }
        )*
      }
    }
  };
}

object_accessors! {
  str => Str,
  array => Array,
  table => Table,
  function => Function,
  class => Class,
  instance => Instance,
  cell => Cell,
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::number(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::bool(value)
  }
}

impl<T: Object> From<Gc<T>> for Value {
  fn from(value: Gc<T>) -> Self {
    Value::object(value)
  }
}

impl Default for Value {
  fn default() -> Self {
    Self::null()
  }
}

/// Value equality.
///
/// Numbers compare as IEEE-754 doubles, null and booleans by bit pattern,
/// strings by their bytes (which interning collapses to pointer equality),
/// and every other object by identity.
pub fn equals(a: Value, b: Value) -> bool {
  if let (Some(x), Some(y)) = (a.to_number(), b.to_number()) {
    return x == y;
  }
  match (a.to_object(), b.to_object()) {
    (Some(x), Some(y)) => {
      if x.kind != y.kind {
        return false;
      }
      match (x.cast::<Str>(), y.cast::<Str>()) {
        (Some(s), Some(t)) => s.as_str() == t.as_str(),
        _ => x.ptr_eq(y),
      }
    }
    (None, None) => a.bits() == b.bits(),
    _ => false,
  }
}

// Thomas Wang's 64-bit integer mixer.
fn hash64(mut n: u64) -> u64 {
  n = (!n).wrapping_add(n << 18);
  n ^= n >> 31;
  n = n.wrapping_mul(21);
  n ^= n >> 11;
  n = n.wrapping_add(n << 6);
  n ^= n >> 22;
  n
}

/// Value hash, consistent with [`equals`]: strings use their interned
/// FNV-1a hash, numbers canonicalise `-0.0` so the two zero encodings
/// agree, everything else hashes its bit pattern.
pub fn hash(v: Value) -> u64 {
  if let Some(s) = v.to_str() {
    return s.hash as u64;
  }
  if let Some(n) = v.to_number() {
    let n = if n == 0.0 { 0.0 } else { n };
    return hash64(n.to_bits());
  }
  hash64(v.bits())
}

impl Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_null() {
      return f.write_str("null");
    }
    if let Some(b) = self.to_bool() {
      return write!(f, "{b}");
    }
    if let Some(n) = self.to_number() {
      return write!(f, "{n}");
    }
    let obj = self.to_object().expect("value is an object");
    match obj.kind {
      Kind::String => f.write_str(self.to_str().unwrap().as_str()),
      Kind::Array => write!(f, "[({})]", self.to_array().unwrap().len()),
      Kind::Class => write!(f, "<class {}>", self.to_class().unwrap().name),
      Kind::Function => f.write_str("<function>"),
      Kind::Table => f.write_str("<table>"),
      _ => f.write_str("<object>"),
    }
  }
}

impl Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(s) = self.to_str() {
      return write!(f, "{s:?}");
    }
    Display::fmt(self, f)
  }
}
