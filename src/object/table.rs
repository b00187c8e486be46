use super::{Header, Kind, Object};
use crate::buffer::Buffer;
use crate::value::{self, Value};

/// Bucket count is fixed; buckets chain collisions in per-bucket buffers.
pub const TABLE_CAPACITY: usize = 16;

pub struct Pair {
  pub key: Value,
  pub value: Value,
}

/// A value-to-value hash map with a fixed number of buckets.
///
/// Keys hash through [`value::hash`] and compare through
/// [`value::equals`]. A null value means "absent": storing null removes
/// the association as far as lookups are concerned.
#[repr(C)]
pub struct Table {
  pub header: Header,
  buckets: [Buffer<Pair>; TABLE_CAPACITY],
}

impl Table {
  pub(crate) fn new(header: Header) -> Self {
    Self {
      header,
      buckets: std::array::from_fn(|_| Buffer::new()),
    }
  }

  fn bucket(&self, key: Value) -> usize {
    (value::hash(key) % TABLE_CAPACITY as u64) as usize
  }

  fn pair_mut(&mut self, key: Value) -> Option<&mut Pair> {
    let index = self.bucket(key);
    self.buckets[index]
      .iter()
      .position(|p| value::equals(p.key, key))
      .map(|i| &mut self.buckets[index][i])
  }

  /// The value associated with `key`, or null.
  pub fn get(&self, key: Value) -> Value {
    let bucket = &self.buckets[self.bucket(key)];
    bucket
      .iter()
      .find(|p| value::equals(p.key, key))
      .map(|p| p.value)
      .unwrap_or(Value::null())
  }

  pub fn set(&mut self, key: Value, value: Value) {
    if let Some(pair) = self.pair_mut(key) {
      pair.value = value;
      return;
    }
    let index = self.bucket(key);
    self.buckets[index].push(Pair { key, value });
  }

  pub fn remove(&mut self, key: Value) {
    self.set(key, Value::null())
  }

  /// All pairs, in bucket order.
  pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
    self.buckets.iter().flat_map(|b| b.iter())
  }
}

unsafe impl Object for Table {
  const KIND: Kind = Kind::Table;
}
