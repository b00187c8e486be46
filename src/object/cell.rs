use super::{Header, Kind, Object};
use crate::value::Value;

/// A shared box for a captured variable.
///
/// Locals that are closed over by a nested function are boxed in a cell,
/// and both the defining frame and every closure hold the same cell, so
/// stores through either side are visible to the other. Cells are an
/// implementation detail of the compiler and never reachable from script
/// code as first-class values.
#[repr(C)]
pub struct Cell {
  pub header: Header,
  pub value: Value,
}

impl Cell {
  pub(crate) fn new(header: Header, value: Value) -> Self {
    Self { header, value }
  }
}

unsafe impl Object for Cell {
  const KIND: Kind = Kind::Cell;
}
