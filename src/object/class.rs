use super::{Gc, Header, Kind, Object, Str, Table};
use crate::buffer::Buffer;
use crate::value::Value;

/// A class: a name, an optional parent, and a property table.
///
/// Methods are plain function values stored in `properties`. Every value
/// type has an associated class (registered at VM startup) through which
/// property access dispatches.
#[repr(C)]
pub struct Class {
  pub header: Header,
  pub name: Gc<Str>,
  pub parent: Option<Gc<Class>>,
  pub constants: Buffer<Value>,
  pub properties: Gc<Table>,
}

impl Class {
  pub(crate) fn new(
    header: Header,
    name: Gc<Str>,
    parent: Option<Gc<Class>>,
    properties: Gc<Table>,
  ) -> Self {
    Self {
      header,
      name,
      parent,
      constants: Buffer::new(),
      properties,
    }
  }

  /// Look up a property on this class or any ancestor.
  pub fn property(&self, name: Value) -> Value {
    let mut found = self.properties.get(name);
    let mut parent = self.parent;
    while found.is_null() {
      let Some(class) = parent else { break };
      found = class.properties.get(name);
      parent = class.parent;
    }
    found
  }
}

unsafe impl Object for Class {
  const KIND: Kind = Kind::Class;
}

/// An instance of a script class; fields are stored inline in declaration
/// order.
#[repr(C)]
pub struct Instance {
  pub header: Header,
  pub fields: Buffer<Value>,
}

impl Instance {
  pub(crate) fn new(header: Header, fields: Buffer<Value>) -> Self {
    Self { header, fields }
  }
}

unsafe impl Object for Instance {
  const KIND: Kind = Kind::Instance;
}
