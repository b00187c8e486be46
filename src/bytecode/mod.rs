pub mod disasm;
pub mod opcode;

pub use disasm::Disassembly;
pub use opcode::{Op, OpCode};
