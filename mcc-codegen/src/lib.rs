//! MicroC IR Compiler - Target Assembly Model
//!
//! This crate defines the output side of the compiler: the register
//! handle, the assembly instruction set the backend emits, and the
//! final rendering of an instruction sequence into assembly text.

pub mod asm;
pub mod emit;

pub use asm::{AsmInst, Reg, RETURN_REG};
pub use emit::emit_program;
