//! MicroC IR Compiler - Intermediate Representation
//!
//! This crate defines the memory-oriented SSA IR that the backend lowers:
//! a module of functions, each an ordered list of basic blocks holding
//! ordered instruction lists with `ValueId` result identities. It also
//! contains the textual frontend (lexer + parser) for the on-disk IR
//! format the driver consumes.

pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use ir::{
    BasicBlock, BinaryOp, Function, FunctionBuilder, Instruction, Module,
};
pub use parser::parse_module;
