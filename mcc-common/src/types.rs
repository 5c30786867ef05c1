//! Common types used throughout the compiler
//!
//! This module defines the small identifier types shared between the IR
//! and the backend: result identities, block identities, and the label
//! generator used during lowering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result identity: an opaque handle for the value produced by one
/// instruction. Operands reference values by this handle, never by name.
pub type ValueId = u32;

/// Basic block identity within a function (declaration-order index)
pub type BlockId = u32;

/// Generator for fresh value identities
#[derive(Debug, Clone, Default)]
pub struct ValueGenerator {
    next_id: ValueId,
}

impl ValueGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate a new value identity
    pub fn new_value(&mut self) -> ValueId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Label generator for code generation
///
/// Counters are monotonic for the lifetime of one generator; labels are
/// never reused or recycled.
#[derive(Debug, Clone, Default)]
pub struct LabelGenerator {
    next_id: u32,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate a new label with the given prefix
    pub fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.next_id);
        self.next_id += 1;
        label
    }
}

/// Position of an instruction inside a function, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrPos {
    /// Declaration-order index of the block
    pub block: usize,
    /// Index of the instruction within the block
    pub index: usize,
}

impl InstrPos {
    pub fn new(block: usize, index: usize) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for InstrPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}, instruction {}", self.block, self.index)
    }
}
