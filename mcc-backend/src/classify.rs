//! Value Classification
//!
//! Decides, for each constant-producing instruction, whether its result
//! needs a register right away, a deferred binding materialized at the
//! consuming store, or nothing at all. The IR encodes every scalar as
//! constant + alloca + store + load; most of that is scaffolding, and
//! classification is what lets the backend skip it.

use crate::policy::ConstPolicy;
use mcc_ir::{Function, Instruction};
use mcc_common::ValueId;

/// What a constant's result identity needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstClass {
    /// Used in computation: bind a register and emit `li` at the
    /// definition
    Materialize,
    /// A variable initializer: record the literal now, materialize it
    /// into a fresh register at the consuming store
    Defer,
    /// Allocation size, dead value, or the setup zero-store: no binding,
    /// no code
    Elide,
}

/// Classify one constant by inspecting every consumer of its result.
///
/// `regs_allocated` is the number of registers handed out so far in this
/// lowering; a literal zero stored before any register exists is the
/// scaffolding store that establishes a slot's initial value, not a
/// programmer-visible assignment, and is elided.
pub fn classify_constant(
    function: &Function,
    result: ValueId,
    value: i64,
    regs_allocated: u32,
    policy: ConstPolicy,
) -> ConstClass {
    if policy == ConstPolicy::MaterializeAll {
        return ConstClass::Materialize;
    }

    let mut stored = false;
    for instr in function.instructions() {
        match instr {
            Instruction::Binary { lhs, rhs, .. } | Instruction::Cmp { lhs, rhs, .. }
                if *lhs == result || *rhs == result =>
            {
                return ConstClass::Materialize;
            }
            Instruction::Ret { value: v } if *v == result => return ConstClass::Materialize,
            Instruction::Store { value: v, .. } if *v == result => stored = true,
            _ => {}
        }
    }

    if stored {
        if value == 0 && regs_allocated == 0 {
            ConstClass::Elide
        } else {
            ConstClass::Defer
        }
    } else {
        // Only alloca sizes (or nothing) consume it
        ConstClass::Elide
    }
}
