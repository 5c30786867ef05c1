//! MicroC IR Compiler - Backend
//!
//! This crate lowers the memory-oriented SSA IR to assembly for a simple
//! register machine in a single forward walk. There is no register
//! allocator, dominance analysis, or stack frame: data-flow is
//! reconstructed from the memory encoding through binding maps populated
//! as the walk proceeds, and redundant store/load pairs become free by
//! forwarding the stored value's binding to the load's result.
//!
//! The walk applies three cooperating phases in sequence:
//!
//! 1. label assignment ([`labels`]) - one label per block, entry first;
//! 2. value classification ([`classify`]) - which constants need a
//!    register, a deferred binding, or nothing;
//! 3. binding propagation and instruction emission ([`lower`]) - the
//!    forward walk itself, with one-instruction lookahead so an
//!    arithmetic result headed for a stack slot is computed directly
//!    into the slot's home register.
//!
//! Behavior differences between the historical backend variants are
//! captured by an explicit [`Policy`] value instead of parallel
//! implementations.

pub mod classify;
pub mod labels;
pub mod lower;
pub mod policy;
pub mod regalloc;

pub use lower::{lower_function, LoweringError};
pub use policy::{ConstPolicy, Policy, RegNaming};

use log::{debug, info};
use mcc_codegen::AsmInst;
use mcc_common::CompilerError;
use mcc_ir::Module;

/// Lower every function of a module, each with a fresh lowering pass
/// instance and its own name as the canonical entry label.
pub fn lower_module(module: &Module, policy: Policy) -> Result<Vec<AsmInst>, CompilerError> {
    info!("lowering module '{}'", module.name);
    let mut all_instructions = Vec::new();

    for function in &module.functions {
        debug!(
            "lowering function '{}' with {} blocks",
            function.name,
            function.blocks.len()
        );
        let code = lower_function(function, &function.name, policy)
            .map_err(|e| CompilerError::lowering_error(&function.name, e.to_string()))?;
        all_instructions.extend(code);
    }

    info!(
        "module lowering complete, generated {} instructions",
        all_instructions.len()
    );
    Ok(all_instructions)
}
