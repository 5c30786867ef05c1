//! Register Allocation
//!
//! The lowering pass hands out registers in a strictly increasing
//! sequence: once a result identity is bound to a register it keeps that
//! binding for the rest of the function, and names are never recycled.
//! Under the virtual naming policy the supply is unbounded; under the
//! physical policy a small fixed pool runs out loudly.

use crate::lower::LoweringError;
use crate::policy::RegNaming;
use mcc_codegen::Reg;

/// The physical register pool, in allocation order
pub const PHYSICAL_POOL: [&str; 11] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10",
];

/// Monotonic register allocator for one lowering pass
#[derive(Debug, Clone)]
pub struct RegAllocator {
    naming: RegNaming,
    next: u32,
}

impl RegAllocator {
    pub fn new(naming: RegNaming) -> Self {
        Self { naming, next: 0 }
    }

    /// Allocate the next register
    pub fn alloc(&mut self) -> Result<Reg, LoweringError> {
        let reg = match self.naming {
            RegNaming::Virtual => Reg::new(format!("t{}", self.next)),
            RegNaming::Physical => {
                let Some(name) = PHYSICAL_POOL.get(self.next as usize) else {
                    return Err(LoweringError::PoolExhausted(PHYSICAL_POOL.len() as u32));
                };
                Reg::new(*name)
            }
        };
        self.next += 1;
        Ok(reg)
    }

    /// How many registers have been handed out so far
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
