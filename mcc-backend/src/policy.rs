//! Lowering policies
//!
//! The historical code carried several near-duplicate backend variants
//! differing in register naming and constant handling. They survive here
//! as one core parameterized by an explicit policy value.

/// Register naming strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegNaming {
    /// Infinite virtual temporaries `t0, t1, ...`, suited to a later
    /// allocation stage
    #[default]
    Virtual,
    /// Fixed physical pool `r0..r10`; exhaustion is a hard error, never
    /// a silent alias
    Physical,
}

/// Constant classification strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstPolicy {
    /// Materialize constants used in computation, defer store-only
    /// initializers to their store, elide allocation-size and dead
    /// constants (and the setup zero-store)
    #[default]
    ElideUnused,
    /// Materialize every constant at its definition
    MaterializeAll,
}

/// Complete lowering policy for one pass instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    pub reg_naming: RegNaming,
    pub constants: ConstPolicy,
}
