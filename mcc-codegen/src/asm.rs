//! Assembly Instruction Definitions
//!
//! The target is a simple register machine: three-address integer
//! arithmetic, immediate loads, an implicit flags register written by
//! `cmp` and read by `beq`, and label-based branching. Register names
//! are not fixed here - the backend's naming policy decides whether a
//! `Reg` is a virtual temporary (`t0`) or a physical register (`r0`).

use std::fmt;

/// The designated return-value register
pub const RETURN_REG: &str = "a0";

/// A named register handle
///
/// Compared by name; allocated only by the backend's register allocator,
/// which guarantees monotonically increasing, never-reused names within
/// one lowering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reg {
    name: String,
}

impl Reg {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Assembly instructions the lowering pass emits
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    /// rd = immediate
    Li(Reg, i64),

    // Three-address arithmetic: rd = rs <op> rt
    Add(Reg, Reg, Reg),
    Sub(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),

    /// Compare two registers, setting the implicit flags
    Cmp(Reg, Reg),

    /// Branch to label if the flags say equal
    Beq(String),
    /// Unconditional branch to label
    B(String),

    /// rd = rs
    Mov(Reg, Reg),
    /// Return from subroutine
    Ret,

    /// Label declaration
    Label(String),
}

impl AsmInst {
    /// Label declarations are rendered flush-left; everything else is an
    /// instruction line.
    pub fn is_label(&self) -> bool {
        matches!(self, AsmInst::Label(_))
    }
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Li(rd, imm) => write!(f, "li {}, {}", rd, imm),
            AsmInst::Add(rd, rs, rt) => write!(f, "add {}, {}, {}", rd, rs, rt),
            AsmInst::Sub(rd, rs, rt) => write!(f, "sub {}, {}, {}", rd, rs, rt),
            AsmInst::Mul(rd, rs, rt) => write!(f, "mul {}, {}, {}", rd, rs, rt),
            AsmInst::Cmp(rs, rt) => write!(f, "cmp {}, {}", rs, rt),
            AsmInst::Beq(label) => write!(f, "beq {}", label),
            AsmInst::B(label) => write!(f, "b {}", label),
            AsmInst::Mov(rd, rs) => write!(f, "mov {}, {}", rd, rs),
            AsmInst::Ret => write!(f, "ret"),
            AsmInst::Label(name) => write!(f, "{}:", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reg_display() {
        assert_eq!(format!("{}", Reg::new("t3")), "t3");
        assert_eq!(Reg::new("t0"), Reg::new("t0"));
    }

    #[test]
    fn test_instruction_display() {
        let t0 = Reg::new("t0");
        let t1 = Reg::new("t1");
        let t2 = Reg::new("t2");

        assert_eq!(format!("{}", AsmInst::Li(t0.clone(), 42)), "li t0, 42");
        assert_eq!(
            format!("{}", AsmInst::Add(t2.clone(), t0.clone(), t1.clone())),
            "add t2, t0, t1"
        );
        assert_eq!(format!("{}", AsmInst::Cmp(t0.clone(), t1.clone())), "cmp t0, t1");
        assert_eq!(format!("{}", AsmInst::Beq("label_0".to_string())), "beq label_0");
        assert_eq!(format!("{}", AsmInst::B("main".to_string())), "b main");
        assert_eq!(
            format!("{}", AsmInst::Mov(Reg::new(RETURN_REG), t2)),
            "mov a0, t2"
        );
        assert_eq!(format!("{}", AsmInst::Ret), "ret");
        assert_eq!(format!("{}", AsmInst::Label("main".to_string())), "main:");
    }

    #[test]
    fn test_is_label() {
        assert!(AsmInst::Label("x".to_string()).is_label());
        assert!(!AsmInst::Ret.is_label());
    }
}
