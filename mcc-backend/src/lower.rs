//! Instruction Emission
//!
//! The single forward walk over a function: one pass over each block's
//! instructions in declaration order, dispatching on instruction kind,
//! consulting the binding maps populated by earlier instructions and
//! extending them for later ones. Loads never touch memory - they are
//! resolved by scanning the pending-store list for the most recent write
//! to the identity-equal address and propagating that value's binding.
//!
//! All mutable state lives in one `FunctionLowerer` instance, built
//! fresh per function; nothing is shared across lowerings.

use crate::classify::{classify_constant, ConstClass};
use crate::labels::assign_labels;
use crate::policy::Policy;
use crate::regalloc::RegAllocator;
use log::{debug, trace};
use mcc_codegen::{AsmInst, Reg, RETURN_REG};
use mcc_common::{BlockId, InstrPos, ValueId};
use mcc_ir::{BasicBlock, Function, Instruction};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that abort one function's lowering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoweringError {
    /// An operand was consulted with no register or constant binding.
    /// The defining instruction was skipped incorrectly or appears after
    /// this use, which SSA form forbids.
    #[error("unresolved operand %{value} at {pos}")]
    UnresolvedOperand { value: ValueId, pos: InstrPos },

    /// A load found no prior store to an identity-equal address
    #[error("load at {pos} has no matching store for address %{addr}")]
    UnresolvedLoad { addr: ValueId, pos: InstrPos },

    /// The winning store lives in a different block; cross-block
    /// forwarding is unsupported and must not silently pick a store
    #[error("load at {pos} would forward across blocks from the store at {store_pos}")]
    CrossBlockForward { pos: InstrPos, store_pos: InstrPos },

    /// A branch targets a block the label pass never saw
    #[error("branch at {pos} targets unknown block {block}")]
    UnknownBlock { block: BlockId, pos: InstrPos },

    /// The physical register pool ran out
    #[error("physical register pool exhausted after {0} registers")]
    PoolExhausted(u32),
}

/// Lower one function to assembly instructions.
///
/// `entry_label` names the first block; it is the externally callable
/// entry point of the generated text.
pub fn lower_function(
    function: &Function,
    entry_label: &str,
    policy: Policy,
) -> Result<Vec<AsmInst>, LoweringError> {
    FunctionLowerer::new(function, policy).lower(entry_label)
}

/// A store observed during the walk, kept for load forwarding
struct PendingStore {
    value: ValueId,
    addr: ValueId,
    pos: InstrPos,
}

/// Single-use lowering pass over one function
struct FunctionLowerer<'a> {
    function: &'a Function,
    policy: Policy,
    regs: RegAllocator,
    /// Block identity -> label, fixed before any body is emitted
    labels: HashMap<BlockId, String>,
    /// Result identity -> register; a binding, once made, holds for the
    /// rest of the function
    value_regs: HashMap<ValueId, Reg>,
    /// Result identity -> literal, for constants not yet promoted to a
    /// register
    const_values: HashMap<ValueId, i64>,
    /// Observed stores in program order
    pending_stores: Vec<PendingStore>,
    code: Vec<AsmInst>,
}

impl<'a> FunctionLowerer<'a> {
    fn new(function: &'a Function, policy: Policy) -> Self {
        Self {
            function,
            policy,
            regs: RegAllocator::new(policy.reg_naming),
            labels: HashMap::new(),
            value_regs: HashMap::new(),
            const_values: HashMap::new(),
            pending_stores: Vec::new(),
            code: Vec::new(),
        }
    }

    fn lower(mut self, entry_label: &str) -> Result<Vec<AsmInst>, LoweringError> {
        // Labels first, bodies second: forward branches need labels of
        // blocks that have not been emitted yet.
        self.labels = assign_labels(self.function, entry_label);

        let function = self.function;
        for (block_idx, block) in function.blocks.iter().enumerate() {
            debug!(
                "block ^{} ({} instructions)",
                block.name,
                block.instructions.len()
            );
            self.code
                .push(AsmInst::Label(self.labels[&block.id].clone()));

            for (index, instr) in block.instructions.iter().enumerate() {
                let pos = InstrPos::new(block_idx, index);
                trace!("lowering {} at {}", instr, pos);
                self.lower_instruction(block, instr, pos)?;
            }
        }

        self.code.push(AsmInst::Ret);
        Ok(self.code)
    }

    fn lower_instruction(
        &mut self,
        block: &BasicBlock,
        instr: &Instruction,
        pos: InstrPos,
    ) -> Result<(), LoweringError> {
        match instr {
            Instruction::Const { result, value } => self.lower_const(*result, *value),

            // Allocation is compile-time bookkeeping; the slot's home
            // register appears lazily, at the first store that needs it.
            Instruction::Alloca { .. } => Ok(()),

            Instruction::Store { value, addr } => self.lower_store(*value, *addr, pos),

            Instruction::Load { result, addr } => self.lower_load(*result, *addr, pos),

            Instruction::Binary {
                result,
                op,
                lhs,
                rhs,
            } => {
                let lhs_reg = self.resolve(*lhs, pos)?;
                let rhs_reg = self.resolve(*rhs, pos)?;

                // Lookahead: an arithmetic result that the very next
                // instruction stores is computed directly into the
                // slot's home register, saving a register and a copy.
                let dest = match block.instructions.get(pos.index + 1) {
                    Some(Instruction::Store { value, addr }) if value == result => {
                        self.slot_register(*addr)?
                    }
                    _ => self.regs.alloc()?,
                };
                self.value_regs.insert(*result, dest.clone());

                let inst = match op {
                    mcc_ir::BinaryOp::Add => AsmInst::Add(dest, lhs_reg, rhs_reg),
                    mcc_ir::BinaryOp::Sub => AsmInst::Sub(dest, lhs_reg, rhs_reg),
                    mcc_ir::BinaryOp::Mul => AsmInst::Mul(dest, lhs_reg, rhs_reg),
                };
                self.code.push(inst);
                Ok(())
            }

            // The comparison result is consumed implicitly through the
            // flags by the following cond_br; it binds no register.
            Instruction::Cmp { lhs, rhs, .. } => {
                let lhs_reg = self.resolve(*lhs, pos)?;
                let rhs_reg = self.resolve(*rhs, pos)?;
                self.code.push(AsmInst::Cmp(lhs_reg, rhs_reg));
                Ok(())
            }

            Instruction::Br { target } => {
                let label = self.label(*target, pos)?;
                self.code.push(AsmInst::B(label));
                Ok(())
            }

            Instruction::CondBr {
                true_target,
                false_target,
                ..
            } => {
                let true_label = self.label(*true_target, pos)?;
                let false_label = self.label(*false_target, pos)?;
                self.code.push(AsmInst::Beq(true_label));
                self.code.push(AsmInst::B(false_label));
                Ok(())
            }

            Instruction::Ret { value } => {
                let reg = self.resolve(*value, pos)?;
                self.code.push(AsmInst::Mov(Reg::new(RETURN_REG), reg));
                Ok(())
            }
        }
    }

    fn lower_const(&mut self, result: ValueId, value: i64) -> Result<(), LoweringError> {
        match classify_constant(
            self.function,
            result,
            value,
            self.regs.allocated(),
            self.policy.constants,
        ) {
            ConstClass::Materialize => {
                let reg = self.regs.alloc()?;
                self.code.push(AsmInst::Li(reg.clone(), value));
                self.value_regs.insert(result, reg);
            }
            ConstClass::Defer => {
                self.const_values.insert(result, value);
            }
            ConstClass::Elide => {
                trace!("eliding constant %{} = {}", result, value);
            }
        }
        Ok(())
    }

    fn lower_store(
        &mut self,
        value: ValueId,
        addr: ValueId,
        pos: InstrPos,
    ) -> Result<(), LoweringError> {
        self.pending_stores.push(PendingStore { value, addr, pos });

        // A deferred constant initializer materializes here, into a
        // fresh register bound to the stored value. Each store gets its
        // own register: a load binding taken before a later store to the
        // same address must keep seeing the earlier value.
        // Register-bound values need no code: a later load forwards
        // straight to their register, and an arithmetic result one
        // instruction back already wrote its register via the lookahead.
        if let Some(&literal) = self.const_values.get(&value) {
            let reg = self.regs.alloc()?;
            self.code.push(AsmInst::Li(reg.clone(), literal));
            self.value_regs.insert(value, reg);
        }
        Ok(())
    }

    fn lower_load(
        &mut self,
        result: ValueId,
        addr: ValueId,
        pos: InstrPos,
    ) -> Result<(), LoweringError> {
        // Most recently observed store to the identity-equal address
        // wins; address aliasing beyond identity is not resolved.
        let Some(store) = self
            .pending_stores
            .iter()
            .rev()
            .find(|s| s.addr == addr)
        else {
            return Err(LoweringError::UnresolvedLoad { addr, pos });
        };

        if store.pos.block != pos.block {
            return Err(LoweringError::CrossBlockForward {
                pos,
                store_pos: store.pos,
            });
        }

        // Follow the store's value operand back to its register; every
        // stored value is register-bound by the time a load consults it
        // (deferred constants bind at their store).
        let Some(reg) = self.value_regs.get(&store.value).cloned() else {
            return Err(LoweringError::UnresolvedOperand {
                value: store.value,
                pos,
            });
        };

        trace!("forwarding load %{} to {}", result, reg);
        self.value_regs.insert(result, reg);
        Ok(())
    }

    /// The home register standing in for a stack slot's address,
    /// allocated on first use
    fn slot_register(&mut self, addr: ValueId) -> Result<Reg, LoweringError> {
        if let Some(reg) = self.value_regs.get(&addr) {
            return Ok(reg.clone());
        }
        let reg = self.regs.alloc()?;
        self.value_regs.insert(addr, reg.clone());
        Ok(reg)
    }

    fn resolve(&self, value: ValueId, pos: InstrPos) -> Result<Reg, LoweringError> {
        self.value_regs
            .get(&value)
            .cloned()
            .ok_or(LoweringError::UnresolvedOperand { value, pos })
    }

    fn label(&self, block: BlockId, pos: InstrPos) -> Result<String, LoweringError> {
        self.labels
            .get(&block)
            .cloned()
            .ok_or(LoweringError::UnknownBlock { block, pos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ConstPolicy, RegNaming};
    use mcc_ir::FunctionBuilder;
    use pretty_assertions::assert_eq;

    fn lower_default(function: &Function) -> Vec<AsmInst> {
        lower_function(function, "main", Policy::default()).unwrap()
    }

    fn reg(name: &str) -> Reg {
        Reg::new(name)
    }

    #[test]
    fn test_arithmetic_exact_sequence() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let a = builder.const_val(3);
        let b = builder.const_val(4);
        let sum = builder.add(a, b);
        builder.ret(sum);

        let code = lower_default(&builder.build());
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 3),
                AsmInst::Li(reg("t1"), 4),
                AsmInst::Add(reg("t2"), reg("t0"), reg("t1")),
                AsmInst::Mov(reg("a0"), reg("t2")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_store_load_round_trip() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        let v = builder.const_val(7);
        builder.store(v, slot);
        let loaded = builder.load(slot);
        builder.ret(loaded);

        let code = lower_default(&builder.build());
        // The store materializes the deferred constant; the load is
        // pure bookkeeping. No memory access anywhere.
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 7),
                AsmInst::Mov(reg("a0"), reg("t0")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_alloca_only_constant_produces_nothing() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let _slot = builder.alloca(size);
        let v = builder.const_val(1);
        builder.ret(v);

        let code = lower_default(&builder.build());
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 1),
                AsmInst::Mov(reg("a0"), reg("t0")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_setup_zero_store_is_elided() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let zero = builder.const_val(0);
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        builder.store(zero, slot);
        let v = builder.const_val(9);
        builder.store(v, slot);
        let loaded = builder.load(slot);
        builder.ret(loaded);

        let code = lower_default(&builder.build());
        // The scaffolding zero-store vanishes; the real initializer
        // wins the load.
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 9),
                AsmInst::Mov(reg("a0"), reg("t0")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_store_forwarding_skips_the_mov() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        let init = builder.const_val(1);
        builder.store(init, slot);
        let a = builder.load(slot);
        let b = builder.const_val(2);
        let sum = builder.add(a, b);
        builder.store(sum, slot);
        let r = builder.load(slot);
        builder.ret(r);

        let code = lower_default(&builder.build());
        // The add's destination is the register the final load forwards
        // to; the store in between contributes no code and no mov.
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 1),
                AsmInst::Li(reg("t1"), 2),
                AsmInst::Add(reg("t2"), reg("t0"), reg("t1")),
                AsmInst::Mov(reg("a0"), reg("t2")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_last_write_wins() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        let first = builder.const_val(1);
        builder.store(first, slot);
        let second = builder.const_val(2);
        builder.store(second, slot);
        let loaded = builder.load(slot);
        builder.ret(loaded);

        let code = lower_default(&builder.build());
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 1),
                AsmInst::Li(reg("t1"), 2),
                AsmInst::Mov(reg("a0"), reg("t1")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_load_binding_survives_later_store() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        let first = builder.const_val(1);
        builder.store(first, slot);
        let tmp = builder.load(slot);
        let second = builder.const_val(2);
        builder.store(second, slot);
        let doubled = builder.add(tmp, tmp);
        builder.ret(doubled);

        let code = lower_default(&builder.build());
        // tmp was read before the second store; its binding must keep
        // pointing at the first value's register, so the two stores need
        // distinct registers and the add reads the old one.
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 1),
                AsmInst::Li(reg("t1"), 2),
                AsmInst::Add(reg("t2"), reg("t0"), reg("t0")),
                AsmInst::Mov(reg("a0"), reg("t2")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_branch_lowering() {
        let mut builder = FunctionBuilder::new("main");
        let entry = builder.new_block("entry");
        let then_block = builder.new_block("then");
        let else_block = builder.new_block("else");

        builder.select_block(entry);
        let x = builder.const_val(1);
        let y = builder.const_val(2);
        let cond = builder.cmp(x, y);
        builder.cond_br(cond, then_block, else_block);

        builder.select_block(then_block);
        builder.ret(x);

        builder.select_block(else_block);
        builder.ret(y);

        let code = lower_default(&builder.build());
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 1),
                AsmInst::Li(reg("t1"), 2),
                AsmInst::Cmp(reg("t0"), reg("t1")),
                AsmInst::Beq("main_label_0".to_string()),
                AsmInst::B("main_label_1".to_string()),
                AsmInst::Label("main_label_0".to_string()),
                AsmInst::Mov(reg("a0"), reg("t0")),
                AsmInst::Label("main_label_1".to_string()),
                AsmInst::Mov(reg("a0"), reg("t1")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_unconditional_branch() {
        let mut builder = FunctionBuilder::new("main");
        let entry = builder.new_block("entry");
        let exit = builder.new_block("exit");

        builder.select_block(entry);
        builder.br(exit);

        builder.select_block(exit);
        let v = builder.const_val(0);
        builder.ret(v);

        let code = lower_default(&builder.build());
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::B("main_label_0".to_string()),
                AsmInst::Label("main_label_0".to_string()),
                AsmInst::Li(reg("t0"), 0),
                AsmInst::Mov(reg("a0"), reg("t0")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_load_without_store_fails() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        let loaded = builder.load(slot);
        builder.ret(loaded);

        let err = lower_function(&builder.build(), "main", Policy::default()).unwrap_err();
        assert_eq!(
            err,
            LoweringError::UnresolvedLoad {
                addr: 1,
                pos: InstrPos::new(0, 2),
            }
        );
    }

    #[test]
    fn test_unresolved_operand_fails() {
        // A compare result is not register-bound; feeding it into
        // arithmetic trips the consistency check.
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let a = builder.const_val(1);
        let b = builder.const_val(2);
        let cond = builder.cmp(a, b);
        let bad = builder.add(cond, a);
        builder.ret(bad);

        let err = lower_function(&builder.build(), "main", Policy::default()).unwrap_err();
        assert_eq!(
            err,
            LoweringError::UnresolvedOperand {
                value: 2,
                pos: InstrPos::new(0, 3),
            }
        );
    }

    #[test]
    fn test_cross_block_forwarding_fails_loudly() {
        let mut builder = FunctionBuilder::new("main");
        let entry = builder.new_block("entry");
        let exit = builder.new_block("exit");

        builder.select_block(entry);
        let size = builder.const_val(4);
        let slot = builder.alloca(size);
        let v = builder.const_val(3);
        builder.store(v, slot);
        builder.br(exit);

        builder.select_block(exit);
        let loaded = builder.load(slot);
        builder.ret(loaded);

        let err = lower_function(&builder.build(), "main", Policy::default()).unwrap_err();
        assert!(matches!(err, LoweringError::CrossBlockForward { .. }));
    }

    #[test]
    fn test_materialize_all_policy() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let size = builder.const_val(4);
        let _slot = builder.alloca(size);
        let v = builder.const_val(1);
        builder.ret(v);

        let policy = Policy {
            constants: ConstPolicy::MaterializeAll,
            ..Policy::default()
        };
        let code = lower_function(&builder.build(), "main", policy).unwrap();
        // The alloca-size constant gets an li of its own under this
        // policy.
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("t0"), 4),
                AsmInst::Li(reg("t1"), 1),
                AsmInst::Mov(reg("a0"), reg("t1")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_physical_naming_policy() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let a = builder.const_val(3);
        let b = builder.const_val(4);
        let sum = builder.add(a, b);
        builder.ret(sum);

        let policy = Policy {
            reg_naming: RegNaming::Physical,
            ..Policy::default()
        };
        let code = lower_function(&builder.build(), "main", policy).unwrap();
        assert_eq!(
            code,
            vec![
                AsmInst::Label("main".to_string()),
                AsmInst::Li(reg("r0"), 3),
                AsmInst::Li(reg("r1"), 4),
                AsmInst::Add(reg("r2"), reg("r0"), reg("r1")),
                AsmInst::Mov(reg("a0"), reg("r2")),
                AsmInst::Ret,
            ]
        );
    }

    #[test]
    fn test_physical_pool_exhaustion_fails() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let mut last = builder.const_val(0);
        // Each constant+add pair burns two registers; twelve constants
        // alone overflow the eleven-register pool.
        for i in 1..=11 {
            let c = builder.const_val(i);
            last = builder.add(last, c);
        }
        builder.ret(last);

        let policy = Policy {
            reg_naming: RegNaming::Physical,
            ..Policy::default()
        };
        let err = lower_function(&builder.build(), "main", policy).unwrap_err();
        assert_eq!(err, LoweringError::PoolExhausted(11));
    }

    #[test]
    fn test_fresh_instances_are_independent() {
        let mut builder = FunctionBuilder::new("main");
        builder.new_block("entry");
        let a = builder.const_val(5);
        builder.ret(a);
        let function = builder.build();

        // No counter leakage across runs: two fresh passes agree.
        let first = lower_default(&function);
        let second = lower_default(&function);
        assert_eq!(first, second);
    }
}
