//! Memory-oriented SSA IR
//!
//! A `Module` owns an ordered sequence of `Function`s; each function owns
//! its basic blocks in declaration order, and each block an ordered list
//! of instructions. Every value-producing instruction carries exactly one
//! `ValueId` result identity; operands reference results by identity.
//!
//! The module is immutable once built: the backend only reads this graph.

use mcc_common::{BlockId, ValueGenerator, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
        };
        write!(f, "{}", op_str)
    }
}

/// IR Instruction
///
/// A closed enum: the backend dispatch over instruction kinds is
/// exhaustive, so an unhandled kind is a compile error rather than a
/// silent runtime skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Integer constant: result = const value
    Const { result: ValueId, value: i64 },

    /// Stack-slot allocation: result = alloca size
    ///
    /// `size` references a constant supplying the byte count. No memory
    /// is ever reserved; the backend treats slots as register homes.
    Alloca { result: ValueId, size: ValueId },

    /// Memory write: store value, addr
    Store { value: ValueId, addr: ValueId },

    /// Memory read: result = load addr
    Load { result: ValueId, addr: ValueId },

    /// Arithmetic: result = op lhs, rhs
    Binary {
        result: ValueId,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Integer comparison: result = cmp lhs, rhs
    ///
    /// The result is consumed implicitly by a following `CondBr`; the IR
    /// carries no richer predicate than equal / not-equal.
    Cmp {
        result: ValueId,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Unconditional branch: br target
    Br { target: BlockId },

    /// Conditional branch: cond_br cond, true_target, false_target
    CondBr {
        cond: ValueId,
        true_target: BlockId,
        false_target: BlockId,
    },

    /// Return: ret value
    Ret { value: ValueId },
}

impl Instruction {
    /// The result identity this instruction produces, if any
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Instruction::Const { result, .. }
            | Instruction::Alloca { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::Binary { result, .. }
            | Instruction::Cmp { result, .. } => Some(*result),
            Instruction::Store { .. }
            | Instruction::Br { .. }
            | Instruction::CondBr { .. }
            | Instruction::Ret { .. } => None,
        }
    }

    /// Whether this instruction ends a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Br { .. } | Instruction::CondBr { .. } | Instruction::Ret { .. }
        )
    }

    /// Successor blocks carried by this instruction (terminators only)
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Instruction::Br { target } => vec![*target],
            Instruction::CondBr {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Const { result, value } => write!(f, "%{} = const {}", result, value),
            Instruction::Alloca { result, size } => write!(f, "%{} = alloca %{}", result, size),
            Instruction::Store { value, addr } => write!(f, "store %{}, %{}", value, addr),
            Instruction::Load { result, addr } => write!(f, "%{} = load %{}", result, addr),
            Instruction::Binary {
                result,
                op,
                lhs,
                rhs,
            } => write!(f, "%{} = {} %{}, %{}", result, op, lhs, rhs),
            Instruction::Cmp { result, lhs, rhs } => {
                write!(f, "%{} = cmp %{}, %{}", result, lhs, rhs)
            }
            Instruction::Br { target } => write!(f, "br ^bb{}", target),
            Instruction::CondBr {
                cond,
                true_target,
                false_target,
            } => write!(f, "cond_br %{}, ^bb{}, ^bb{}", cond, true_target, false_target),
            Instruction::Ret { value } => write!(f, "ret %{}", value),
        }
    }
}

/// Basic Block - an ordered instruction list ending in one terminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(id: BlockId, name: String) -> Self {
        Self {
            id,
            name,
            instructions: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The block's terminator, if it has one
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    pub fn has_terminator(&self) -> bool {
        self.terminator().is_some()
    }

    /// Successor blocks, read off the terminator
    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator()
            .map(|t| t.successors())
            .unwrap_or_default()
    }
}

/// Function - ordered basic blocks, declaration order = emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: String) -> Self {
        Self {
            name,
            blocks: Vec::new(),
        }
    }

    pub fn add_block(&mut self, block: BasicBlock) {
        self.blocks.push(block);
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// All instructions in program order (block declaration order)
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func @{} {{", self.name)?;
        for block in &self.blocks {
            writeln!(f, "^{}:", block.name)?;
            for instr in &block.instructions {
                writeln!(f, "  {}", instr)?;
            }
        }
        write!(f, "}}")
    }
}

/// IR Module - the ownership root of a compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: String) -> Self {
        Self {
            name,
            functions: Vec::new(),
        }
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", function)?;
        }
        Ok(())
    }
}

/// Builder for constructing IR programmatically (used heavily in tests)
pub struct FunctionBuilder {
    function: Function,
    values: ValueGenerator,
    current_block: Option<usize>,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            function: Function::new(name.to_string()),
            values: ValueGenerator::new(),
            current_block: None,
        }
    }

    /// Append a new empty block and make it the insertion point
    pub fn new_block(&mut self, name: &str) -> BlockId {
        let id = self.function.blocks.len() as BlockId;
        self.function.add_block(BasicBlock::new(id, name.to_string()));
        self.current_block = Some(id as usize);
        id
    }

    /// Move the insertion point to an existing block
    pub fn select_block(&mut self, id: BlockId) {
        assert!((id as usize) < self.function.blocks.len(), "no such block");
        self.current_block = Some(id as usize);
    }

    pub fn const_val(&mut self, value: i64) -> ValueId {
        let result = self.values.new_value();
        self.push(Instruction::Const { result, value });
        result
    }

    pub fn alloca(&mut self, size: ValueId) -> ValueId {
        let result = self.values.new_value();
        self.push(Instruction::Alloca { result, size });
        result
    }

    pub fn store(&mut self, value: ValueId, addr: ValueId) {
        self.push(Instruction::Store { value, addr });
    }

    pub fn load(&mut self, addr: ValueId) -> ValueId {
        let result = self.values.new_value();
        self.push(Instruction::Load { result, addr });
        result
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let result = self.values.new_value();
        self.push(Instruction::Binary {
            result,
            op,
            lhs,
            rhs,
        });
        result
    }

    pub fn add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn cmp(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let result = self.values.new_value();
        self.push(Instruction::Cmp { result, lhs, rhs });
        result
    }

    pub fn br(&mut self, target: BlockId) {
        self.push(Instruction::Br { target });
    }

    pub fn cond_br(&mut self, cond: ValueId, true_target: BlockId, false_target: BlockId) {
        self.push(Instruction::CondBr {
            cond,
            true_target,
            false_target,
        });
    }

    pub fn ret(&mut self, value: ValueId) {
        self.push(Instruction::Ret { value });
    }

    pub fn build(self) -> Function {
        self.function
    }

    fn push(&mut self, instr: Instruction) {
        let idx = self
            .current_block
            .expect("no current block; call new_block first");
        self.function.blocks[idx].add_instruction(instr);
    }
}
