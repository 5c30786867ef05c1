//! Textual IR Parser
//!
//! Parses the token stream into the IR graph. Functions look like:
//!
//! ```text
//! func @main {
//! ^entry:
//!   %size = const 4
//!   %a = alloca %size
//!   %one = const 1
//!   store %one, %a
//!   %v = load %a
//!   ret %v
//! }
//! ```
//!
//! Values are single-assignment and must be defined before use; block
//! references may point forward. Every block must end with exactly one
//! terminator, so parsed modules always satisfy the lowering pass's
//! input contract.

use crate::error::ParseError;
use crate::ir::{BasicBlock, BinaryOp, Function, Instruction, Module};
use crate::lexer::{Lexer, Token, TokenType};
use log::debug;
use mcc_common::{BlockId, SourceLocation, ValueGenerator, ValueId};
use std::collections::HashMap;

/// Parse a complete textual IR module
pub fn parse_module(source: &str, filename: &str) -> Result<Module, ParseError> {
    let tokens = Lexer::new(source, filename).tokenize()?;
    Parser::new(tokens).parse_module(filename)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn parse_module(mut self, name: &str) -> Result<Module, ParseError> {
        let mut module = Module::new(name.to_string());

        while !matches!(self.peek().token_type, TokenType::EndOfFile) {
            let function = self.parse_function()?;
            debug!(
                "parsed function '{}' with {} blocks",
                function.name,
                function.blocks.len()
            );
            module.add_function(function);
        }

        Ok(module)
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        self.expect_keyword("func")?;
        let name = self.expect_func_ref()?;
        self.expect(&TokenType::LeftBrace, "'{'")?;

        let block_ids = self.scan_block_labels()?;
        let mut function = Function::new(name);
        let mut values = ValueScope::new();
        let mut current: Option<BasicBlock> = None;

        loop {
            let token = self.peek().clone();
            match token.token_type {
                TokenType::RightBrace => {
                    self.advance();
                    if let Some(block) = current.take() {
                        Self::check_terminated(&block)?;
                        function.add_block(block);
                    }
                    return Ok(function);
                }
                TokenType::BlockRef(ref block_name) => {
                    self.advance();
                    self.expect(&TokenType::Colon, "':'")?;
                    if let Some(block) = current.take() {
                        Self::check_terminated(&block)?;
                        function.add_block(block);
                    }
                    let id = block_ids[block_name.as_str()];
                    current = Some(BasicBlock::new(id, block_name.clone()));
                }
                _ => {
                    let Some(block) = current.as_mut() else {
                        return Err(ParseError::UnexpectedToken {
                            found: token.token_type.to_string(),
                            expected: "a block label".to_string(),
                            location: token.location,
                        });
                    };
                    if block.has_terminator() {
                        return Err(ParseError::InstructionAfterTerminator {
                            name: block.name.clone(),
                            location: token.location,
                        });
                    }
                    let instr = self.parse_instruction(&mut values, &block_ids)?;
                    block.add_instruction(instr);
                }
            }
        }
    }

    /// Pre-scan the current function body so forward block references
    /// resolve to declaration-order ids.
    fn scan_block_labels(&self) -> Result<HashMap<String, BlockId>, ParseError> {
        let mut ids = HashMap::new();
        let mut next_id: BlockId = 0;

        let mut pos = self.position;
        while pos < self.tokens.len() {
            let token = &self.tokens[pos];
            match &token.token_type {
                TokenType::RightBrace | TokenType::EndOfFile => break,
                TokenType::BlockRef(name)
                    if matches!(
                        self.tokens.get(pos + 1).map(|t| &t.token_type),
                        Some(TokenType::Colon)
                    ) =>
                {
                    if ids.insert(name.clone(), next_id).is_some() {
                        return Err(ParseError::DuplicateBlock {
                            name: name.clone(),
                            location: token.location.clone(),
                        });
                    }
                    next_id += 1;
                }
                _ => {}
            }
            pos += 1;
        }

        Ok(ids)
    }

    fn parse_instruction(
        &mut self,
        values: &mut ValueScope,
        blocks: &HashMap<String, BlockId>,
    ) -> Result<Instruction, ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::ValueRef(result_name) => {
                self.expect(&TokenType::Equal, "'='")?;
                let (op, op_loc) = self.expect_ident()?;
                let instr = match op.as_str() {
                    "const" => {
                        let value = self.expect_int()?;
                        let result = values.define(&result_name, &token.location)?;
                        Instruction::Const { result, value }
                    }
                    "alloca" => {
                        let size = self.operand(values)?;
                        let result = values.define(&result_name, &token.location)?;
                        Instruction::Alloca { result, size }
                    }
                    "load" => {
                        let addr = self.operand(values)?;
                        let result = values.define(&result_name, &token.location)?;
                        Instruction::Load { result, addr }
                    }
                    "add" | "sub" | "mul" => {
                        let lhs = self.operand(values)?;
                        self.expect(&TokenType::Comma, "','")?;
                        let rhs = self.operand(values)?;
                        let result = values.define(&result_name, &token.location)?;
                        let op = match op.as_str() {
                            "add" => BinaryOp::Add,
                            "sub" => BinaryOp::Sub,
                            _ => BinaryOp::Mul,
                        };
                        Instruction::Binary {
                            result,
                            op,
                            lhs,
                            rhs,
                        }
                    }
                    "cmp" => {
                        let lhs = self.operand(values)?;
                        self.expect(&TokenType::Comma, "','")?;
                        let rhs = self.operand(values)?;
                        let result = values.define(&result_name, &token.location)?;
                        Instruction::Cmp { result, lhs, rhs }
                    }
                    _ => {
                        return Err(ParseError::UnknownOperation {
                            name: op,
                            location: op_loc,
                        })
                    }
                };
                Ok(instr)
            }
            TokenType::Ident(op) => match op.as_str() {
                "store" => {
                    let value = self.operand(values)?;
                    self.expect(&TokenType::Comma, "','")?;
                    let addr = self.operand(values)?;
                    Ok(Instruction::Store { value, addr })
                }
                "br" => {
                    let target = self.block_ref(blocks)?;
                    Ok(Instruction::Br { target })
                }
                "cond_br" => {
                    let cond = self.operand(values)?;
                    self.expect(&TokenType::Comma, "','")?;
                    let true_target = self.block_ref(blocks)?;
                    self.expect(&TokenType::Comma, "','")?;
                    let false_target = self.block_ref(blocks)?;
                    Ok(Instruction::CondBr {
                        cond,
                        true_target,
                        false_target,
                    })
                }
                "ret" => {
                    let value = self.operand(values)?;
                    Ok(Instruction::Ret { value })
                }
                _ => Err(ParseError::UnknownOperation {
                    name: op,
                    location: token.location,
                }),
            },
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "an instruction".to_string(),
                location: token.location,
            }),
        }
    }

    fn operand(&mut self, values: &ValueScope) -> Result<ValueId, ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::ValueRef(name) => values.lookup(&name, &token.location),
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "a value operand".to_string(),
                location: token.location,
            }),
        }
    }

    fn block_ref(&mut self, blocks: &HashMap<String, BlockId>) -> Result<BlockId, ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::BlockRef(name) => {
                blocks
                    .get(&name)
                    .copied()
                    .ok_or(ParseError::UnknownBlock {
                        name,
                        location: token.location,
                    })
            }
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "a block reference".to_string(),
                location: token.location,
            }),
        }
    }

    fn check_terminated(block: &BasicBlock) -> Result<(), ParseError> {
        if block.has_terminator() {
            Ok(())
        } else {
            Err(ParseError::MissingTerminator {
                name: block.name.clone(),
            })
        }
    }

    fn peek(&self) -> &Token {
        // The token stream always ends with EndOfFile
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenType, what: &str) -> Result<(), ParseError> {
        let token = self.advance();
        if &token.token_type == expected {
            Ok(())
        } else if matches!(token.token_type, TokenType::EndOfFile) {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::UnexpectedToken {
                found: token.token_type.to_string(),
                expected: what.to_string(),
                location: token.location,
            })
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::Ident(ref name) if name == keyword => Ok(()),
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: format!("'{}'", keyword),
                location: token.location,
            }),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, SourceLocation), ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::Ident(name) => Ok((name, token.location)),
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "an operation name".to_string(),
                location: token.location,
            }),
        }
    }

    fn expect_func_ref(&mut self) -> Result<String, ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::FuncRef(name) => Ok(name),
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "a function name like @main".to_string(),
                location: token.location,
            }),
        }
    }

    fn expect_int(&mut self) -> Result<i64, ParseError> {
        let token = self.advance();
        match token.token_type {
            TokenType::IntLiteral(value) => Ok(value),
            TokenType::EndOfFile => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "an integer literal".to_string(),
                location: token.location,
            }),
        }
    }
}

/// Per-function value names, enforcing single assignment and
/// definition-before-use
struct ValueScope {
    ids: HashMap<String, ValueId>,
    generator: ValueGenerator,
}

impl ValueScope {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
            generator: ValueGenerator::new(),
        }
    }

    fn define(&mut self, name: &str, location: &SourceLocation) -> Result<ValueId, ParseError> {
        if self.ids.contains_key(name) {
            return Err(ParseError::Redefinition {
                name: name.to_string(),
                location: location.clone(),
            });
        }
        let id = self.generator.new_value();
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    fn lookup(&self, name: &str, location: &SourceLocation) -> Result<ValueId, ParseError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ParseError::UnknownValue {
                name: name.to_string(),
                location: location.clone(),
            })
    }
}
