//! Operation tree of a compiled program.
//!
//! Lambdas nest arbitrarily deep. Instead of boxing child lists inside the
//! operations, every block lives in one arena owned by the [`Program`] and a
//! lambda refers to its body by [`BlockId`]. Block 0 is the root block.

use std::fmt;

use crate::instructions::Instruction;
use crate::language::{
    CHARACTER_DECLARATION, COMMENT_BEGIN, COMMENT_END, INLINE_ASSEMBLY, LAMBDA_BEGIN, LAMBDA_END,
    STRING_DELIMITER,
};

/// Handle of a block inside a [`Program`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    pub const ROOT: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an operation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Integer(i32),
    Character(char),
    /// Inline assembly; kept in the tree but has no runtime effect.
    Assembly(i32),
    /// Pushes the address of the variable `a`..=`z`.
    Variable(char),
    PrintString(String),
    Lambda(BlockId),
    Instruction(Instruction),
}

impl Op {
    fn is_numeric(&self) -> bool {
        matches!(self, Op::Integer(_) | Op::Assembly(_))
    }
}

/// A single node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Sequence number in source order, starting at 1. Only used to point
    /// runtime faults at the failing operation.
    pub index: u32,
    pub op: Op,
}

impl Operation {
    pub fn new(index: u32, op: Op) -> Self {
        Operation { index, op }
    }
}

/// Ordered body of a lambda (or of the program itself).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    operations: Vec<Operation>,
}

impl Block {
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A compiled program: the arena of all blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    blocks: Vec<Block>,
}

impl Program {
    pub fn root(&self) -> &Block {
        &self.blocks[BlockId::ROOT.index()]
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Total number of operations over all blocks.
    pub fn operation_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    /// Render the program back into compact FALSE source.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        self.write_block(BlockId::ROOT, &mut out);
        out
    }

    fn write_block(&self, id: BlockId, out: &mut String) {
        let Some(block) = self.block(id) else {
            return;
        };
        let mut prev_numeric = false;
        for operation in block.operations() {
            if let Op::Assembly(value) = operation.op {
                if value < 0 {
                    // No source spelling exists; assembly never runs, so a comment is equivalent.
                    out.push(COMMENT_BEGIN);
                    out.push_str(&value.to_string());
                    out.push(INLINE_ASSEMBLY);
                    out.push(COMMENT_END);
                    continue;
                }
            }
            if operation.op.is_numeric() && prev_numeric {
                out.push(' ');
            }
            match &operation.op {
                Op::Integer(i32::MIN) => {
                    out.push_str(&i32::MAX.to_string());
                    out.push(Instruction::Negate.symbol());
                    out.push('1');
                    out.push(Instruction::Subtract.symbol());
                }
                Op::Integer(value) if *value < 0 => {
                    // Source literals are never negative.
                    out.push_str(&value.unsigned_abs().to_string());
                    out.push(Instruction::Negate.symbol());
                }
                Op::Integer(value) => out.push_str(&value.to_string()),
                Op::Assembly(value) => {
                    out.push_str(&value.to_string());
                    out.push(INLINE_ASSEMBLY);
                }
                Op::Character(ch) => {
                    out.push(CHARACTER_DECLARATION);
                    out.push(*ch);
                }
                Op::Variable(name) => out.push(*name),
                Op::PrintString(text) => {
                    out.push(STRING_DELIMITER);
                    out.push_str(text);
                    out.push(STRING_DELIMITER);
                }
                Op::Lambda(body) => {
                    out.push(LAMBDA_BEGIN);
                    self.write_block(*body, out);
                    out.push(LAMBDA_END);
                }
                Op::Instruction(instruction) => out.push(instruction.symbol()),
            }
            // Only a bare digit run can glue onto a following number.
            prev_numeric = matches!(operation.op, Op::Integer(value) if value >= 0);
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disassemble())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Integer(value) => write!(f, "{value}"),
            Op::Character(ch) => write!(f, "{CHARACTER_DECLARATION}{ch}"),
            Op::Assembly(value) => write!(f, "{value}{INLINE_ASSEMBLY}"),
            Op::Variable(name) => write!(f, "{name}"),
            Op::PrintString(text) => write!(f, "{STRING_DELIMITER}{text}{STRING_DELIMITER}"),
            Op::Lambda(body) => write!(f, "{LAMBDA_BEGIN}{body}{LAMBDA_END}"),
            Op::Instruction(instruction) => write!(f, "{}", instruction.symbol()),
        }
    }
}

/// Incremental construction of a [`Program`].
///
/// Shared by the parser and the bytecode decoder so both number operations
/// and allocate blocks the same way: indices count up from 1 across all
/// blocks, and a lambda takes its index and block before its children.
#[derive(Debug)]
pub struct ProgramBuilder {
    blocks: Vec<Block>,
    next_index: u32,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            blocks: vec![Block::default()],
            next_index: 1,
        }
    }

    /// Take the next operation index.
    pub fn next_index(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Allocate an empty block for a lambda body.
    pub fn reserve_block(&mut self) -> BlockId {
        self.blocks.push(Block::default());
        BlockId((self.blocks.len() - 1) as u32)
    }

    /// Append `op` to `block` with a fresh index.
    pub fn push(&mut self, block: BlockId, op: Op) {
        let index = self.next_index();
        self.push_indexed(block, Operation::new(index, op));
    }

    /// Append an operation whose index was taken earlier.
    pub fn push_indexed(&mut self, block: BlockId, operation: Operation) {
        if let Some(target) = self.blocks.get_mut(block.index()) {
            target.operations.push(operation);
        }
    }

    pub fn finish(self) -> Program {
        Program {
            blocks: self.blocks,
        }
    }
}
