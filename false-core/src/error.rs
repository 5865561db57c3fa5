use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostics;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("source directory was not found at {0}")]
    MissingSources(PathBuf),
    #[error("compilation failed:\n{0}")]
    Compile(#[from] Diagnostics),
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
    #[error(transparent)]
    Runtime(#[from] RuntimeFault),
}

/// A bytecode stream that does not follow the framing rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bytecode has been illegally altered: {kind} (offset {offset})")]
pub struct BytecodeError {
    /// Byte offset at which decoding stopped.
    pub offset: usize,
    pub kind: BytecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeErrorKind {
    #[error("missing {0} marker")]
    MissingSentinel(&'static str),
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("stream ends inside an operand")]
    Truncated,
    #[error("block is never closed")]
    UnclosedBlock,
    #[error("string is never closed")]
    UnclosedString,
    #[error("block end without an open block")]
    StrayBlockEnd,
    #[error("trailing bytes after the program end")]
    TrailingBytes,
    #[error("invalid character code {0:#06x}")]
    InvalidCharacter(u16),
    #[error("invalid variable code {0:#06x}")]
    InvalidVariable(u16),
}

impl BytecodeError {
    pub fn new(offset: usize, kind: BytecodeErrorKind) -> Self {
        BytecodeError { offset, kind }
    }
}

/// A fault raised while executing a program.
///
/// `index` is the operation index of the failing instruction.
#[derive(Debug, Error)]
pub enum RuntimeFault {
    #[error("operation {index}: not enough values on the stack")]
    StackUnderflow { index: u32 },
    #[error("operation {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: u32,
        expected: &'static str,
        found: String,
    },
    #[error("operation {index}: cannot pick item {pick} from a stack of depth {depth}")]
    PickOutOfRange { index: u32, pick: i32, depth: usize },
    #[error("operation {index}: variable {variable} has not been assigned")]
    UnsetVariable { index: u32, variable: char },
    #[error("operation {index}: division by zero")]
    DivisionByZero { index: u32 },
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeFault {
    /// Operation index the fault was raised at, if any.
    pub fn index(&self) -> Option<u32> {
        match self {
            RuntimeFault::StackUnderflow { index }
            | RuntimeFault::TypeMismatch { index, .. }
            | RuntimeFault::PickOutOfRange { index, .. }
            | RuntimeFault::UnsetVariable { index, .. }
            | RuntimeFault::DivisionByZero { index } => Some(*index),
            RuntimeFault::Io(_) => None,
        }
    }
}
