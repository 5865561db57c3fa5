//! Core toolchain for the FALSE stack language.
//!
//! The pipeline is roughly:
//!
//!   source .f
//!     -> validator  (every syntax defect, as diagnostics)
//!     -> stripper   (comments and whitespace removed)
//!     -> parser     (operation tree in a block arena)
//!     -> interpreter, or bytecode (.fbc) and back
//!
//! Higher-level tools (the CLI, editors) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Language definition
// ---------------------------------------------------------------------

pub mod instructions;
pub mod language;

// ---------------------------------------------------------------------
// Front-end: validation, stripping and parsing
// ---------------------------------------------------------------------

pub mod parser;
pub mod stripper;
pub mod validator;

// ---------------------------------------------------------------------
// Program representation and bytecode
// ---------------------------------------------------------------------

pub mod bytecode;
pub mod operation;

// ---------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------

pub mod interpreter;
pub mod value;

// ---------------------------------------------------------------------
// Compiler orchestration and source discovery
// ---------------------------------------------------------------------

pub mod compiler;
pub mod sources;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{compile, compile_file, load_program};
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{BytecodeError, BytecodeErrorKind, CoreError, RuntimeFault};
pub use instructions::Instruction;
pub use interpreter::{AbortIndicator, ExecutionObserver, Interpreter, Machine, NoopObserver};
pub use operation::{Block, BlockId, Op, Operation, Program};
pub use value::{Stack, Value, Variables};
