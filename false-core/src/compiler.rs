use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::bytecode::{self, EXTENSION};
use crate::diagnostic::Diagnostics;
use crate::error::CoreError;
use crate::operation::Program;
use crate::parser::parse;
use crate::stripper::strip;
use crate::validator::validate;

/// Compile FALSE source into a [`Program`].
///
/// The source is validated first; if anything is wrong, every defect is
/// returned together and nothing is parsed.
pub fn compile(source: &str) -> Result<Program, Diagnostics> {
    let diagnostics = Diagnostics::from(validate(source));
    if !diagnostics.is_empty() {
        debug!(count = diagnostics.len(), "validation failed");
        return Err(diagnostics);
    }

    let stripped = strip(source);
    debug!(
        source_chars = source.chars().count(),
        stripped_chars = stripped.chars().count(),
        "stripped source"
    );

    let program = parse(&stripped);
    debug!(
        operations = program.operation_count(),
        blocks = program.blocks().len(),
        "parsed program"
    );
    Ok(program)
}

/// Read and compile a source file.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Program, CoreError> {
    let source = fs::read_to_string(path.as_ref())?;
    Ok(compile(&source)?)
}

/// Load a program from either a bytecode or a source file.
///
/// A file counts as bytecode when it carries the bytecode extension or
/// starts with the program sentinel.
pub fn load_program(path: impl AsRef<Path>) -> Result<Program, CoreError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let has_extension = path.extension().is_some_and(|ext| ext == EXTENSION);
    if has_extension || bytecode::looks_like_bytecode(&bytes) {
        debug!(path = %path.display(), "loading as bytecode");
        return Ok(Program::decode(&bytes)?);
    }
    let source = String::from_utf8(bytes)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(compile(&source)?)
}
