//! Binary bytecode format.
//!
//! ```text
//! program   := 0x07 unit* 0x7F
//! unit      := 0x08 unit* 0x7E              lambda
//!            | 0xFF (u16 BE)* 0xFE          print string, UTF-16 code units
//!            | 9  u16 BE                    variable address
//!            | 10 u16 BE                    character literal
//!            | 11 i32 BE                    integer literal
//!            | 12 i32 BE                    inline assembly
//!            | opcode                       any other instruction
//! ```
//!
//! The decoder walks the stream with a cursor and always knows whether it
//! is reading a unit, a string payload or a fixed-size operand, so marker
//! values inside operands are never taken for structure.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{BytecodeError, BytecodeErrorKind, CoreError};
use crate::instructions::Instruction;
use crate::language;
use crate::operation::{BlockId, Op, Operation, Program, ProgramBuilder};

pub const PROGRAM_BEGIN: u8 = 0x07;
pub const PROGRAM_END: u8 = 0x7F;
pub const BLOCK_BEGIN: u8 = 0x08;
pub const BLOCK_END: u8 = 0x7E;
pub const STRING_BEGIN: u8 = 0xFF;
pub const STRING_END: u8 = 0xFE;

pub const OP_VARIABLE: u8 = 9;
pub const OP_CHARACTER: u8 = 10;
pub const OP_INTEGER: u8 = 11;
pub const OP_ASSEMBLY: u8 = 12;

/// Conventional file extension of bytecode files.
pub const EXTENSION: &str = "fbc";

/// Whether `bytes` starts like a bytecode stream.
pub fn looks_like_bytecode(bytes: &[u8]) -> bool {
    bytes.first() == Some(&PROGRAM_BEGIN)
}

pub fn encode(program: &Program) -> Vec<u8> {
    let mut out = vec![PROGRAM_BEGIN];
    encode_block(program, BlockId::ROOT, &mut out);
    out.push(PROGRAM_END);
    out
}

fn encode_block(program: &Program, id: BlockId, out: &mut Vec<u8>) {
    let Some(block) = program.block(id) else {
        return;
    };
    for operation in block.operations() {
        match &operation.op {
            Op::Integer(value) => {
                out.push(OP_INTEGER);
                out.extend_from_slice(&value.to_be_bytes());
            }
            Op::Assembly(value) => {
                out.push(OP_ASSEMBLY);
                out.extend_from_slice(&value.to_be_bytes());
            }
            Op::Character(ch) => {
                out.push(OP_CHARACTER);
                out.extend_from_slice(&code_unit(*ch).to_be_bytes());
            }
            Op::Variable(name) => {
                out.push(OP_VARIABLE);
                out.extend_from_slice(&code_unit(*name).to_be_bytes());
            }
            Op::PrintString(text) => {
                out.push(STRING_BEGIN);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                out.push(STRING_END);
            }
            Op::Lambda(body) => {
                out.push(BLOCK_BEGIN);
                encode_block(program, *body, out);
                out.push(BLOCK_END);
            }
            Op::Instruction(instruction) => out.push(instruction.opcode()),
        }
    }
}

/// Characters outside the 16-bit range are rejected by the validator and
/// never reach the encoder; anything else becomes U+FFFD.
fn code_unit(ch: char) -> u16 {
    u16::try_from(u32::from(ch)).unwrap_or(0xFFFD)
}

pub fn decode(bytes: &[u8]) -> Result<Program, BytecodeError> {
    let mut decoder = Decoder {
        bytes,
        offset: 0,
        builder: ProgramBuilder::new(),
    };
    if decoder.next_byte() != Some(PROGRAM_BEGIN) {
        return Err(BytecodeError::new(
            0,
            BytecodeErrorKind::MissingSentinel("program start"),
        ));
    }
    decoder.decode_block(BlockId::ROOT, false)?;
    if decoder.offset != bytes.len() {
        return Err(decoder.error(decoder.offset, BytecodeErrorKind::TrailingBytes));
    }
    Ok(decoder.builder.finish())
}

struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
    builder: ProgramBuilder,
}

impl<'a> Decoder<'a> {
    /// Decode units into `block` up to and including its end marker.
    fn decode_block(&mut self, block: BlockId, nested: bool) -> Result<(), BytecodeError> {
        loop {
            let at = self.offset;
            let Some(byte) = self.next_byte() else {
                let kind = if nested {
                    BytecodeErrorKind::UnclosedBlock
                } else {
                    BytecodeErrorKind::MissingSentinel("program end")
                };
                return Err(self.error(at, kind));
            };

            match byte {
                PROGRAM_END if nested => {
                    return Err(self.error(at, BytecodeErrorKind::UnclosedBlock));
                }
                PROGRAM_END => return Ok(()),
                BLOCK_END if nested => return Ok(()),
                BLOCK_END => return Err(self.error(at, BytecodeErrorKind::StrayBlockEnd)),
                BLOCK_BEGIN => {
                    let index = self.builder.next_index();
                    let body = self.builder.reserve_block();
                    self.decode_block(body, true)?;
                    self.builder
                        .push_indexed(block, Operation::new(index, Op::Lambda(body)));
                }
                STRING_BEGIN => {
                    let text = self.string()?;
                    self.builder.push(block, Op::PrintString(text));
                }
                OP_VARIABLE => {
                    let unit = self.u16()?;
                    let name = char::from_u32(u32::from(unit))
                        .filter(|ch| language::is_variable(*ch))
                        .ok_or_else(|| {
                            self.error(at + 1, BytecodeErrorKind::InvalidVariable(unit))
                        })?;
                    self.builder.push(block, Op::Variable(name));
                }
                OP_CHARACTER => {
                    let unit = self.u16()?;
                    let ch = char::from_u32(u32::from(unit)).ok_or_else(|| {
                        self.error(at + 1, BytecodeErrorKind::InvalidCharacter(unit))
                    })?;
                    self.builder.push(block, Op::Character(ch));
                }
                OP_INTEGER => {
                    let value = self.i32()?;
                    self.builder.push(block, Op::Integer(value));
                }
                OP_ASSEMBLY => {
                    let value = self.i32()?;
                    self.builder.push(block, Op::Assembly(value));
                }
                opcode => {
                    let instruction = Instruction::from_opcode(opcode)
                        .ok_or_else(|| self.error(at, BytecodeErrorKind::UnknownOpcode(opcode)))?;
                    self.builder.push(block, Op::Instruction(instruction));
                }
            }
        }
    }

    /// Read UTF-16 pairs up to the string end marker.
    fn string(&mut self) -> Result<String, BytecodeError> {
        let start = self.offset;
        let mut units = Vec::new();
        loop {
            match self.bytes.get(self.offset) {
                None => return Err(self.error(start, BytecodeErrorKind::UnclosedString)),
                Some(&STRING_END) => {
                    self.offset += 1;
                    break;
                }
                Some(_) => {
                    let pair = self
                        .take(2)
                        .map_err(|_| self.error(start, BytecodeErrorKind::UnclosedString))?;
                    units.push(u16::from_be_bytes([pair[0], pair[1]]));
                }
            }
        }
        char::decode_utf16(units.iter().copied())
            .map(|unit| {
                unit.map_err(|bad| {
                    self.error(
                        start,
                        BytecodeErrorKind::InvalidCharacter(bad.unpaired_surrogate()),
                    )
                })
            })
            .collect()
    }

    fn u16(&mut self) -> Result<u16, BytecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn i32(&mut self) -> Result<i32, BytecodeError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], BytecodeError> {
        let end = self.offset + count;
        let bytes = self
            .bytes
            .get(self.offset..end)
            .ok_or_else(|| self.error(self.offset, BytecodeErrorKind::Truncated))?;
        self.offset = end;
        Ok(bytes)
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.offset).copied()?;
        self.offset += 1;
        Some(byte)
    }

    fn error(&self, offset: usize, kind: BytecodeErrorKind) -> BytecodeError {
        BytecodeError::new(offset, kind)
    }
}

impl Program {
    pub fn encode(&self) -> Vec<u8> {
        encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Program, BytecodeError> {
        decode(bytes)
    }

    /// Write the bytecode of this program to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let path = path.as_ref();
        let bytes = self.encode();
        debug!(path = %path.display(), bytes = bytes.len(), "saving bytecode");
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a program back from a bytecode file.
    pub fn load(path: impl AsRef<Path>) -> Result<Program, CoreError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "loading bytecode");
        Ok(Program::decode(&bytes)?)
    }
}
