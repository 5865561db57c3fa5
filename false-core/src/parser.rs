//! Builds the operation tree from stripped, validated source.

use tracing::trace;

use crate::instructions::Instruction;
use crate::language::{
    self, CHARACTER_DECLARATION, INLINE_ASSEMBLY, LAMBDA_BEGIN, LAMBDA_END, STRING_DELIMITER,
};
use crate::operation::{BlockId, Op, Operation, Program, ProgramBuilder};

/// Parse stripped source into a [`Program`].
///
/// The input is expected to have passed the validator. Anything the grammar
/// does not know (stray whitespace, a lone assembly marker, an unmatched
/// `]`) is skipped rather than reported.
pub fn parse(stripped: &str) -> Program {
    let chars: Vec<char> = stripped.chars().collect();
    let mut parser = Parser {
        chars: &chars,
        position: 0,
        builder: ProgramBuilder::new(),
    };
    parser.parse_block(BlockId::ROOT, false);
    parser.builder.finish()
}

struct Parser<'src> {
    chars: &'src [char],
    position: usize,
    builder: ProgramBuilder,
}

impl<'src> Parser<'src> {
    /// Parse operations into `block` until its closing `]` (or end of input).
    fn parse_block(&mut self, block: BlockId, nested: bool) {
        while let Some(ch) = self.peek() {
            self.position += 1;
            match ch {
                LAMBDA_BEGIN => {
                    let index = self.builder.next_index();
                    let body = self.builder.reserve_block();
                    self.parse_block(body, true);
                    self.builder
                        .push_indexed(block, Operation::new(index, Op::Lambda(body)));
                }
                LAMBDA_END if nested => return,
                STRING_DELIMITER => {
                    let text = self.take_string();
                    self.builder.push(block, Op::PrintString(text));
                }
                CHARACTER_DECLARATION => {
                    if let Some(payload) = self.peek() {
                        self.position += 1;
                        self.builder.push(block, Op::Character(payload));
                    }
                }
                _ if language::is_variable(ch) => self.builder.push(block, Op::Variable(ch)),
                _ if language::is_digit(ch) => {
                    let value = self.take_number(ch);
                    if self.peek() == Some(INLINE_ASSEMBLY) {
                        self.position += 1;
                        self.builder.push(block, Op::Assembly(value));
                    } else {
                        self.builder.push(block, Op::Integer(value));
                    }
                }
                _ => match Instruction::from_symbol(ch) {
                    Some(instruction) => {
                        self.builder.push(block, Op::Instruction(instruction));
                    }
                    None => trace!(symbol = %ch, position = self.position - 1, "skipped"),
                },
            }
        }
    }

    /// Consume a string body after its opening quote.
    fn take_string(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            self.position += 1;
            if ch == STRING_DELIMITER {
                break;
            }
            text.push(ch);
        }
        text
    }

    /// Consume the rest of a digit run whose first digit was `first`.
    fn take_number(&mut self, first: char) -> i32 {
        let mut value = digit_value(first);
        while let Some(ch) = self.peek() {
            if !language::is_digit(ch) {
                break;
            }
            self.position += 1;
            value = value.wrapping_mul(10).wrapping_add(digit_value(ch));
        }
        value
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }
}

fn digit_value(ch: char) -> i32 {
    ch.to_digit(10).map_or(0, |d| d as i32)
}
