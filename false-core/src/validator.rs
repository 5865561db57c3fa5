//! Syntax validator.
//!
//! A single forward scan that tracks open comments, strings and lambdas and
//! records every detectable defect. The scan always runs to the end of the
//! input so a caller sees all problems of a source at once.

use crate::diagnostic::Diagnostic;
use crate::instructions::{self, Instruction};
use crate::language::{
    self, CHARACTER_DECLARATION, COMMENT_BEGIN, COMMENT_END, INLINE_ASSEMBLY, LAMBDA_BEGIN,
    LAMBDA_END, STRING_DELIMITER,
};

/// Their UTF-16 units start with the bytecode string terminator.
const STRING_RESERVED: core::ops::RangeInclusive<char> = '\u{FE00}'..='\u{FEFF}';

const VARIABLE_CONTEXT: &str =
    "There must be an assigning or a reading operator following a variable address!";

/// Validate `source`, returning every diagnostic found (empty = valid).
pub fn validate(source: &str) -> Vec<Diagnostic> {
    let chars: Vec<char> = source.chars().collect();
    let mut validator = Validator {
        chars: &chars,
        index: 0,
        open_string: None,
        open_comment: None,
        open_lambdas: Vec::new(),
        diagnostics: Vec::new(),
    };
    validator.run();
    validator.diagnostics
}

struct Validator<'src> {
    chars: &'src [char],
    index: usize,
    /// Position of the opening quote while inside a string.
    open_string: Option<usize>,
    /// Position of the opening brace while inside a comment.
    open_comment: Option<usize>,
    /// Positions of every lambda that is still open, innermost last.
    open_lambdas: Vec<usize>,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Validator<'src> {
    fn run(&mut self) {
        while let Some(ch) = self.peek_char() {
            let start = self.index;

            if self.open_comment.is_some() {
                if ch == COMMENT_END {
                    self.open_comment = None;
                }
                self.consume_char();
                continue;
            }
            if self.open_string.is_some() {
                if ch == STRING_DELIMITER {
                    self.open_string = None;
                } else if STRING_RESERVED.contains(&ch) {
                    self.diagnostics.push(
                        Diagnostic::unexpected_token(start, self.chars).with_context(
                            "Characters U+FE00 to U+FEFF cannot appear inside a string!",
                        ),
                    );
                }
                self.consume_char();
                continue;
            }

            match ch {
                COMMENT_BEGIN => {
                    self.open_comment = Some(start);
                    self.consume_char();
                }
                COMMENT_END => {
                    self.diagnostics
                        .push(Diagnostic::unexpected_token(start, self.chars));
                    self.consume_char();
                }
                STRING_DELIMITER => {
                    self.open_string = Some(start);
                    self.consume_char();
                }
                LAMBDA_BEGIN => {
                    self.open_lambdas.push(start);
                    self.consume_char();
                }
                LAMBDA_END => {
                    // An unmatched close leaves the depth at zero.
                    if self.open_lambdas.pop().is_none() {
                        self.diagnostics
                            .push(Diagnostic::unexpected_token(start, self.chars));
                    }
                    self.consume_char();
                }
                CHARACTER_DECLARATION => self.check_character_literal(start),
                INLINE_ASSEMBLY => self.consume_char(),
                _ if language::is_variable(ch) => self.check_variable(start),
                _ if language::is_digit(ch) => self.check_number(start),
                _ if language::is_whitespace(ch) => self.consume_char(),
                _ if instructions::find_by_symbol(ch).is_some() => self.consume_char(),
                _ => {
                    self.diagnostics
                        .push(Diagnostic::unresolved_symbol(start, self.chars));
                    self.consume_char();
                }
            }
        }

        if let Some(position) = self.open_string {
            self.diagnostics
                .push(Diagnostic::unclosed_literal(position, self.chars));
        }
        if let Some(position) = self.open_comment {
            self.diagnostics
                .push(Diagnostic::unclosed_literal(position, self.chars));
        }
        for position in core::mem::take(&mut self.open_lambdas) {
            self.diagnostics
                .push(Diagnostic::unclosed_literal(position, self.chars));
        }
    }

    /// The payload of `'` is taken verbatim and never inspected as syntax.
    fn check_character_literal(&mut self, start: usize) {
        self.consume_char();
        match self.peek_char() {
            None => self.diagnostics.push(
                Diagnostic::unexpected_end(start, self.chars)
                    .with_context("A character literal needs a character to declare!"),
            ),
            Some(payload) => {
                if u16::try_from(payload as u32).is_err() {
                    self.diagnostics.push(
                        Diagnostic::unexpected_token(self.index, self.chars).with_context(
                            "Character literals must fit into a single 16-bit code unit!",
                        ),
                    );
                }
                self.consume_char();
            }
        }
    }

    fn check_variable(&mut self, start: usize) {
        self.consume_char();

        let mut next = self.index;
        while next < self.chars.len() && language::is_whitespace(self.chars[next]) {
            next += 1;
        }

        match self.chars.get(next).copied() {
            None => self.diagnostics.push(
                Diagnostic::unexpected_end(start, self.chars).with_context(VARIABLE_CONTEXT),
            ),
            Some(op) => {
                let accessor = Instruction::from_symbol(op);
                if !matches!(accessor, Some(Instruction::Assign | Instruction::Read)) {
                    self.diagnostics.push(
                        Diagnostic::unexpected_token(next, self.chars)
                            .with_context(VARIABLE_CONTEXT),
                    );
                }
            }
        }
    }

    fn check_number(&mut self, start: usize) {
        while let Some(ch) = self.peek_char() {
            if language::is_digit(ch) {
                self.consume_char();
            } else {
                break;
            }
        }
        let literal: String = self.chars[start..self.index].iter().collect();
        if literal.parse::<i32>().is_err() {
            self.diagnostics.push(
                Diagnostic::unexpected_token(start, self.chars)
                    .with_context("Integer literals must fit into 32 bits!"),
            );
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;

    fn kinds(source: &str) -> Vec<(DiagnosticKind, usize)> {
        validate(source)
            .into_iter()
            .map(|d| (d.kind, d.position))
            .collect()
    }

    #[test]
    fn accepts_valid_programs() {
        assert!(validate("1 2+.").is_empty());
        assert!(validate("{ comment } [1_][a;1+a:]# \"hi [ } \" 'x, 12` ø O ß S").is_empty());
        assert!(validate("a :b\n;").is_empty());
    }

    #[test]
    fn reports_unresolved_symbols_at_their_index() {
        assert_eq!(kinds("1 X 2"), vec![(DiagnosticKind::UnresolvedSymbol, 2)]);
        assert_eq!(
            kinds("A.B"),
            vec![
                (DiagnosticKind::UnresolvedSymbol, 0),
                (DiagnosticKind::UnresolvedSymbol, 2)
            ]
        );
    }

    #[test]
    fn ignores_anything_inside_comments_strings_and_char_literals() {
        assert!(validate("{ X ] }").is_empty());
        assert!(validate("\"X ] {\"").is_empty());
        assert!(validate("'X,'],").is_empty());
    }

    #[test]
    fn reports_unclosed_literals_at_opening_positions() {
        assert_eq!(kinds("1 \"abc"), vec![(DiagnosticKind::UnclosedLiteral, 2)]);
        assert_eq!(kinds("{ abc"), vec![(DiagnosticKind::UnclosedLiteral, 0)]);
        assert_eq!(
            kinds("[[1]["),
            vec![
                (DiagnosticKind::UnclosedLiteral, 0),
                (DiagnosticKind::UnclosedLiteral, 4)
            ]
        );
    }

    #[test]
    fn unmatched_closers_do_not_cascade() {
        assert_eq!(
            kinds("]] [1]"),
            vec![
                (DiagnosticKind::UnexpectedToken, 0),
                (DiagnosticKind::UnexpectedToken, 1)
            ]
        );
        assert_eq!(kinds("1}"), vec![(DiagnosticKind::UnexpectedToken, 1)]);
    }

    #[test]
    fn variables_need_an_accessor() {
        assert_eq!(kinds("a +"), vec![(DiagnosticKind::UnexpectedToken, 2)]);
        assert_eq!(kinds("1 a  "), vec![(DiagnosticKind::UnexpectedEndOfCode, 2)]);

        let diagnostics = validate("a+");
        assert!(diagnostics[0].context.is_some());
    }

    #[test]
    fn collects_every_defect_in_one_pass() {
        let found = kinds("X ] a. \"open");
        assert_eq!(
            found,
            vec![
                (DiagnosticKind::UnresolvedSymbol, 0),
                (DiagnosticKind::UnexpectedToken, 2),
                (DiagnosticKind::UnexpectedToken, 5),
                (DiagnosticKind::UnclosedLiteral, 7),
            ]
        );
    }

    #[test]
    fn rejects_string_characters_the_bytecode_cannot_frame() {
        assert_eq!(kinds("\"\u{FEFF}x\""), vec![(DiagnosticKind::UnexpectedToken, 1)]);
        assert_eq!(kinds("\"a\u{2764}\u{FE0F}\""), vec![(DiagnosticKind::UnexpectedToken, 3)]);
        assert!(validate("\"\u{FDFF}\u{FF00}\"").is_empty());
        // Only string contents are affected; comments may hold anything.
        assert!(validate("{\u{FEFF}}").is_empty());
    }

    #[test]
    fn rejects_oversized_integers_and_dangling_char_literals() {
        assert_eq!(kinds("99999999999"), vec![(DiagnosticKind::UnexpectedToken, 0)]);
        assert!(validate("2147483647").is_empty());
        assert_eq!(kinds("1 '"), vec![(DiagnosticKind::UnexpectedEndOfCode, 2)]);
        assert_eq!(kinds("'\u{1F600}"), vec![(DiagnosticKind::UnexpectedToken, 1)]);
    }
}
