//! Fixed alphabet of the FALSE language.
//!
//! Everything in here is constant data. The single-character primitives
//! (arithmetic, stack shuffling, I/O, control flow) live in the
//! instruction table in [`crate::instructions`]; this module only holds the
//! delimiters and character classes that need multi-character scanning.

/// Boolean `true` as seen by the stack machine.
pub const TRUE: i32 = -1;
/// Boolean `false` as seen by the stack machine.
pub const FALSE: i32 = 0;

pub const COMMENT_BEGIN: char = '{';
pub const COMMENT_END: char = '}';

pub const LAMBDA_BEGIN: char = '[';
pub const LAMBDA_END: char = ']';

pub const STRING_DELIMITER: char = '"';

/// The character following this delimiter is pushed as a character literal.
pub const CHARACTER_DECLARATION: char = '\'';

/// Marks the preceding number as inline assembly.
///
/// Inline assembly is accepted syntactically and compiled into an operation
/// that does nothing at runtime.
pub const INLINE_ASSEMBLY: char = '`';

pub const VARIABLE_FIRST: char = 'a';
pub const VARIABLE_LAST: char = 'z';

/// Number of variable slots (one per lowercase letter).
pub const VARIABLE_COUNT: usize = 26;

/// Converts a boolean into its stack representation.
pub fn bool_value(value: bool) -> i32 {
    if value { TRUE } else { FALSE }
}

pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

pub fn is_variable(ch: char) -> bool {
    (VARIABLE_FIRST..=VARIABLE_LAST).contains(&ch)
}

pub fn is_whitespace(ch: char) -> bool {
    ch.is_whitespace()
}

/// Slot index of a variable letter, `a` = 0.
pub fn variable_slot(ch: char) -> Option<usize> {
    if is_variable(ch) {
        Some(ch as usize - VARIABLE_FIRST as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variable_letters_to_slots() {
        assert_eq!(variable_slot('a'), Some(0));
        assert_eq!(variable_slot('z'), Some(VARIABLE_COUNT - 1));
        assert_eq!(variable_slot('A'), None);
        assert_eq!(variable_slot('{'), None);
    }

    #[test]
    fn booleans_use_sentinel_integers() {
        assert_eq!(bool_value(true), -1);
        assert_eq!(bool_value(false), 0);
    }
}
