//! Removes comments and insignificant whitespace from validated source.

use crate::language::{
    self, CHARACTER_DECLARATION, COMMENT_BEGIN, COMMENT_END, STRING_DELIMITER,
};

/// Strip comments and whitespace from `source`.
///
/// A single space survives between two number literals that were separated
/// by whitespace or a comment. String contents and character payloads are
/// copied unchanged.
pub fn strip(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();

    // Last emitted character ended a number literal.
    let mut prev_is_digit = false;
    // Whitespace or a comment was skipped since the last emitted character.
    let mut gap = false;

    while let Some(ch) = chars.next() {
        match ch {
            COMMENT_BEGIN => {
                for inner in chars.by_ref() {
                    if inner == COMMENT_END {
                        break;
                    }
                }
                gap = true;
            }
            STRING_DELIMITER => {
                out.push(ch);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == STRING_DELIMITER {
                        break;
                    }
                }
                prev_is_digit = false;
                gap = false;
            }
            CHARACTER_DECLARATION => {
                out.push(ch);
                if let Some(payload) = chars.next() {
                    out.push(payload);
                }
                prev_is_digit = false;
                gap = false;
            }
            _ if language::is_whitespace(ch) => gap = true,
            _ => {
                let is_digit = language::is_digit(ch);
                if is_digit && prev_is_digit && gap {
                    out.push(' ');
                }
                out.push(ch);
                prev_is_digit = is_digit;
                gap = false;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_comments_and_whitespace() {
        assert_eq!(strip("1 2 + { add } ."), "1 2+.");
        assert_eq!(strip("[ a ; 1 + a : ]\n"), "[a;1+a:]");
    }

    #[test]
    fn keeps_a_separator_between_numbers() {
        assert_eq!(strip("100   12"), "100 12");
        assert_eq!(strip("100{c}12"), "100 12");
        assert_eq!(strip("100\n{c} 12 +"), "100 12+");
        assert_eq!(strip("1 a"), "1a");
    }

    #[test]
    fn copies_strings_verbatim() {
        assert_eq!(strip("\" a { b } \" ."), "\" a { b } \".");
    }

    #[test]
    fn character_payloads_are_not_reinterpreted() {
        assert_eq!(strip("' ,"), "' ,");
        assert_eq!(strip("'{ ,"), "'{,");
        assert_eq!(strip("'\"1"), "'\"1");
        // A digit payload does not glue onto the following number.
        assert_eq!(strip("'1 2"), "'12");
    }
}
