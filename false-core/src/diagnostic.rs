//! Compile-time diagnostics.
//!
//! The validator never stops at the first defect. Every problem it finds
//! becomes a [`Diagnostic`], and all of them are handed back together as a
//! [`Diagnostics`] collection so one compile run reports everything at once.

use std::fmt;

/// Kind of compile-time defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A known symbol in a place where it is not allowed, e.g. a `]` without
    /// an open lambda.
    UnexpectedToken,
    /// A character that is not part of the language.
    UnresolvedSymbol,
    /// A comment, string or lambda that is never closed.
    UnclosedLiteral,
    /// The source ended while a token still expected more input.
    UnexpectedEndOfCode,
}

/// A single compile-time defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Character index into the original source.
    pub position: usize,
    /// Short excerpt of the source around `position`.
    pub snippet: String,
    /// Optional explanation printed on its own line.
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, position: usize, source: &[char]) -> Self {
        Diagnostic {
            kind,
            position,
            snippet: snippet(source, position),
            context: None,
        }
    }

    pub fn unexpected_token(position: usize, source: &[char]) -> Self {
        Self::new(DiagnosticKind::UnexpectedToken, position, source)
    }

    pub fn unresolved_symbol(position: usize, source: &[char]) -> Self {
        Self::new(DiagnosticKind::UnresolvedSymbol, position, source)
    }

    pub fn unclosed_literal(position: usize, source: &[char]) -> Self {
        Self::new(DiagnosticKind::UnclosedLiteral, position, source)
    }

    pub fn unexpected_end(position: usize, source: &[char]) -> Self {
        Self::new(DiagnosticKind::UnexpectedEndOfCode, position, source)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::UnexpectedToken => write!(
                f,
                "Unexpected symbol at index {}: {}",
                self.position, self.snippet
            )?,
            DiagnosticKind::UnresolvedSymbol => write!(
                f,
                "Unresolved symbol at index {}: {}",
                self.position, self.snippet
            )?,
            DiagnosticKind::UnclosedLiteral => write!(
                f,
                "Literal at position {} has not been closed: {}",
                self.position, self.snippet
            )?,
            DiagnosticKind::UnexpectedEndOfCode => {
                write!(f, "Unexpected end of code: {}", self.snippet)?
            }
        }
        if let Some(context) = &self.context {
            write!(f, "\n{context}")?;
        }
        Ok(())
    }
}

/// Excerpt of at most three characters, starting one before `position`.
///
/// Elided text on either side is marked with `...`.
pub fn snippet(source: &[char], position: usize) -> String {
    if source.is_empty() {
        return String::new();
    }
    let begin = position.saturating_sub(1).min(source.len() - 1);
    let end = (begin + 3).min(source.len());

    let mut out = String::new();
    if begin > 0 {
        out.push_str("... ");
    }
    out.extend(&source[begin..end]);
    if end < source.len() {
        out.push_str(" ...");
    }
    out
}

/// Ordered collection of diagnostics from one compile run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Diagnostic> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// `Ok(value)` when nothing was collected, the collection otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, Diagnostics> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(entries: Vec<Diagnostic>) -> Self {
        Diagnostics { entries }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Numbered report, one diagnostic per entry.
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", i + 1, diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn snippet_marks_elided_text() {
        let source = chars("12345678");
        assert_eq!(snippet(&source, 0), "123 ...");
        assert_eq!(snippet(&source, 4), "... 456 ...");
        assert_eq!(snippet(&source, 7), "... 78");
        assert_eq!(snippet(&chars("ab"), 1), "ab");
        assert_eq!(snippet(&[], 0), "");
    }

    #[test]
    fn formats_each_kind() {
        let source = chars("1+]");
        let d = Diagnostic::unexpected_token(2, &source);
        assert_eq!(d.to_string(), "Unexpected symbol at index 2: ... +]");

        let d = Diagnostic::unclosed_literal(0, &chars("[1"));
        assert_eq!(d.to_string(), "Literal at position 0 has not been closed: [1");

        let d = Diagnostic::unexpected_end(0, &chars("a")).with_context("needs : or ;");
        assert_eq!(d.to_string(), "Unexpected end of code: a\nneeds : or ;");
    }

    #[test]
    fn report_is_a_numbered_list() {
        let source = chars("X]");
        let mut all = Diagnostics::new();
        all.push(Diagnostic::unresolved_symbol(0, &source));
        all.push(Diagnostic::unexpected_token(1, &source));
        let report = all.to_string();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. Unresolved symbol at index 0"));
        assert!(lines[1].starts_with("2. Unexpected symbol at index 1"));
    }

    #[test]
    fn empty_collection_yields_value() {
        assert_eq!(Diagnostics::new().into_result(5), Ok(5));
    }
}
