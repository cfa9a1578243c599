//! The `Token` type: a lexed unit with its kind, text, and source position.

use crate::kind::TokenKind;

/// A single lexed token.
///
/// `batch` distinguishes tokens freshly produced by a preprocessor expansion (macro
/// invocation, `#include` splice) from tokens that came straight from the original file:
/// every fresh batch of tokens spliced into the stream gets the next id from a
/// monotonically increasing counter owned by the `Tokenizer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: u32,
    pub batch: u32,
    /// Logical deletion marker. See the module docs on [`crate::Tokenizer`] for why
    /// removal is implemented this way instead of shifting the backing vector.
    pub skip: bool,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>, line: u32, batch: u32) -> Self {
        Self {
            kind,
            value,
            line,
            batch,
            skip: false,
        }
    }

    /// Whether this token's kind is one of `kinds`.
    #[must_use]
    pub fn is(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    /// Number of embedded newlines in this token's text (relevant for multi-line
    /// comments and strings, which advance the line counter by more than one).
    #[must_use]
    pub fn newline_count(&self) -> u32 {
        u32::try_from(self.value.matches('\n').count()).unwrap_or(u32::MAX)
    }
}
