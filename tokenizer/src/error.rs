//! Tokenizer error taxonomy (spec.md §7: lexical errors are non-recoverable).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizerError {
    /// No regex in the token spec (and no keyword match) matched the remaining source.
    #[error("line {line}: unable to lex starting at {prefix:?}")]
    Lexical {
        /// 1-based source line number.
        line: u32,
        /// A short prefix of the unmatched input, for the diagnostic.
        prefix: String,
    },

    #[error("unexpected token at line {line}: {found}")]
    UnexpectedToken { line: u32, found: String },

    #[error("unexpected end of file")]
    UnexpectedEof,
}
