//! Linker error taxonomy (spec.md §4.6, §7: all non-recoverable).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkerError {
    #[error(transparent)]
    Object(#[from] object::ObjectError),

    #[error("linker script: could not match a token at: {remainder:?}")]
    UnrecognizedToken { remainder: String },

    #[error("linker script: unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("linker script: expected {expected}, found `{found}`")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("linker script: `@` must be followed by `P` or `V`, found `{found}`")]
    BadPhysicalTag { found: String },

    #[error("relocation against `{symbol}` is still WEAK (undefined) at link time")]
    UndefinedSymbol { symbol: String },

    #[error("R_EMU32_B_OFFSET22 target for `{symbol}` is not 4-byte aligned: {value:#x}")]
    MisalignedBranchTarget { symbol: String, value: u64 },
}
