//! Assembler error taxonomy (spec.md §7): directive/label misuse, backward or
//! misaligned cursor moves, and undefined symbols are all non-recoverable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error(transparent)]
    Tokenizer(#[from] tokenizer::TokenizerError),

    #[error(transparent)]
    Object(#[from] object::ObjectError),

    #[error("line {line}: `{directive}` is not legal outside a section")]
    DirectiveOutsideSection { directive: &'static str, line: u32 },

    #[error("line {line}: `{directive}` is not legal inside a section")]
    DirectiveInsideSection { directive: &'static str, line: u32 },

    #[error("line {line}: label definition outside any section")]
    LabelOutsideSection { line: u32 },

    #[error("line {line}: instruction outside any section")]
    InstructionOutsideSection { line: u32 },

    #[error("line {line}: `.org` target {target} is behind the current cursor {current}")]
    BackwardOrg { line: u32, target: i64, current: u64 },

    #[error("line {line}: cursor position {position} is not 4-byte aligned in .text")]
    MisalignedCursor { line: u32, position: i64 },

    #[error("line {line}: `.scend` with no matching `.scope`")]
    UnbalancedScope { line: u32 },

    #[error("line {line}: missing operand for `{directive}`")]
    MissingOperand { line: u32, directive: &'static str },

    #[error("line {line}: expected a register, found `{found}`")]
    ExpectedRegister { line: u32, found: String },

    #[error("line {line}: expected a number literal, found `{found}`")]
    ExpectedNumber { line: u32, found: String },

    #[error("line {line}: malformed numeric literal `{text}`")]
    MalformedNumber { line: u32, text: String },

    #[error("line {line}: reference to undefined symbol `{name}`")]
    UndefinedSymbol { line: u32, name: String },

    #[error("line {line}: unsupported operand form for `{mnemonic}`")]
    UnsupportedOperand { line: u32, mnemonic: &'static str },
}

/// A non-fatal clamp-on-overrun event (spec.md §7): immediate/offset value-range
/// checking is best-effort, so these accumulate alongside a successful [`crate::Assembler`]
/// run rather than aborting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerWarning {
    pub line: u32,
    pub directive: &'static str,
}
