//! Preprocessor error taxonomy (spec.md §7: all non-recoverable).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessorError {
    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] tokenizer::TokenizerError),

    #[error("line {line}: missing operand for {directive}")]
    MissingOperand { line: u32, directive: &'static str },

    #[error("unbalanced conditional block starting at line {line}")]
    UnbalancedConditional { line: u32 },

    #[error("macro {name}/{arity} redefined at the same arity (line {line})")]
    MacroRedefined { name: String, arity: usize, line: u32 },

    #[error("unclosed macro {name} (missing #macend)")]
    UnclosedMacro { name: String },

    #[error("#include could not find file {path:?}")]
    IncludeNotFound { path: String },

    #[error("#include of {path:?} is ambiguous: found in {count} system directories")]
    AmbiguousInclude { path: String, count: usize },

    #[error("line {line}: preprocessor directive must be alone on its line")]
    DirectiveMidLine { line: u32 },

    #[error("line {line}: invocation of undefined macro {name}/{arity}")]
    UnknownMacro { name: String, arity: usize, line: u32 },

    #[error("io error reading {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
