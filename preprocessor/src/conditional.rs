//! `#if*`/`#else*`/`#endif` block scanning (spec.md §4.2).
//!
//! The scan tracks nesting of `#if*`/`#endif` pairs starting at the opening directive
//! (already consumed by the caller) and records, at depth 0: the index of the first
//! `#else*`/`#endif` (the "next block" boundary) and the index of the matching final
//! `#endif`. Both indices point at the directive token itself.

use crate::error::PreprocessorError;
use tokenizer::{Tokenizer, TokenKind};

/// Result of scanning forward from just after an opening `#if*` directive's line.
pub struct ConditionalBlock {
    /// Index of the first `#else*` or `#endif` token at nesting depth 0.
    pub next_block: usize,
    /// Index of the matching `#endif` token (depth 0).
    pub endif: usize,
}

fn is_if_open(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::PreprocessorIfdef
            | TokenKind::PreprocessorIfndef
            | TokenKind::PreprocessorIfequ
            | TokenKind::PreprocessorIfnequ
            | TokenKind::PreprocessorIfless
            | TokenKind::PreprocessorIfmore
    )
}

fn is_else(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::PreprocessorElse
            | TokenKind::PreprocessorElsedef
            | TokenKind::PreprocessorElsendef
            | TokenKind::PreprocessorElseequ
            | TokenKind::PreprocessorElsenequ
            | TokenKind::PreprocessorElseless
            | TokenKind::PreprocessorElsemore
    )
}

/// Scans the raw token vector starting at `start` (the index just after the opening
/// directive's line) for the block boundaries described above. Does not mutate the
/// tokenizer; the caller applies the effect (removal or cursor jump) afterward.
pub fn scan(tok: &Tokenizer, start: usize) -> Result<ConditionalBlock, PreprocessorError> {
    let tokens = tok.all_tokens();
    let mut depth = 0usize;
    let mut next_block = None;
    let mut i = start;
    while i < tokens.len() {
        let t = &tokens[i];
        if !t.skip {
            if is_if_open(t.kind) {
                depth += 1;
            } else if t.kind == TokenKind::PreprocessorEndif {
                if depth == 0 {
                    if next_block.is_none() {
                        next_block = Some(i);
                    }
                    return Ok(ConditionalBlock {
                        next_block: next_block.unwrap(),
                        endif: i,
                    });
                }
                depth -= 1;
            } else if depth == 0 && is_else(t.kind) && next_block.is_none() {
                next_block = Some(i);
            }
        }
        i += 1;
    }
    Err(PreprocessorError::UnbalancedConditional {
        line: tokens.get(start).map_or(0, |t| t.line),
    })
}
