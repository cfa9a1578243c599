//! Scope mangling (spec.md §4.3): a label defined inside `.scope`/`.scend` is stored as
//! `name::SCOPE:<n>`, `n` being the enclosing scope's monotonic id.

use tokenizer::{Token, TokenKind};

#[must_use]
pub fn mangle(name: &str, enclosing_scope: Option<u64>) -> String {
    match enclosing_scope {
        Some(id) => format!("{name}::SCOPE:{id}"),
        None => name.to_string(),
    }
}

/// Reconstructs the scope stack (innermost first) at `target_index` by replaying every
/// live `.scope`/`.scend` token before it, assigning ids in the same left-to-right,
/// monotonically increasing order the assembler's main pass used.
#[must_use]
pub fn scope_chain_at(tokens: &[Token], target_index: usize) -> Vec<u64> {
    let mut next_id = 0u64;
    let mut stack = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        if i >= target_index {
            break;
        }
        if t.skip {
            continue;
        }
        match t.kind {
            TokenKind::AssemblerScope => {
                stack.push(next_id);
                next_id += 1;
            }
            TokenKind::AssemblerScend => {
                stack.pop();
            }
            _ => {}
        }
    }
    stack.reverse();
    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenizer::Tokenizer;

    #[test]
    fn chain_reflects_nested_scopes_in_innermost_first_order() {
        let mut tok = Tokenizer::new(".scope\n.scope\nfoo:\n.scend\n.scend\n", false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceNewline, TokenKind::WhitespaceTab]);
        let foo_index = tok
            .all_tokens()
            .iter()
            .position(|t| t.kind == TokenKind::Label)
            .unwrap();
        let chain = scope_chain_at(tok.all_tokens(), foo_index);
        assert_eq!(chain, vec![1, 0]);
    }
}
