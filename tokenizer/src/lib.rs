//! A reusable, indentation-aware token stream.
//!
//! `Tokenizer` owns a `Vec<Token>` produced by one lexing pass and presents a cursor
//! (`toki`) over it. Consumers — the preprocessor, then the assembler — borrow the
//! tokenizer mutably while they run and never own the vector themselves.
//!
//! Removal is logical: [`Tokenizer::remove_tokens`] flags tokens `skip = true` rather
//! than shifting the backing vector, so indices returned by [`Tokenizer::get_toki`]
//! before a removal remain meaningful afterward (they just might now point at a
//! skipped token, which every read API silently steps over). This sidesteps the usual
//! invalidation problem of in-place vector deletion and is relied on by the
//! preprocessor's macro expansion, which saves a cursor position, splices in expansion
//! tokens, and restores it.

#![warn(clippy::all)]

mod error;
mod kind;
mod lexer;
mod token;

pub use error::TokenizerError;
pub use kind::TokenKind;
pub use token::Token;

/// Cursor + indentation bookkeeping, copyable so callers can save/restore it around a
/// macro expansion or lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenizerState {
    pub toki: usize,
    pub prev_indent: u32,
    pub cur_indent: u32,
    pub target_indent: u32,
}

/// Indentation-aware, mutation-in-place token stream.
pub struct Tokenizer {
    tokens: Vec<Token>,
    state: TokenizerState,
    next_batch: u32,
    keep_comments: bool,
}

impl Tokenizer {
    /// Lexes `source` in full, up front, producing a fresh tokenizer positioned at the
    /// first token. An empty input lexes to a single synthetic EOF token and is logged
    /// as a warning, not an error (spec.md §4.1).
    pub fn new(source: &str, keep_comments: bool) -> Result<Self, TokenizerError> {
        let mut tokens = Vec::new();
        let mut rest = source;
        let mut line = 1u32;
        let batch = 0u32;

        if source.is_empty() {
            log::warn!("tokenizer: empty input");
        }

        while !rest.is_empty() {
            let Some((kind, len)) = lexer::lex_one(rest) else {
                let prefix: String = rest.chars().take(16).collect();
                return Err(TokenizerError::Lexical { line, prefix });
            };
            let text = &rest[..len];
            if kind.is_comment() && !keep_comments {
                line += u32::try_from(text.matches('\n').count()).unwrap_or(0);
                rest = &rest[len..];
                continue;
            }
            let tok = Token::new(kind, text, line, batch);
            line += tok.newline_count();
            tokens.push(tok);
            rest = &rest[len..];
        }
        tokens.push(Token::new(TokenKind::Eof, "", line, batch));

        Ok(Self {
            tokens,
            state: TokenizerState::default(),
            next_batch: batch + 1,
            keep_comments,
        })
    }

    /// Wraps an already-lexed token stream (e.g. the preprocessor's output) without
    /// re-lexing text. A synthetic `Eof` is appended if the caller didn't include one.
    #[must_use]
    pub fn from_tokens(mut tokens: Vec<Token>, keep_comments: bool) -> Self {
        let next_batch = tokens.iter().map(|t| t.batch).max().map_or(0, |b| b + 1);
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenKind::Eof, "", line, next_batch));
        }
        Self {
            tokens,
            state: TokenizerState::default(),
            next_batch: next_batch + 1,
            keep_comments,
        }
    }

    /// Live (non-skipped), non-`Eof` tokens in stream order — the view a downstream
    /// consumer (the assembler, or a fresh `Tokenizer::from_tokens`) should see.
    #[must_use]
    pub fn live_tokens(&self) -> Vec<Token> {
        self.tokens
            .iter()
            .filter(|t| !t.skip && t.kind != TokenKind::Eof)
            .cloned()
            .collect()
    }

    /// Whether comments were retained in the token stream.
    #[must_use]
    pub fn keeps_comments(&self) -> bool {
        self.keep_comments
    }

    /// Current cursor index. Stable across [`Tokenizer::remove_tokens`] (see module docs).
    #[must_use]
    pub fn get_toki(&self) -> usize {
        self.state.toki
    }

    #[must_use]
    pub fn get_state(&self) -> TokenizerState {
        self.state
    }

    pub fn set_state(&mut self, state: TokenizerState) {
        self.state = state;
    }

    /// All tokens, including skipped ones; used by callers (scope-mangling
    /// reconstruction) that need to walk the raw stream.
    #[must_use]
    pub fn all_tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn next_live_index(&self, mut i: usize) -> usize {
        while i < self.tokens.len() && self.tokens[i].skip {
            i += 1;
        }
        i
    }

    /// Returns the index of the current (first non-skipped, at-or-after `toki`) token,
    /// advancing `toki` to that index.
    fn settle(&mut self) -> usize {
        self.state.toki = self.next_live_index(self.state.toki);
        self.state.toki
    }

    /// Whether a live token remains at or after the cursor.
    #[must_use]
    pub fn has_next(&self) -> bool {
        let i = self.next_live_index(self.state.toki);
        i < self.tokens.len() && self.tokens[i].kind != TokenKind::Eof
    }

    /// Borrows the current live token without advancing.
    pub fn get_token(&mut self) -> &Token {
        let i = self.settle();
        &self.tokens[i]
    }

    /// Whether the current live token's kind is in `kinds`.
    #[must_use]
    pub fn is_next(&mut self, kinds: &[TokenKind]) -> bool {
        let i = self.settle();
        self.tokens[i].is(kinds)
    }

    fn update_indent_state(&mut self, idx: usize) {
        let kind = self.tokens[idx].kind;
        match kind {
            TokenKind::WhitespaceNewline => {
                self.state.prev_indent = self.state.cur_indent;
                self.state.cur_indent = 0;
            }
            TokenKind::WhitespaceTab => self.state.cur_indent += 1,
            TokenKind::Label
            | TokenKind::AssemblerScope
            | TokenKind::PreprocessorMacro => self.state.target_indent += 1,
            TokenKind::AssemblerScend | TokenKind::PreprocessorMacend => {
                self.state.target_indent = self.state.target_indent.saturating_sub(1);
            }
            _ => {}
        }
    }

    /// Advances past the current live token and returns it.
    ///
    /// # Errors
    /// Returns [`TokenizerError::UnexpectedEof`] if the stream is exhausted.
    pub fn consume_any(&mut self) -> Result<&Token, TokenizerError> {
        let i = self.settle();
        if self.tokens[i].kind == TokenKind::Eof {
            return Err(TokenizerError::UnexpectedEof);
        }
        self.update_indent_state(i);
        self.state.toki = i + 1;
        Ok(&self.tokens[i])
    }

    /// Advances past the current live token, checking its kind is in `expected`.
    ///
    /// # Errors
    /// Returns [`TokenizerError::UnexpectedToken`] or [`TokenizerError::UnexpectedEof`].
    pub fn consume(&mut self, expected: &[TokenKind]) -> Result<&Token, TokenizerError> {
        let i = self.settle();
        if self.tokens[i].kind == TokenKind::Eof {
            return Err(TokenizerError::UnexpectedEof);
        }
        if !self.tokens[i].is(expected) {
            return Err(TokenizerError::UnexpectedToken {
                line: self.tokens[i].line,
                found: self.tokens[i].value.clone(),
            });
        }
        self.update_indent_state(i);
        self.state.toki = i + 1;
        Ok(&self.tokens[i])
    }

    /// Same as [`Tokenizer::consume`] but panics with `msg` instead of propagating the
    /// error — used where the caller has already checked [`Tokenizer::is_next`] and the
    /// failure would indicate an internal bug, not a malformed source file.
    pub fn expect_next(&mut self, expected: &[TokenKind], msg: &str) -> &Token {
        let i = self.settle();
        assert!(
            self.tokens[i].kind != TokenKind::Eof && self.tokens[i].is(expected),
            "{msg}"
        );
        self.update_indent_state(i);
        self.state.toki = i + 1;
        &self.tokens[i]
    }

    /// Advances past a run of live tokens whose kind is in `kinds`, stopping at the
    /// first non-matching (or exhausted) point.
    pub fn skip_next(&mut self, kinds: &[TokenKind]) {
        while self.is_next(kinds) {
            let _ = self.consume_any();
        }
    }

    /// Advances past a run of live tokens whose text matches `pattern`.
    pub fn skip_next_regex(&mut self, pattern: &regex::Regex) {
        loop {
            let i = self.settle();
            if i >= self.tokens.len() || !pattern.is_match(&self.tokens[i].value) {
                break;
            }
            let _ = self.consume_any();
        }
    }

    /// Inserts a freshly produced run of tokens at `loc`, tagging them with a new batch
    /// id distinct from anything already in the stream.
    pub fn insert_tokens(&mut self, mut new_tokens: Vec<Token>, loc: usize) {
        let batch = self.next_batch;
        self.next_batch += 1;
        for t in &mut new_tokens {
            t.batch = batch;
        }
        let n = new_tokens.len();
        self.tokens.splice(loc..loc, new_tokens);
        if self.state.toki >= loc {
            self.state.toki += n;
        }
    }

    /// Logically removes tokens in `[start, end)` by flagging them skipped; does not
    /// change the length of the backing vector or any stored index.
    pub fn remove_tokens(&mut self, start: usize, end: usize) {
        for t in &mut self.tokens[start..end.min(self.tokens.len())] {
            t.skip = true;
        }
    }

    /// Bulk-skips every live token whose kind is in `kinds`, wherever it occurs in the
    /// stream (not just at the cursor) — used to drop whitespace/comments in one pass
    /// before handing the stream to the preprocessor.
    pub fn filter_all(&mut self, kinds: &[TokenKind]) {
        for t in &mut self.tokens {
            if !t.skip && t.is(kinds) {
                t.skip = true;
            }
        }
    }

    /// Inserts synthetic tab tokens before the cursor until `cur_indent == target_indent`.
    /// Returns whether any were inserted.
    pub fn fix_indent(&mut self) -> bool {
        if self.state.cur_indent >= self.state.target_indent {
            return false;
        }
        let loc = self.state.toki;
        let need = self.state.target_indent - self.state.cur_indent;
        let batch = self.next_batch;
        self.next_batch += 1;
        let line = self.tokens.get(loc).map_or(0, |t| t.line);
        let synthetic: Vec<Token> = (0..need)
            .map(|_| Token::new(TokenKind::WhitespaceTab, "\t", line, batch))
            .collect();
        self.tokens.splice(loc..loc, synthetic);
        self.state.toki += usize::try_from(need).unwrap_or(0);
        self.state.cur_indent = self.state.target_indent;
        true
    }

    /// Returns the subslice of live (non-skipped, non-EOF) tokens starting at the
    /// cursor and ending just before the next [`TokenKind::WhitespaceNewline`] (or end
    /// of stream), without consuming anything. Used by directive handlers that read
    /// "rest of line".
    #[must_use]
    pub fn peek_line(&self) -> Vec<Token> {
        let mut out = Vec::new();
        let mut i = self.state.toki;
        while i < self.tokens.len() {
            let t = &self.tokens[i];
            if !t.skip {
                if t.kind == TokenKind::WhitespaceNewline || t.kind == TokenKind::Eof {
                    break;
                }
                out.push(t.clone());
            }
            i += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_reproduces_input_with_comments_kept() {
        let src = ".text\n_start: mov x0, #10\nhlt\n";
        let tok = Tokenizer::new(src, true).unwrap();
        let rebuilt: String = tok
            .all_tokens()
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn empty_input_lexes_to_just_eof() {
        let tok = Tokenizer::new("", true).unwrap();
        assert_eq!(tok.all_tokens().len(), 1);
        assert_eq!(tok.all_tokens()[0].kind, TokenKind::Eof);
    }

    #[test]
    fn mnemonics_and_registers_classify_via_prefix_fast_path() {
        let tok = Tokenizer::new("mov x0, x1", false).unwrap();
        let kinds: Vec<_> = tok.all_tokens().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::InstructionMov,
                TokenKind::WhitespaceSpace,
                TokenKind::RegisterX,
                TokenKind::Comma,
                TokenKind::WhitespaceSpace,
                TokenKind::RegisterX,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skip_is_logical_and_preserves_indices() {
        let mut tok = Tokenizer::new("a, b, c", false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceSpace]);
        let idx_before = tok.get_toki();
        tok.remove_tokens(2, 3); // removes the comma token (index 2: "a",",","b"?...)
        assert_eq!(tok.get_toki(), idx_before);
        // has_next / consume still work, silently stepping over the skipped token.
        assert!(tok.has_next());
    }

    #[test]
    fn insert_tokens_shifts_cursor_only_when_after_insertion_point() {
        let mut tok = Tokenizer::new("a b", false).unwrap();
        let before = tok.get_toki();
        tok.insert_tokens(vec![Token::new(TokenKind::Symbol, "z", 1, 99)], 5);
        assert_eq!(tok.get_toki(), before);
    }

    #[test]
    fn label_and_conditions_are_recognized() {
        let tok = Tokenizer::new("loop: b.eq loop", false).unwrap();
        let kinds: Vec<_> = tok
            .all_tokens()
            .iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect();
        assert_eq!(kinds[0], TokenKind::Label);
        assert_eq!(kinds[1], TokenKind::WhitespaceSpace);
        assert_eq!(kinds[2], TokenKind::InstructionB);
        assert_eq!(kinds[3], TokenKind::Period);
        assert_eq!(kinds[4], TokenKind::ConditionEq);
    }

    #[test]
    fn lexical_error_on_unrecognized_input() {
        let result = Tokenizer::new("`", false);
        assert!(matches!(result, Err(TokenizerError::Lexical { .. })));
    }
}
