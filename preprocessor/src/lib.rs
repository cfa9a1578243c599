//! The macro/conditional/include preprocessor.
//!
//! One linear pass consumes a [`Tokenizer`] in place: at each cursor position, a known
//! preprocessor directive runs its handler; a `SYMBOL` naming a `#define`d symbol at the
//! right arity is spliced by its (parameter-substituted) value; anything else is left
//! verbatim. The pass reuses the tokenizer's own splice/skip machinery (spec.md §9,
//! "in-place token splicing") instead of building a second output buffer.

#![warn(clippy::all)]

mod conditional;
mod directives;
mod error;
mod symbol;

pub use error::PreprocessorError;
pub use symbol::{ArityTable, DefinedSymbol, Macro};

use std::path::{Path, PathBuf};
use tokenizer::{Token, Tokenizer, TokenKind};

/// A suspended `#invoke`: the output symbol (if any) awaiting a `#macret`, and the
/// `#define` bindings shadowed by the invocation's parameter substitutions, to be
/// restored once the frame is popped.
struct MacroFrame {
    output_symbol: Option<String>,
    shadowed: Vec<(String, usize, Option<DefinedSymbol>)>,
}

/// Preprocesses one token stream, expanding includes/macros/conditionals in place.
pub struct Preprocessor {
    symbols: ArityTable<DefinedSymbol>,
    macros: ArityTable<Macro>,
    macro_stack: Vec<MacroFrame>,
    include_dirs: Vec<PathBuf>,
    base_dir: PathBuf,
}

impl Preprocessor {
    /// Creates a preprocessor with an initial `#define` table (from CLI `-D` flags) and
    /// a search path for angle-bracketed `#include <...>`.
    #[must_use]
    pub fn new(initial_defines: Vec<(String, String)>, include_dirs: Vec<PathBuf>) -> Self {
        let mut symbols = ArityTable::new();
        for (name, value) in initial_defines {
            symbols.insert(
                name.clone(),
                0,
                DefinedSymbol {
                    name,
                    params: Vec::new(),
                    value: vec![Token::new(TokenKind::Symbol, value, 0, 0)],
                },
            );
        }
        Self {
            symbols,
            macros: ArityTable::new(),
            macro_stack: Vec::new(),
            include_dirs,
            base_dir: PathBuf::from("."),
        }
    }

    /// Runs the full pass over `tok`, whose source file lives in `base_dir` (used to
    /// resolve quoted `#include "..."` paths).
    pub fn preprocess(&mut self, tok: &mut Tokenizer, base_dir: &Path) -> Result<(), PreprocessorError> {
        self.base_dir = base_dir.to_path_buf();
        self.run(tok, None)
    }

    fn run(&mut self, tok: &mut Tokenizer, until: Option<usize>) -> Result<(), PreprocessorError> {
        loop {
            if let Some(limit) = until {
                if tok.get_toki() >= limit {
                    break;
                }
            }
            if !tok.has_next() {
                break;
            }
            let kind = tok.get_token().kind;
            if kind.is_preprocessor_directive() {
                directives::dispatch(self, tok, kind)?;
            } else if kind == TokenKind::Symbol {
                self.try_expand_symbol(tok)?;
            } else {
                tok.consume_any()?;
            }
        }
        Ok(())
    }

    /// Runs the pass over exactly `[tok.get_toki(), end)`, used to recursively process
    /// a spliced-in macro body before returning control to the enclosing pass.
    fn run_until(&mut self, tok: &mut Tokenizer, end: usize) -> Result<(), PreprocessorError> {
        self.run(tok, Some(end))
    }

    fn try_expand_symbol(&mut self, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
        let start = tok.get_toki();
        let name = tok.consume(&[TokenKind::Symbol])?.value.clone();

        let lookahead = tok.get_state();
        tok.skip_next(&[TokenKind::WhitespaceSpace, TokenKind::WhitespaceTab]);

        let mut actuals: Vec<Vec<Token>> = Vec::new();
        let has_parens = tok.is_next(&[TokenKind::OpenParen]);
        if has_parens {
            tok.consume(&[TokenKind::OpenParen])?;
            if !tok.is_next(&[TokenKind::CloseParen]) {
                loop {
                    let mut depth = 0i32;
                    let mut group = Vec::new();
                    loop {
                        if depth == 0
                            && (tok.is_next(&[TokenKind::Comma]) || tok.is_next(&[TokenKind::CloseParen]))
                        {
                            break;
                        }
                        let t = tok.consume_any()?.clone();
                        match t.kind {
                            TokenKind::OpenParen => depth += 1,
                            TokenKind::CloseParen => depth -= 1,
                            _ => {}
                        }
                        group.push(t);
                    }
                    actuals.push(group);
                    if tok.is_next(&[TokenKind::Comma]) {
                        tok.consume(&[TokenKind::Comma])?;
                    } else {
                        break;
                    }
                }
            }
            tok.consume(&[TokenKind::CloseParen])?;
        } else {
            tok.set_state(lookahead);
        }
        let arity = if has_parens { actuals.len() } else { 0 };

        let walked_end = tok.get_toki();
        let Some(def) = self.symbols.get(&name, arity).cloned() else {
            // Not a known symbol at this arity: leave the span (the symbol, and any
            // parenthesized text we speculatively walked past) exactly as it was.
            let mut restore = lookahead;
            restore.toki = start;
            tok.set_state(restore);
            while tok.get_toki() < walked_end && tok.has_next() {
                tok.consume_any()?;
            }
            return Ok(());
        };

        let end = walked_end;
        let mut replacement = Vec::with_capacity(def.value.len());
        for v in &def.value {
            if v.kind == TokenKind::Symbol {
                if let Some(pos) = def.params.iter().position(|p| p == &v.value) {
                    replacement.extend(actuals[pos].iter().cloned());
                    continue;
                }
            }
            replacement.push(v.clone());
        }

        tok.remove_tokens(start, end);
        tok.insert_tokens(replacement, start);
        let mut rewound = tok.get_state();
        rewound.toki = start;
        tok.set_state(rewound);
        Ok(())
    }

    /// Splices `body` in at the current cursor wrapped in `.scope`/`.scend`, rewinds the
    /// cursor to reprocess it, and recursively runs the pass over just that range
    /// (spec.md §4.2, `#invoke`).
    fn invoke_macro_body(
        &mut self,
        tok: &mut Tokenizer,
        output_symbol: Option<String>,
        params: &[String],
        actuals: &[Vec<Token>],
        body: &[Token],
    ) -> Result<(), PreprocessorError> {
        let mut shadowed = Vec::with_capacity(params.len());
        for (param, actual) in params.iter().zip(actuals.iter()) {
            let previous = self.symbols.insert(
                param.clone(),
                0,
                DefinedSymbol {
                    name: param.clone(),
                    params: Vec::new(),
                    value: actual.clone(),
                },
            );
            shadowed.push((param.clone(), 0, previous));
        }

        let loc = tok.get_toki();
        let mut spliced = Vec::with_capacity(body.len() + 2);
        spliced.push(Token::new(TokenKind::AssemblerScope, ".scope", 0, 0));
        spliced.extend(body.iter().cloned());
        spliced.push(Token::new(TokenKind::AssemblerScend, ".scend", 0, 0));
        let end = loc + spliced.len();
        tok.insert_tokens(spliced, loc);
        let mut rewound = tok.get_state();
        rewound.toki = loc;
        tok.set_state(rewound);

        let stack_len_before = self.macro_stack.len();
        self.macro_stack.push(MacroFrame {
            output_symbol,
            shadowed,
        });

        self.run_until(tok, end)?;

        // If `#macret` already popped this frame (the documented early-pop behavior;
        // see DESIGN.md), there is nothing left to do. Otherwise pop and restore now.
        if self.macro_stack.len() > stack_len_before {
            if let Some(frame) = self.macro_stack.pop() {
                self.restore_shadowed(frame.shadowed);
            }
        }
        Ok(())
    }

    fn restore_shadowed(&mut self, shadowed: Vec<(String, usize, Option<DefinedSymbol>)>) {
        for (name, arity, previous) in shadowed {
            match previous {
                Some(def) => {
                    self.symbols.insert(name, arity, def);
                }
                None => {
                    self.symbols.remove(&name, arity);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_src(src: &str) -> Vec<Token> {
        let mut tok = Tokenizer::new(src, false).unwrap();
        let mut pp = Preprocessor::new(Vec::new(), Vec::new());
        pp.preprocess(&mut tok, Path::new(".")).unwrap();
        tok.live_tokens()
    }

    #[test]
    fn define_without_params_substitutes() {
        let out = run_src("#define FOO 42\nFOO\n");
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert!(text.contains("42"));
        assert!(!text.contains("FOO"));
    }

    #[test]
    fn define_with_params_substitutes_actuals() {
        let out = run_src("#define ADD(a,b) a + b\nADD(1,2)\n");
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(text.trim(), "1 + 2");
    }

    #[test]
    fn undef_removes_binding() {
        let out = run_src("#define FOO 1\n#undef FOO\nFOO\n");
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert!(text.contains("FOO"));
    }

    #[test]
    fn conditional_true_branch_keeps_only_that_branch() {
        let src = "#define FOO 1\n#ifequ FOO 1\n.byte 1\n#else\n.byte 2\n#endif\n";
        let out = run_src(src);
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert!(text.contains(".byte 1"));
        assert!(!text.contains(".byte 2"));
    }

    #[test]
    fn conditional_false_branch_keeps_else() {
        let src = "#define FOO 1\n#ifequ FOO 2\n.byte 1\n#else\n.byte 2\n#endif\n";
        let out = run_src(src);
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert!(!text.contains(".byte 1"));
        assert!(text.contains(".byte 2"));
    }

    #[test]
    fn macro_invoke_inlines_body_in_a_scope() {
        let src = "#macro M(a)\nmov x0, a\n#macend\n#invoke M(5)\n";
        let out = run_src(src);
        let kinds: Vec<_> = out.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::AssemblerScope));
        assert!(kinds.contains(&TokenKind::AssemblerScend));
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert!(text.contains("mov x0, 5"));
    }

    #[test]
    fn macro_hygiene_after_undef_matches_pre_invocation_state() {
        let src = "#macro M(x)\nmov x0, x\n#macend\n#invoke M(7)\n";
        let mut tok = Tokenizer::new(src, false).unwrap();
        let mut pp = Preprocessor::new(Vec::new(), Vec::new());
        pp.preprocess(&mut tok, Path::new(".")).unwrap();
        assert!(!pp.symbols.contains("x", 0));
    }

    #[test]
    fn arity_overload_picks_matching_macro() {
        let src = "#macro M()\n.byte 0\n#macend\n#macro M(a)\n.byte a\n#macend\n#invoke M()\n#invoke M(5)\n";
        let out = run_src(src);
        let text: String = out.iter().map(|t| t.value.as_str()).collect();
        assert!(text.contains(".byte 0"));
        assert!(text.contains(".byte 5"));
    }
}
