//! Directive handlers dispatched from [`crate::Preprocessor::run`].
//!
//! Every handler follows the same shape: consume the directive's own tokens (so the
//! tokenizer's indentation bookkeeping sees them), hide that span with
//! [`Tokenizer::remove_tokens`], and either leave the cursor where it lands (pure
//! declarations: `#define`, `#macro`, `#undef`) or splice in replacement content and
//! rewind the cursor onto it (`#include`, `#invoke`).

use crate::conditional;
use crate::error::PreprocessorError;
use crate::symbol::{DefinedSymbol, Macro};
use crate::Preprocessor;
use std::path::PathBuf;
use tokenizer::{Token, Tokenizer, TokenKind};

pub(crate) fn dispatch(
    pp: &mut Preprocessor,
    tok: &mut Tokenizer,
    kind: TokenKind,
) -> Result<(), PreprocessorError> {
    match kind {
        TokenKind::PreprocessorInclude => include(pp, tok),
        TokenKind::PreprocessorDefine => define(pp, tok),
        TokenKind::PreprocessorUndef => undef(pp, tok),
        TokenKind::PreprocessorMacro => macro_def(pp, tok),
        TokenKind::PreprocessorInvoke => invoke(pp, tok),
        TokenKind::PreprocessorMacret => macret(pp, tok),
        TokenKind::PreprocessorMacend => {
            // Reached outside a `#macro` body (the body-reading loop in `macro_def`
            // consumes its own `#macend`); a bare one on its own is malformed.
            Err(PreprocessorError::UnbalancedConditional {
                line: tok.get_token().line,
            })
        }
        _ => dispatch_conditional(pp, tok, kind),
    }
}

fn skip_inline_ws(tok: &mut Tokenizer) {
    tok.skip_next(&[TokenKind::WhitespaceSpace, TokenKind::WhitespaceTab]);
}

/// Consumes every live token to the end of the current line (not including the
/// directive itself), plus the trailing newline if present.
fn consume_rest_of_line(tok: &mut Tokenizer) -> Result<Vec<Token>, PreprocessorError> {
    let n = tok.peek_line().len();
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(tok.consume_any()?.clone());
    }
    if tok.is_next(&[TokenKind::WhitespaceNewline]) {
        tok.consume_any()?;
    }
    Ok(out)
}

/// Parses an optional `(p1, p2, ...)` parameter list immediately following the cursor
/// (no intervening whitespace, matching call-site argument parsing). Returns the empty
/// list if no `(` is present.
fn parse_param_list(tok: &mut Tokenizer) -> Result<Vec<String>, PreprocessorError> {
    if !tok.is_next(&[TokenKind::OpenParen]) {
        return Ok(Vec::new());
    }
    tok.consume(&[TokenKind::OpenParen])?;
    let mut params = Vec::new();
    skip_inline_ws(tok);
    if !tok.is_next(&[TokenKind::CloseParen]) {
        loop {
            skip_inline_ws(tok);
            params.push(tok.consume(&[TokenKind::Symbol])?.value.clone());
            skip_inline_ws(tok);
            if tok.is_next(&[TokenKind::Comma]) {
                tok.consume(&[TokenKind::Comma])?;
            } else {
                break;
            }
        }
    }
    skip_inline_ws(tok);
    tok.consume(&[TokenKind::CloseParen])?;
    Ok(params)
}

fn include(pp: &mut Preprocessor, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
    let start = tok.get_toki();
    tok.consume(&[TokenKind::PreprocessorInclude])?;
    skip_inline_ws(tok);

    let (path_text, is_system) = if tok.is_next(&[TokenKind::LiteralString]) {
        let raw = tok.consume(&[TokenKind::LiteralString])?.value.clone();
        (raw.trim_matches('"').to_string(), false)
    } else {
        tok.consume(&[TokenKind::OperatorLogicalLt])?;
        let mut text = String::new();
        loop {
            if tok.is_next(&[TokenKind::OperatorLogicalGt]) {
                break;
            }
            text.push_str(&tok.consume_any()?.value);
        }
        tok.consume(&[TokenKind::OperatorLogicalGt])?;
        (text, true)
    };
    consume_rest_of_line(tok)?;

    let resolved = if is_system {
        let matches: Vec<PathBuf> = pp
            .include_dirs
            .iter()
            .map(|dir| dir.join(&path_text))
            .filter(|p| p.is_file())
            .collect();
        match matches.len() {
            0 => return Err(PreprocessorError::IncludeNotFound { path: path_text }),
            1 => matches.into_iter().next().unwrap(),
            n => {
                return Err(PreprocessorError::AmbiguousInclude {
                    path: path_text,
                    count: n,
                })
            }
        }
    } else {
        let candidate = pp.base_dir.join(&path_text);
        if candidate.is_file() {
            candidate
        } else {
            return Err(PreprocessorError::IncludeNotFound { path: path_text });
        }
    };

    log::debug!("preprocessor: including {}", resolved.display());
    let contents = std::fs::read_to_string(&resolved).map_err(|source| PreprocessorError::Io {
        path: resolved.display().to_string(),
        source,
    })?;
    let included = Tokenizer::new(&contents, tok.keeps_comments())?;
    let body = included.live_tokens();

    let end = tok.get_toki();
    tok.remove_tokens(start, end);
    tok.insert_tokens(body, start);
    let mut rewound = tok.get_state();
    rewound.toki = start;
    tok.set_state(rewound);
    Ok(())
}

fn define(pp: &mut Preprocessor, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
    let start = tok.get_toki();
    let line = tok.get_token().line;
    tok.consume(&[TokenKind::PreprocessorDefine])?;
    skip_inline_ws(tok);
    let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
    let params = parse_param_list(tok)?;
    skip_inline_ws(tok);
    let value: Vec<Token> = consume_rest_of_line(tok)?
        .into_iter()
        .filter(|t| t.kind != TokenKind::Backslash)
        .collect();

    let arity = params.len();
    log::debug!("preprocessor: #define {name}/{arity} at line {line}");
    pp.symbols.insert(
        name.clone(),
        arity,
        DefinedSymbol {
            name,
            params,
            value,
        },
    );

    tok.remove_tokens(start, tok.get_toki());
    Ok(())
}

fn undef(pp: &mut Preprocessor, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
    let start = tok.get_toki();
    tok.consume(&[TokenKind::PreprocessorUndef])?;
    skip_inline_ws(tok);
    let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
    consume_rest_of_line(tok)?;
    pp.symbols.remove_all(&name);
    tok.remove_tokens(start, tok.get_toki());
    Ok(())
}

fn read_macro_body(tok: &mut Tokenizer, name: &str) -> Result<Vec<Token>, PreprocessorError> {
    let mut depth = 0u32;
    let mut body = Vec::new();
    loop {
        if !tok.has_next() {
            return Err(PreprocessorError::UnclosedMacro {
                name: name.to_string(),
            });
        }
        let kind = tok.get_token().kind;
        if kind == TokenKind::PreprocessorMacend && depth == 0 {
            tok.consume_any()?;
            return Ok(body);
        }
        if kind == TokenKind::PreprocessorMacro {
            depth += 1;
        } else if kind == TokenKind::PreprocessorMacend {
            depth -= 1;
        }
        body.push(tok.consume_any()?.clone());
    }
}

fn macro_def(pp: &mut Preprocessor, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
    let start = tok.get_toki();
    let line = tok.get_token().line;
    tok.consume(&[TokenKind::PreprocessorMacro])?;
    skip_inline_ws(tok);
    let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
    let params = parse_param_list(tok)?;
    consume_rest_of_line(tok)?;

    let body = read_macro_body(tok, &name)?;
    let arity = params.len();

    if pp.macros.contains(&name, arity) {
        return Err(PreprocessorError::MacroRedefined { name, arity, line });
    }
    pp.macros.insert(
        name.clone(),
        arity,
        Macro {
            name,
            params,
            body,
        },
    );

    tok.remove_tokens(start, tok.get_toki());
    Ok(())
}

fn invoke(pp: &mut Preprocessor, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
    let start = tok.get_toki();
    let line = tok.get_token().line;
    tok.consume(&[TokenKind::PreprocessorInvoke])?;
    skip_inline_ws(tok);

    // `#invoke NAME(args)` or `#invoke OUT = NAME(args)`.
    let first = tok.consume(&[TokenKind::Symbol])?.value.clone();
    skip_inline_ws(tok);
    let (output_symbol, name) = if tok.is_next(&[TokenKind::OperatorLogicalEq]) {
        tok.consume(&[TokenKind::OperatorLogicalEq])?;
        skip_inline_ws(tok);
        let macro_name = tok.consume(&[TokenKind::Symbol])?.value.clone();
        (Some(first), macro_name)
    } else {
        (None, first)
    };

    let mut actuals = Vec::new();
    if tok.is_next(&[TokenKind::OpenParen]) {
        tok.consume(&[TokenKind::OpenParen])?;
        skip_inline_ws(tok);
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
                skip_inline_ws(tok);
                if tok.is_next(&[TokenKind::Comma]) {
                    tok.consume(&[TokenKind::Comma])?;
                    skip_inline_ws(tok);
                } else {
                    break;
                }
            }
        }
        tok.consume(&[TokenKind::CloseParen])?;
    }
    consume_rest_of_line(tok)?;

    let arity = actuals.len();
    let Some(def) = pp.macros.get(&name, arity).cloned() else {
        return Err(PreprocessorError::UnknownMacro { name, arity, line });
    };

    tok.remove_tokens(start, tok.get_toki());
    pp.invoke_macro_body(tok, output_symbol, &def.params, &actuals, &def.body)
}

/// `#macret SYMBOL` (or bare `#macret`) early-exits the innermost macro invocation,
/// binding its output symbol if the frame has one. This pops the [`crate::MacroFrame`]
/// immediately, even if the body hasn't reached its `.scend` yet — matching the
/// documented early-pop behavior (see DESIGN.md).
fn macret(pp: &mut Preprocessor, tok: &mut Tokenizer) -> Result<(), PreprocessorError> {
    let start = tok.get_toki();
    tok.consume(&[TokenKind::PreprocessorMacret])?;
    skip_inline_ws(tok);
    let value = if tok.is_next(&[TokenKind::WhitespaceNewline]) || !tok.has_next() {
        None
    } else {
        Some(consume_rest_of_line(tok)?)
    };
    if value.is_none() {
        consume_rest_of_line(tok)?;
    }
    tok.remove_tokens(start, tok.get_toki());

    if let Some(frame) = pp.macro_stack.pop() {
        if let (Some(name), Some(tokens)) = (frame.output_symbol, value) {
            pp.symbols.insert(
                name.clone(),
                0,
                DefinedSymbol {
                    name,
                    params: Vec::new(),
                    value: tokens,
                },
            );
        }
        pp.restore_shadowed(frame.shadowed);
    }
    Ok(())
}

fn map_to_if_form(kind: TokenKind) -> TokenKind {
    match kind {
        TokenKind::PreprocessorElsedef => TokenKind::PreprocessorIfdef,
        TokenKind::PreprocessorElsendef => TokenKind::PreprocessorIfndef,
        TokenKind::PreprocessorElseequ => TokenKind::PreprocessorIfequ,
        TokenKind::PreprocessorElsenequ => TokenKind::PreprocessorIfnequ,
        TokenKind::PreprocessorElseless => TokenKind::PreprocessorIfless,
        TokenKind::PreprocessorElsemore => TokenKind::PreprocessorIfmore,
        other => other,
    }
}

fn evaluate_condition(
    pp: &Preprocessor,
    tok: &mut Tokenizer,
    kind: TokenKind,
) -> Result<bool, PreprocessorError> {
    if kind == TokenKind::PreprocessorElse {
        consume_rest_of_line(tok)?;
        return Ok(true);
    }

    skip_inline_ws(tok);
    let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
    match map_to_if_form(kind) {
        TokenKind::PreprocessorIfdef => {
            consume_rest_of_line(tok)?;
            Ok(pp.symbols.contains(&name, 0))
        }
        TokenKind::PreprocessorIfndef => {
            consume_rest_of_line(tok)?;
            Ok(!pp.symbols.contains(&name, 0))
        }
        form @ (TokenKind::PreprocessorIfequ
        | TokenKind::PreprocessorIfnequ
        | TokenKind::PreprocessorIfless
        | TokenKind::PreprocessorIfmore) => {
            skip_inline_ws(tok);
            let comparand_tokens = consume_rest_of_line(tok)?;
            let comparand: String = comparand_tokens
                .iter()
                .map(|t| t.value.as_str())
                .collect::<String>()
                .trim()
                .to_string();
            let defined_text = pp
                .symbols
                .get(&name, 0)
                .map(|d| {
                    d.value
                        .iter()
                        .map(|t| t.value.as_str())
                        .collect::<String>()
                        .trim()
                        .to_string()
                })
                .unwrap_or_default();
            Ok(match form {
                TokenKind::PreprocessorIfequ => defined_text == comparand,
                TokenKind::PreprocessorIfnequ => defined_text != comparand,
                TokenKind::PreprocessorIfless => defined_text.as_str() < comparand.as_str(),
                TokenKind::PreprocessorIfmore => defined_text.as_str() > comparand.as_str(),
                _ => unreachable!(),
            })
        }
        _ => unreachable!("not a conditional directive kind"),
    }
}

/// Drives an `#if*`/`#else*`/`#endif` chain to its taken branch, hiding every header
/// line and every branch that wasn't taken. Each `#else*` variant re-enters this loop
/// as if it were a fresh `#if*` of the corresponding form (spec.md §4.2).
fn dispatch_conditional(
    pp: &mut Preprocessor,
    tok: &mut Tokenizer,
    mut kind: TokenKind,
) -> Result<(), PreprocessorError> {
    loop {
        let header_start = tok.get_toki();
        tok.consume_any()?;
        let taken = evaluate_condition(pp, tok, kind)?;
        let body_start = tok.get_toki();
        let block = conditional::scan(tok, body_start)?;
        tok.remove_tokens(header_start, body_start);

        if taken {
            tok.remove_tokens(block.next_block, block.endif + 1);
            return Ok(());
        }

        tok.remove_tokens(body_start, block.next_block);
        let mut state = tok.get_state();
        state.toki = block.next_block;
        tok.set_state(state);

        if tok.get_token().kind == TokenKind::PreprocessorEndif {
            let endif_start = tok.get_toki();
            tok.consume_any()?;
            tok.remove_tokens(endif_start, tok.get_toki());
            return Ok(());
        }
        kind = tok.get_token().kind;
    }
}
