//! The expression evaluator (spec.md §4.3): sequential left-to-right, no precedence,
//! over decimal/hex/binary/octal literals and the four arithmetic operators.

use crate::error::AssemblerError;
use tokenizer::{Token, Tokenizer, TokenKind};

/// Parses one numeric literal token per its base prefix (`$` hex, `%` binary, `@` octal,
/// bare digits decimal).
pub fn parse_literal(tok: &Token) -> Result<i64, AssemblerError> {
    let text = tok.value.as_str();
    let (digits, radix) = match tok.kind {
        TokenKind::LiteralNumberHexadecimal => (text.trim_start_matches('$'), 16),
        TokenKind::LiteralNumberBinary => (text.trim_start_matches('%'), 2),
        TokenKind::LiteralNumberOctal => (text.trim_start_matches('@'), 8),
        TokenKind::LiteralNumberDecimal => (text, 10),
        _ => {
            return Err(AssemblerError::ExpectedNumber {
                line: tok.line,
                found: text.to_string(),
            })
        }
    };
    i64::from_str_radix(digits, radix).map_err(|_| AssemblerError::MalformedNumber {
        line: tok.line,
        text: text.to_string(),
    })
}

fn operator_kind_to_fn(kind: TokenKind) -> Option<fn(i64, i64) -> i64> {
    match kind {
        TokenKind::OperatorAdd => Some(|a, b| a.wrapping_add(b)),
        TokenKind::OperatorSub => Some(|a, b| a.wrapping_sub(b)),
        TokenKind::OperatorMul => Some(|a, b| a.wrapping_mul(b)),
        TokenKind::OperatorDiv => Some(|a, b| if b == 0 { 0 } else { a.wrapping_div(b) }),
        _ => None,
    }
}

/// Skips an optional `#` sign token preceding an immediate.
pub fn skip_hash(tok: &mut Tokenizer) {
    if tok.is_next(&[TokenKind::Hash]) {
        let _ = tok.consume_any();
    }
}

/// Evaluates a sequential operand/operator chain: `operand (op operand)*`, stopping at
/// the first token that is neither a literal nor a recognized arithmetic operator.
pub fn evaluate(tok: &mut Tokenizer) -> Result<i64, AssemblerError> {
    skip_hash(tok);
    let first = tok.consume(&[
        TokenKind::LiteralNumberDecimal,
        TokenKind::LiteralNumberHexadecimal,
        TokenKind::LiteralNumberBinary,
        TokenKind::LiteralNumberOctal,
    ])?;
    let mut acc = parse_literal(first)?;
    loop {
        if !tok.is_next(&[
            TokenKind::OperatorAdd,
            TokenKind::OperatorSub,
            TokenKind::OperatorMul,
            TokenKind::OperatorDiv,
        ]) {
            break;
        }
        let op_kind = tok.get_token().kind;
        let apply = operator_kind_to_fn(op_kind).expect("checked above");
        tok.consume_any()?;
        skip_hash(tok);
        let rhs_tok = tok.consume(&[
            TokenKind::LiteralNumberDecimal,
            TokenKind::LiteralNumberHexadecimal,
            TokenKind::LiteralNumberBinary,
            TokenKind::LiteralNumberOctal,
        ])?;
        let rhs = parse_literal(rhs_tok)?;
        acc = apply(acc, rhs);
    }
    Ok(acc)
}

/// Evaluates and clamps to `[min, max]`, returning whether the raw value overran the
/// range (a warning, not an error, per spec.md §4.3/§7).
pub fn evaluate_clamped(tok: &mut Tokenizer, min: i64, max: i64) -> Result<(i64, bool), AssemblerError> {
    let raw = evaluate(tok)?;
    if raw < min || raw > max {
        Ok((raw.clamp(min, max), true))
    } else {
        Ok((raw, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_sequential_arithmetic_with_no_precedence() {
        let mut tok = Tokenizer::new("2 + 3 * 4", false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceSpace]);
        assert_eq!(evaluate(&mut tok).unwrap(), 20);
    }

    #[test]
    fn parses_all_four_bases() {
        let mut tok = Tokenizer::new("$ff + %101 + @17 + 3", false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceSpace]);
        assert_eq!(evaluate(&mut tok).unwrap(), 0xFF + 0b101 + 0o17 + 3);
    }

    #[test]
    fn clamp_reports_overrun_without_erroring() {
        let mut tok = Tokenizer::new("1000", false).unwrap();
        let (value, overran) = evaluate_clamped(&mut tok, 0, 255).unwrap();
        assert_eq!(value, 255);
        assert!(overran);
    }
}
