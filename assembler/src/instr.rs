//! Instruction encoding: maps a mnemonic token to its [`isa::Opcode`], parses operands
//! in the textual forms spec.md §4.3 and §6 describe, and packs the instruction word.

use crate::error::AssemblerError;
use crate::expr;
use isa::{AddrMode, Condition, OperandM, OperandO, OperandO1, Opcode};
use tokenizer::{Token, Tokenizer, TokenKind};

#[must_use]
pub fn opcode_for(kind: TokenKind) -> Option<Opcode> {
    Some(match kind {
        TokenKind::InstructionHlt => Opcode::Hlt,
        TokenKind::InstructionNop => Opcode::Nop,
        TokenKind::InstructionAdd => Opcode::Add,
        TokenKind::InstructionSub => Opcode::Sub,
        TokenKind::InstructionRsb => Opcode::Rsb,
        TokenKind::InstructionAdc => Opcode::Adc,
        TokenKind::InstructionSbc => Opcode::Sbc,
        TokenKind::InstructionRsc => Opcode::Rsc,
        TokenKind::InstructionMul => Opcode::Mul,
        TokenKind::InstructionUmull => Opcode::Umull,
        TokenKind::InstructionSmull => Opcode::Smull,
        TokenKind::InstructionVabs => Opcode::Vabs,
        TokenKind::InstructionVneg => Opcode::Vneg,
        TokenKind::InstructionVsqrt => Opcode::Vsqrt,
        TokenKind::InstructionVadd => Opcode::Vadd,
        TokenKind::InstructionVsub => Opcode::Vsub,
        TokenKind::InstructionVdiv => Opcode::Vdiv,
        TokenKind::InstructionVmul => Opcode::Vmul,
        TokenKind::InstructionVcmp => Opcode::Vcmp,
        TokenKind::InstructionVsel => Opcode::Vsel,
        TokenKind::InstructionVmov => Opcode::Vmov,
        TokenKind::InstructionAnd => Opcode::And,
        TokenKind::InstructionOrr => Opcode::Orr,
        TokenKind::InstructionEor => Opcode::Eor,
        TokenKind::InstructionBic => Opcode::Bic,
        TokenKind::InstructionLsl => Opcode::Lsl,
        TokenKind::InstructionLsr => Opcode::Lsr,
        TokenKind::InstructionAsr => Opcode::Asr,
        TokenKind::InstructionRor => Opcode::Ror,
        TokenKind::InstructionCmp => Opcode::Cmp,
        TokenKind::InstructionCmn => Opcode::Cmn,
        TokenKind::InstructionTst => Opcode::Tst,
        TokenKind::InstructionTeq => Opcode::Teq,
        TokenKind::InstructionMov => Opcode::Mov,
        TokenKind::InstructionMvn => Opcode::Mvn,
        TokenKind::InstructionLdr => Opcode::Ldr,
        TokenKind::InstructionStr => Opcode::Str,
        TokenKind::InstructionSwp => Opcode::Swp,
        TokenKind::InstructionLdrb => Opcode::Ldrb,
        TokenKind::InstructionStrb => Opcode::Strb,
        TokenKind::InstructionSwpb => Opcode::Swpb,
        TokenKind::InstructionLdrh => Opcode::Ldrh,
        TokenKind::InstructionStrh => Opcode::Strh,
        TokenKind::InstructionSwph => Opcode::Swph,
        TokenKind::InstructionB => Opcode::B,
        TokenKind::InstructionBl => Opcode::Bl,
        TokenKind::InstructionBx | TokenKind::InstructionRet => Opcode::Bx,
        TokenKind::InstructionBlx => Opcode::Blx,
        TokenKind::InstructionSwi => Opcode::Swi,
        TokenKind::InstructionAdrp => Opcode::Adrp,
        _ => return None,
    })
}

fn condition_for(kind: TokenKind) -> Option<Condition> {
    Some(match kind {
        TokenKind::ConditionEq => Condition::Eq,
        TokenKind::ConditionNe => Condition::Ne,
        TokenKind::ConditionCs => Condition::Cs,
        TokenKind::ConditionCc => Condition::Cc,
        TokenKind::ConditionMi => Condition::Mi,
        TokenKind::ConditionPl => Condition::Pl,
        TokenKind::ConditionVs => Condition::Vs,
        TokenKind::ConditionVc => Condition::Vc,
        TokenKind::ConditionHi => Condition::Hi,
        TokenKind::ConditionLs => Condition::Ls,
        TokenKind::ConditionGe => Condition::Ge,
        TokenKind::ConditionLt => Condition::Lt,
        TokenKind::ConditionGt => Condition::Gt,
        TokenKind::ConditionLe => Condition::Le,
        TokenKind::ConditionAl => Condition::Al,
        TokenKind::ConditionNv => Condition::Nv,
        _ => return None,
    })
}

/// Parses an optional `.cond` suffix trailing a branch mnemonic, defaulting to `AL`.
pub fn parse_condition_suffix(tok: &mut Tokenizer) -> Result<Condition, AssemblerError> {
    if tok.is_next(&[TokenKind::Period]) {
        tok.consume_any()?;
        let t = tok.consume_any()?;
        return Ok(condition_for(t.kind).unwrap_or(Condition::Al));
    }
    Ok(Condition::Al)
}

/// Register numbering: `x0..x29` map directly, `sp` is 30, `xzr` is 31 (spec.md §6, §4.8
/// describes 32 registers total with a masked `xzr`).
pub fn parse_register(tok: &mut Tokenizer) -> Result<u8, AssemblerError> {
    let t = tok.consume(&[
        TokenKind::RegisterX,
        TokenKind::RegisterSp,
        TokenKind::RegisterXzr,
    ])?;
    register_number(t)
}

fn register_number(t: &Token) -> Result<u8, AssemblerError> {
    match t.kind {
        TokenKind::RegisterX => t.value.trim_start_matches('x').parse::<u8>().map_err(|_| {
            AssemblerError::MalformedNumber {
                line: t.line,
                text: t.value.clone(),
            }
        }),
        TokenKind::RegisterSp => Ok(30),
        TokenKind::RegisterXzr => Ok(31),
        _ => Err(AssemblerError::ExpectedRegister {
            line: t.line,
            found: t.value.clone(),
        }),
    }
}

fn shift_kind_for(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::InstructionLsl => Some(0),
        TokenKind::InstructionLsr => Some(1),
        TokenKind::InstructionAsr => Some(2),
        TokenKind::InstructionRor => Some(3),
        _ => None,
    }
}

/// `xn` or `xn, <shift> #amt` — used as the register arm of Format O's operand field.
fn parse_reg_with_optional_shift(tok: &mut Tokenizer) -> Result<(u8, u8, u8), AssemblerError> {
    let xm = parse_register(tok)?;
    if tok.is_next(&[TokenKind::Comma]) {
        let saved = tok.get_state();
        tok.consume_any()?;
        if tok.is_next(&[
            TokenKind::InstructionLsl,
            TokenKind::InstructionLsr,
            TokenKind::InstructionAsr,
            TokenKind::InstructionRor,
        ]) {
            let shift_kind = shift_kind_for(tok.get_token().kind).expect("checked above");
            tok.consume_any()?;
            expr::skip_hash(tok);
            let (amt, _) = expr::evaluate_clamped(tok, 0, 31)?;
            return Ok((xm, shift_kind, amt as u8));
        }
        tok.set_state(saved);
    }
    Ok((xm, 0, 0))
}

const NUMERIC_KINDS: [TokenKind; 4] = [
    TokenKind::LiteralNumberDecimal,
    TokenKind::LiteralNumberHexadecimal,
    TokenKind::LiteralNumberBinary,
    TokenKind::LiteralNumberOctal,
];

fn is_next_numeric(tok: &mut Tokenizer) -> bool {
    tok.is_next(&[TokenKind::Hash]) || tok.is_next(&NUMERIC_KINDS)
}

/// A Format-O-style operand: either `#imm` or `xm[, shift #amt]`.
pub fn parse_operand_o(tok: &mut Tokenizer) -> Result<OperandO, AssemblerError> {
    if is_next_numeric(tok) {
        let (value, _) = expr::evaluate_clamped(tok, -(1 << 13), (1 << 14) - 1)?;
        return Ok(OperandO::Imm14(value as u16));
    }
    let (xm, shift_kind, shift_amt) = parse_reg_with_optional_shift(tok)?;
    Ok(OperandO::Reg { xm, shift_kind, shift_amt })
}

pub fn parse_operand_o1(tok: &mut Tokenizer) -> Result<OperandO1, AssemblerError> {
    if is_next_numeric(tok) {
        let (value, _) = expr::evaluate_clamped(tok, 0, (1 << 14) - 1)?;
        return Ok(OperandO1::Imm14(value as u16));
    }
    Ok(OperandO1::Reg(parse_register(tok)?))
}

/// The bracketed addressing operand of a load/store: a register base (with an
/// optional offset and pre/post-index form) or a bare symbol (spec.md §4.3's
/// `ldr xt, [sym]` absolute-data form).
pub enum AddrArg {
    Base { xn: u8, operand: OperandM, mode: AddrMode },
    Symbol(String),
}

pub fn parse_addr_arg(tok: &mut Tokenizer) -> Result<AddrArg, AssemblerError> {
    tok.consume(&[TokenKind::OpenBracket])?;
    let line = tok.peek_line();
    if line.first().map(|t| t.kind) == Some(TokenKind::Symbol)
        && line.get(1).map(|t| t.kind) == Some(TokenKind::CloseBracket)
    {
        let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
        tok.consume(&[TokenKind::CloseBracket])?;
        return Ok(AddrArg::Symbol(name));
    }

    let xn = parse_register(tok)?;
    if tok.is_next(&[TokenKind::Comma]) {
        tok.consume_any()?;
        let operand = if is_next_numeric(tok) {
            let (value, _) = expr::evaluate_clamped(tok, -(1 << 11), (1 << 12) - 1)?;
            OperandM::Imm12(value as u16)
        } else {
            OperandM::Reg(parse_register(tok)?)
        };
        tok.consume(&[TokenKind::CloseBracket])?;
        let mode = if tok.is_next(&[TokenKind::OperatorLogicalNot]) {
            tok.consume_any()?;
            AddrMode::PreIndex
        } else {
            AddrMode::Offset
        };
        return Ok(AddrArg::Base { xn, operand, mode });
    }

    tok.consume(&[TokenKind::CloseBracket])?;
    if tok.is_next(&[TokenKind::Comma]) {
        tok.consume_any()?;
        let operand = if is_next_numeric(tok) {
            let (value, _) = expr::evaluate_clamped(tok, -(1 << 11), (1 << 12) - 1)?;
            OperandM::Imm12(value as u16)
        } else {
            OperandM::Reg(parse_register(tok)?)
        };
        return Ok(AddrArg::Base { xn, operand, mode: AddrMode::PostIndex });
    }
    Ok(AddrArg::Base { xn, operand: OperandM::Imm12(0), mode: AddrMode::Offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenizer::TokenKind;

    #[test]
    fn register_numbering_matches_sp_and_xzr_convention() {
        let mut tok = Tokenizer::new("x5 sp xzr", false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceSpace]);
        assert_eq!(parse_register(&mut tok).unwrap(), 5);
        assert_eq!(parse_register(&mut tok).unwrap(), 30);
        assert_eq!(parse_register(&mut tok).unwrap(), 31);
    }

    #[test]
    fn immediate_operand_parses_with_optional_hash() {
        let mut tok = Tokenizer::new("#10", false).unwrap();
        let operand = parse_operand_o(&mut tok).unwrap();
        assert!(matches!(operand, OperandO::Imm14(10)));
    }

    #[test]
    fn bare_symbol_bracket_is_recognized() {
        let mut tok = Tokenizer::new("[my_sym]", false).unwrap();
        let arg = parse_addr_arg(&mut tok).unwrap();
        assert!(matches!(arg, AddrArg::Symbol(ref s) if s == "my_sym"));
    }

    #[test]
    fn post_index_form_is_recognized() {
        let mut tok = Tokenizer::new("[x0], #4", false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceSpace]);
        let arg = parse_addr_arg(&mut tok).unwrap();
        assert!(matches!(
            arg,
            AddrArg::Base { xn: 0, mode: AddrMode::PostIndex, .. }
        ));
    }
}
