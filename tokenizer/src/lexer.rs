//! Table-driven lexing: an ordered list of `(anchored regex, kind)` pairs, with a
//! prefix fast-path for alphanumeric-leading tokens (registers, mnemonics, directives,
//! conditions) checked by exact match before falling back to the regex table.

use crate::kind::TokenKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// One lexer rule: an anchored pattern and the kind it produces on match.
struct Rule {
    regex: Regex,
    kind: TokenKind,
}

fn rule(pattern: &str, kind: TokenKind) -> Rule {
    Rule {
        regex: Regex::new(&format!("^(?:{pattern})")).expect("lexer pattern is valid regex"),
        kind,
    }
}

/// The ordered token spec: first match wins, mirroring `Tokenizer::TOKEN_SPEC`.
static TOKEN_SPEC: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"\\\n", TokenKind::Backslash),
        rule(r"\n", TokenKind::WhitespaceNewline),
        rule(r"\t", TokenKind::WhitespaceTab),
        rule(r"[ ]+", TokenKind::WhitespaceSpace),
        rule(r";\*(?:[^*]|\*[^;])*\*;", TokenKind::CommentMultiLine),
        rule(r";[^\n]*", TokenKind::CommentSingleLine),
        rule(r#""(?:[^"\\]|\\.)*""#, TokenKind::LiteralString),
        rule(r"'(?:[^'\\]|\\.)'", TokenKind::LiteralChar),
        rule(r"\$[0-9a-fA-F]+", TokenKind::LiteralNumberHexadecimal),
        rule(r"%[01]+", TokenKind::LiteralNumberBinary),
        rule(r"@[0-7]+", TokenKind::LiteralNumberOctal),
        rule(r"\d*\.\d+", TokenKind::LiteralFloat),
        rule(r"\d+", TokenKind::LiteralNumberDecimal),
        rule(r"[A-Za-z_]\w*:", TokenKind::Label),
        rule(r"[A-Za-z_]\w*", TokenKind::Symbol),
        rule(r"<<", TokenKind::OperatorShl),
        rule(r">>", TokenKind::OperatorShr),
        rule(r"==", TokenKind::OperatorLogicalEq),
        rule(r"!=", TokenKind::OperatorLogicalNeq),
        rule(r"<=", TokenKind::OperatorLogicalLe),
        rule(r">=", TokenKind::OperatorLogicalGe),
        rule(r"&&", TokenKind::OperatorLogicalAnd),
        rule(r"\|\|", TokenKind::OperatorLogicalOr),
        rule(r"\+", TokenKind::OperatorAdd),
        rule(r"-", TokenKind::OperatorSub),
        rule(r"\*", TokenKind::OperatorMul),
        rule(r"/", TokenKind::OperatorDiv),
        rule(r"%", TokenKind::OperatorMod),
        rule(r"\^", TokenKind::OperatorBitXor),
        rule(r"&", TokenKind::OperatorBitAnd),
        rule(r"\|", TokenKind::OperatorBitOr),
        rule(r"~", TokenKind::OperatorBitNot),
        rule(r"!", TokenKind::OperatorLogicalNot),
        rule(r"<", TokenKind::OperatorLogicalLt),
        rule(r">", TokenKind::OperatorLogicalGt),
        rule(r":", TokenKind::Colon),
        rule(r",", TokenKind::Comma),
        rule(r"\.", TokenKind::Period),
        rule(r";", TokenKind::Semicolon),
        rule(r"\(", TokenKind::OpenParen),
        rule(r"\)", TokenKind::CloseParen),
        rule(r"\[", TokenKind::OpenBracket),
        rule(r"\]", TokenKind::CloseBracket),
        rule(r"\{", TokenKind::OpenBrace),
        rule(r"\}", TokenKind::CloseBrace),
        rule(r"#", TokenKind::Hash),
    ]
});

/// Exact-match map used by the prefix fast-path for identifier-shaped tokens, keyed by
/// lowercase spelling. Checked before the `Symbol`/`Label` regex rules so e.g. `mov` is
/// classified as `InstructionMov` rather than a generic `Symbol`.
static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind as T;
    let mut m = HashMap::new();
    let pairs: &[(&str, TokenKind)] = &[
        ("#include", T::PreprocessorInclude),
        ("#macro", T::PreprocessorMacro),
        ("#macret", T::PreprocessorMacret),
        ("#macend", T::PreprocessorMacend),
        ("#invoke", T::PreprocessorInvoke),
        ("#define", T::PreprocessorDefine),
        ("#undef", T::PreprocessorUndef),
        ("#ifdef", T::PreprocessorIfdef),
        ("#ifndef", T::PreprocessorIfndef),
        ("#ifequ", T::PreprocessorIfequ),
        ("#ifnequ", T::PreprocessorIfnequ),
        ("#ifless", T::PreprocessorIfless),
        ("#ifmore", T::PreprocessorIfmore),
        ("#else", T::PreprocessorElse),
        ("#elsedef", T::PreprocessorElsedef),
        ("#elsendef", T::PreprocessorElsendef),
        ("#elseequ", T::PreprocessorElseequ),
        ("#elsenequ", T::PreprocessorElsenequ),
        ("#elseless", T::PreprocessorElseless),
        ("#elsemore", T::PreprocessorElsemore),
        ("#endif", T::PreprocessorEndif),
        (".global", T::AssemblerGlobal),
        (".extern", T::AssemblerExtern),
        (".org", T::AssemblerOrg),
        (".scope", T::AssemblerScope),
        (".scend", T::AssemblerScend),
        (".advance", T::AssemblerAdvance),
        (".align", T::AssemblerAlign),
        (".text", T::AssemblerText),
        (".data", T::AssemblerData),
        (".bss", T::AssemblerBss),
        (".stop", T::AssemblerStop),
        (".byte", T::AssemblerByte),
        (".dbyte", T::AssemblerDbyte),
        (".word", T::AssemblerWord),
        (".dword", T::AssemblerDword),
        (".sbyte", T::AssemblerSbyte),
        (".sdbyte", T::AssemblerSdbyte),
        (".sword", T::AssemblerSword),
        (".sdword", T::AssemblerSdword),
        (".char", T::AssemblerChar),
        (".ascii", T::AssemblerAscii),
        (".asciz", T::AssemblerAsciz),
        ("sp", T::RegisterSp),
        ("xzr", T::RegisterXzr),
        ("hlt", T::InstructionHlt),
        ("nop", T::InstructionNop),
        ("add", T::InstructionAdd),
        ("sub", T::InstructionSub),
        ("rsb", T::InstructionRsb),
        ("adc", T::InstructionAdc),
        ("sbc", T::InstructionSbc),
        ("rsc", T::InstructionRsc),
        ("mul", T::InstructionMul),
        ("umull", T::InstructionUmull),
        ("smull", T::InstructionSmull),
        ("vabs", T::InstructionVabs),
        ("vneg", T::InstructionVneg),
        ("vsqrt", T::InstructionVsqrt),
        ("vadd", T::InstructionVadd),
        ("vsub", T::InstructionVsub),
        ("vdiv", T::InstructionVdiv),
        ("vmul", T::InstructionVmul),
        ("vcmp", T::InstructionVcmp),
        ("vsel", T::InstructionVsel),
        ("vmov", T::InstructionVmov),
        ("and", T::InstructionAnd),
        ("orr", T::InstructionOrr),
        ("eor", T::InstructionEor),
        ("bic", T::InstructionBic),
        ("lsl", T::InstructionLsl),
        ("lsr", T::InstructionLsr),
        ("asr", T::InstructionAsr),
        ("ror", T::InstructionRor),
        ("cmp", T::InstructionCmp),
        ("cmn", T::InstructionCmn),
        ("tst", T::InstructionTst),
        ("teq", T::InstructionTeq),
        ("mov", T::InstructionMov),
        ("mvn", T::InstructionMvn),
        ("ldr", T::InstructionLdr),
        ("str", T::InstructionStr),
        ("swp", T::InstructionSwp),
        ("ldrb", T::InstructionLdrb),
        ("strb", T::InstructionStrb),
        ("swpb", T::InstructionSwpb),
        ("ldrh", T::InstructionLdrh),
        ("strh", T::InstructionStrh),
        ("swph", T::InstructionSwph),
        ("b", T::InstructionB),
        ("bl", T::InstructionBl),
        ("bx", T::InstructionBx),
        ("blx", T::InstructionBlx),
        ("swi", T::InstructionSwi),
        ("adrp", T::InstructionAdrp),
        ("ret", T::InstructionRet),
        ("eq", T::ConditionEq),
        ("ne", T::ConditionNe),
        ("cs", T::ConditionCs),
        ("hs", T::ConditionCs),
        ("cc", T::ConditionCc),
        ("lo", T::ConditionCc),
        ("mi", T::ConditionMi),
        ("pl", T::ConditionPl),
        ("vs", T::ConditionVs),
        ("vc", T::ConditionVc),
        ("hi", T::ConditionHi),
        ("ls", T::ConditionLs),
        ("ge", T::ConditionGe),
        ("lt", T::ConditionLt),
        ("gt", T::ConditionGt),
        ("le", T::ConditionLe),
        ("al", T::ConditionAl),
        ("nv", T::ConditionNv),
    ];
    m.extend(pairs.iter().copied());
    for n in 0..=29 {
        // Leaked once into the static map; register names are a fixed, small set.
        let name: &'static str = Box::leak(format!("x{n}").into_boxed_str());
        m.insert(name, T::RegisterX);
    }
    m
});

/// Matches the prefix fast-path: an identifier-shaped run of `[A-Za-z_#.][A-Za-z0-9_]*`
/// at the start of `input`, checked against `KEYWORDS` by exact (lowercased) text.
fn keyword_prefix(input: &str) -> Option<(TokenKind, usize)> {
    let ident_re: &Regex = {
        static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[#.]?[A-Za-z_][A-Za-z0-9_]*").unwrap());
        &RE
    };
    let m = ident_re.find(input)?;
    let text = m.as_str();
    KEYWORDS
        .get(text.to_ascii_lowercase().as_str())
        .map(|&kind| (kind, text.len()))
}

/// Attempts one lexer step at the start of `input`. Returns the matched kind and the
/// byte length of the matched text, or `None` if no rule matches.
pub(crate) fn lex_one(input: &str) -> Option<(TokenKind, usize)> {
    if let Some(hit) = keyword_prefix(input) {
        return Some(hit);
    }
    for rule in TOKEN_SPEC.iter() {
        if let Some(m) = rule.regex.find(input) {
            if m.start() == 0 && m.end() > 0 {
                return Some((rule.kind, m.end()));
            }
        }
    }
    None
}
