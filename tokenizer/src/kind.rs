//! The closed set of lexical token kinds the tokenizer can produce.

/// The kind of a single token. Grouped the way the lexer's table and the assembler's
/// directive/instruction dispatch group them; see [`TokenKind::is_whitespace`] and its
/// sibling predicates for the sets the preprocessor and assembler query against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TokenKind {
    /// Lexed but not recognized by any rule; always an error if it reaches the assembler.
    Unknown,

    /// An identifier immediately followed by `:`.
    Label,
    WhitespaceSpace,
    WhitespaceTab,
    WhitespaceNewline,
    CommentSingleLine,
    CommentMultiLine,
    /// A bare `\` at the end of a line, continuing a `#define` value onto the next line.
    Backslash,

    // Preprocessor directives.
    PreprocessorInclude,
    PreprocessorMacro,
    PreprocessorMacret,
    PreprocessorMacend,
    PreprocessorInvoke,
    PreprocessorDefine,
    PreprocessorUndef,
    PreprocessorIfdef,
    PreprocessorIfndef,
    PreprocessorIfequ,
    PreprocessorIfnequ,
    PreprocessorIfless,
    PreprocessorIfmore,
    PreprocessorElse,
    PreprocessorElsedef,
    PreprocessorElsendef,
    PreprocessorElseequ,
    PreprocessorElsenequ,
    PreprocessorElseless,
    PreprocessorElsemore,
    PreprocessorEndif,

    // Assembler directives.
    AssemblerGlobal,
    AssemblerExtern,
    AssemblerOrg,
    AssemblerScope,
    AssemblerScend,
    AssemblerAdvance,
    AssemblerAlign,
    AssemblerText,
    AssemblerData,
    AssemblerBss,
    AssemblerStop,
    AssemblerByte,
    AssemblerDbyte,
    AssemblerWord,
    AssemblerDword,
    AssemblerSbyte,
    AssemblerSdbyte,
    AssemblerSword,
    AssemblerSdword,
    AssemblerChar,
    AssemblerAscii,
    AssemblerAsciz,

    /// `x0`..`x29`; the register number is carried in the token's `value` text.
    RegisterX,
    RegisterSp,
    RegisterXzr,

    // Instruction mnemonics (see spec.md §4.8 for the semantics of each).
    InstructionHlt,
    InstructionNop,
    InstructionAdd,
    InstructionSub,
    InstructionRsb,
    InstructionAdc,
    InstructionSbc,
    InstructionRsc,
    InstructionMul,
    InstructionUmull,
    InstructionSmull,
    InstructionVabs,
    InstructionVneg,
    InstructionVsqrt,
    InstructionVadd,
    InstructionVsub,
    InstructionVdiv,
    InstructionVmul,
    InstructionVcmp,
    InstructionVsel,
    InstructionVmov,
    InstructionAnd,
    InstructionOrr,
    InstructionEor,
    InstructionBic,
    InstructionLsl,
    InstructionLsr,
    InstructionAsr,
    InstructionRor,
    InstructionCmp,
    InstructionCmn,
    InstructionTst,
    InstructionTeq,
    InstructionMov,
    InstructionMvn,
    InstructionLdr,
    InstructionStr,
    InstructionSwp,
    InstructionLdrb,
    InstructionStrb,
    InstructionSwpb,
    InstructionLdrh,
    InstructionStrh,
    InstructionSwph,
    InstructionB,
    InstructionBl,
    InstructionBx,
    InstructionBlx,
    InstructionSwi,
    InstructionAdrp,
    /// Pseudo-instruction: `ret` decodes as `bx x29` (Format B2, `xd == 29`).
    InstructionRet,

    // Condition suffixes attached to branch mnemonics (`b.eq`, `bl.ne`, ...).
    ConditionEq,
    ConditionNe,
    ConditionCs,
    ConditionCc,
    ConditionMi,
    ConditionPl,
    ConditionVs,
    ConditionVc,
    ConditionHi,
    ConditionLs,
    ConditionGe,
    ConditionLt,
    ConditionGt,
    ConditionLe,
    ConditionAl,
    ConditionNv,

    // Literals.
    LiteralFloat,
    LiteralNumberBinary,
    LiteralNumberOctal,
    LiteralNumberDecimal,
    LiteralNumberHexadecimal,
    LiteralChar,
    LiteralString,

    /// An identifier that is not a reserved word: a label reference, macro name, or
    /// `#define` symbol.
    Symbol,

    // Punctuation.
    Colon,
    Comma,
    Period,
    Semicolon,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Hash,

    // Operators (the assembler's expression evaluator only uses the arithmetic four; the
    // rest are recognized for forward compatibility with the original dialect, per the
    // preprocessor's `#ifequ`/`#ifnequ` text-compare conditionals).
    OperatorAdd,
    OperatorSub,
    OperatorMul,
    OperatorDiv,
    OperatorMod,
    OperatorShl,
    OperatorShr,
    OperatorBitXor,
    OperatorBitAnd,
    OperatorBitOr,
    OperatorBitNot,
    OperatorLogicalNot,
    OperatorLogicalEq,
    OperatorLogicalNeq,
    OperatorLogicalLt,
    OperatorLogicalGt,
    OperatorLogicalLe,
    OperatorLogicalGe,
    OperatorLogicalOr,
    OperatorLogicalAnd,

    /// End of the token stream.
    Eof,
}

impl TokenKind {
    /// Whitespace is tracked for indentation but usually filtered out before the
    /// preprocessor/assembler see it.
    #[must_use]
    pub fn is_whitespace(self) -> bool {
        matches!(
            self,
            Self::WhitespaceSpace | Self::WhitespaceTab | Self::WhitespaceNewline
        )
    }

    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(self, Self::CommentSingleLine | Self::CommentMultiLine)
    }

    #[must_use]
    pub fn is_preprocessor_directive(self) -> bool {
        matches!(
            self,
            Self::PreprocessorInclude
                | Self::PreprocessorMacro
                | Self::PreprocessorMacret
                | Self::PreprocessorMacend
                | Self::PreprocessorInvoke
                | Self::PreprocessorDefine
                | Self::PreprocessorUndef
                | Self::PreprocessorIfdef
                | Self::PreprocessorIfndef
                | Self::PreprocessorIfequ
                | Self::PreprocessorIfnequ
                | Self::PreprocessorIfless
                | Self::PreprocessorIfmore
                | Self::PreprocessorElse
                | Self::PreprocessorElsedef
                | Self::PreprocessorElsendef
                | Self::PreprocessorElseequ
                | Self::PreprocessorElsenequ
                | Self::PreprocessorElseless
                | Self::PreprocessorElsemore
                | Self::PreprocessorEndif
        )
    }

    #[must_use]
    pub fn is_assembler_directive(self) -> bool {
        matches!(
            self,
            Self::AssemblerGlobal
                | Self::AssemblerExtern
                | Self::AssemblerOrg
                | Self::AssemblerScope
                | Self::AssemblerScend
                | Self::AssemblerAdvance
                | Self::AssemblerAlign
                | Self::AssemblerText
                | Self::AssemblerData
                | Self::AssemblerBss
                | Self::AssemblerStop
                | Self::AssemblerByte
                | Self::AssemblerDbyte
                | Self::AssemblerWord
                | Self::AssemblerDword
                | Self::AssemblerSbyte
                | Self::AssemblerSdbyte
                | Self::AssemblerSword
                | Self::AssemblerSdword
                | Self::AssemblerChar
                | Self::AssemblerAscii
                | Self::AssemblerAsciz
        )
    }

    #[must_use]
    pub fn is_register(self) -> bool {
        matches!(self, Self::RegisterX | Self::RegisterSp | Self::RegisterXzr)
    }

    #[must_use]
    pub fn is_instruction(self) -> bool {
        matches!(
            self,
            Self::InstructionHlt
                | Self::InstructionNop
                | Self::InstructionAdd
                | Self::InstructionSub
                | Self::InstructionRsb
                | Self::InstructionAdc
                | Self::InstructionSbc
                | Self::InstructionRsc
                | Self::InstructionMul
                | Self::InstructionUmull
                | Self::InstructionSmull
                | Self::InstructionVabs
                | Self::InstructionVneg
                | Self::InstructionVsqrt
                | Self::InstructionVadd
                | Self::InstructionVsub
                | Self::InstructionVdiv
                | Self::InstructionVmul
                | Self::InstructionVcmp
                | Self::InstructionVsel
                | Self::InstructionVmov
                | Self::InstructionAnd
                | Self::InstructionOrr
                | Self::InstructionEor
                | Self::InstructionBic
                | Self::InstructionLsl
                | Self::InstructionLsr
                | Self::InstructionAsr
                | Self::InstructionRor
                | Self::InstructionCmp
                | Self::InstructionCmn
                | Self::InstructionTst
                | Self::InstructionTeq
                | Self::InstructionMov
                | Self::InstructionMvn
                | Self::InstructionLdr
                | Self::InstructionStr
                | Self::InstructionSwp
                | Self::InstructionLdrb
                | Self::InstructionStrb
                | Self::InstructionSwpb
                | Self::InstructionLdrh
                | Self::InstructionStrh
                | Self::InstructionSwph
                | Self::InstructionB
                | Self::InstructionBl
                | Self::InstructionBx
                | Self::InstructionBlx
                | Self::InstructionSwi
                | Self::InstructionAdrp
                | Self::InstructionRet
        )
    }

    #[must_use]
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            Self::ConditionEq
                | Self::ConditionNe
                | Self::ConditionCs
                | Self::ConditionCc
                | Self::ConditionMi
                | Self::ConditionPl
                | Self::ConditionVs
                | Self::ConditionVc
                | Self::ConditionHi
                | Self::ConditionLs
                | Self::ConditionGe
                | Self::ConditionLt
                | Self::ConditionGt
                | Self::ConditionLe
                | Self::ConditionAl
                | Self::ConditionNv
        )
    }

    #[must_use]
    pub fn is_literal_number(self) -> bool {
        matches!(
            self,
            Self::LiteralNumberBinary
                | Self::LiteralNumberOctal
                | Self::LiteralNumberDecimal
                | Self::LiteralNumberHexadecimal
        )
    }

    #[must_use]
    pub fn is_literal(self) -> bool {
        self.is_literal_number()
            || matches!(self, Self::LiteralFloat | Self::LiteralChar | Self::LiteralString)
    }

    #[must_use]
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Self::OperatorAdd
                | Self::OperatorSub
                | Self::OperatorMul
                | Self::OperatorDiv
                | Self::OperatorMod
                | Self::OperatorShl
                | Self::OperatorShr
                | Self::OperatorBitXor
                | Self::OperatorBitAnd
                | Self::OperatorBitOr
                | Self::OperatorBitNot
                | Self::OperatorLogicalNot
                | Self::OperatorLogicalEq
                | Self::OperatorLogicalNeq
                | Self::OperatorLogicalLt
                | Self::OperatorLogicalGt
                | Self::OperatorLogicalLe
                | Self::OperatorLogicalGe
                | Self::OperatorLogicalOr
                | Self::OperatorLogicalAnd
        )
    }

    /// Arithmetic operators understood by the assembler's expression evaluator
    /// (§4.3): `+ - * /` only, no precedence.
    #[must_use]
    pub fn is_arithmetic_operator(self) -> bool {
        matches!(
            self,
            Self::OperatorAdd | Self::OperatorSub | Self::OperatorMul | Self::OperatorDiv
        )
    }
}
