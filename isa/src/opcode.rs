//! The 64-slot opcode space (spec.md §4.8): the low 50 slots are assigned to real
//! instructions; the rest are unmapped and decode as [`Opcode::Hlt`] by the emulator's
//! dispatch table, not by this type.

use crate::format::Format;

/// One opcode, shared by the assembler's encoder and the emulator's decoder so the two
/// can never disagree about a mnemonic's numeric value or bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Hlt = 0,
    Nop = 1,
    Add = 2,
    Sub = 3,
    Rsb = 4,
    Adc = 5,
    Sbc = 6,
    Rsc = 7,
    Mul = 8,
    Umull = 9,
    Smull = 10,
    Vabs = 11,
    Vneg = 12,
    Vsqrt = 13,
    Vadd = 14,
    Vsub = 15,
    Vdiv = 16,
    Vmul = 17,
    Vcmp = 18,
    Vsel = 19,
    Vmov = 20,
    And = 21,
    Orr = 22,
    Eor = 23,
    Bic = 24,
    Lsl = 25,
    Lsr = 26,
    Asr = 27,
    Ror = 28,
    Cmp = 29,
    Cmn = 30,
    Tst = 31,
    Teq = 32,
    Mov = 33,
    Mvn = 34,
    Ldr = 35,
    Str = 36,
    Swp = 37,
    Ldrb = 38,
    Strb = 39,
    Swpb = 40,
    Ldrh = 41,
    Strh = 42,
    Swph = 43,
    B = 44,
    Bl = 45,
    Bx = 46,
    Blx = 47,
    Swi = 48,
    Adrp = 49,
}

impl Opcode {
    pub const COUNT: u8 = 50;

    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0 => Self::Hlt,
            1 => Self::Nop,
            2 => Self::Add,
            3 => Self::Sub,
            4 => Self::Rsb,
            5 => Self::Adc,
            6 => Self::Sbc,
            7 => Self::Rsc,
            8 => Self::Mul,
            9 => Self::Umull,
            10 => Self::Smull,
            11 => Self::Vabs,
            12 => Self::Vneg,
            13 => Self::Vsqrt,
            14 => Self::Vadd,
            15 => Self::Vsub,
            16 => Self::Vdiv,
            17 => Self::Vmul,
            18 => Self::Vcmp,
            19 => Self::Vsel,
            20 => Self::Vmov,
            21 => Self::And,
            22 => Self::Orr,
            23 => Self::Eor,
            24 => Self::Bic,
            25 => Self::Lsl,
            26 => Self::Lsr,
            27 => Self::Asr,
            28 => Self::Ror,
            29 => Self::Cmp,
            30 => Self::Cmn,
            31 => Self::Tst,
            32 => Self::Teq,
            33 => Self::Mov,
            34 => Self::Mvn,
            35 => Self::Ldr,
            36 => Self::Str,
            37 => Self::Swp,
            38 => Self::Ldrb,
            39 => Self::Strb,
            40 => Self::Swpb,
            41 => Self::Ldrh,
            42 => Self::Strh,
            43 => Self::Swph,
            44 => Self::B,
            45 => Self::Bl,
            46 => Self::Bx,
            47 => Self::Blx,
            48 => Self::Swi,
            49 => Self::Adrp,
            _ => return None,
        })
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The instruction format this opcode is encoded/decoded with (spec.md §4.3).
    #[must_use]
    pub fn format(self) -> Format {
        match self {
            Self::Hlt
            | Self::Nop
            | Self::Add
            | Self::Sub
            | Self::Rsb
            | Self::Adc
            | Self::Sbc
            | Self::Rsc
            | Self::Mul
            | Self::And
            | Self::Orr
            | Self::Eor
            | Self::Bic
            | Self::Cmp
            | Self::Cmn
            | Self::Tst
            | Self::Teq
            | Self::Vabs
            | Self::Vneg
            | Self::Vsqrt
            | Self::Vadd
            | Self::Vsub
            | Self::Vdiv
            | Self::Vmul
            | Self::Vcmp
            | Self::Vsel
            | Self::Vmov => Format::O,
            Self::Lsl | Self::Lsr | Self::Asr | Self::Ror => Format::O1,
            Self::Umull | Self::Smull => Format::O2,
            Self::Mov | Self::Mvn => Format::O3,
            Self::Ldr
            | Self::Str
            | Self::Swp
            | Self::Ldrb
            | Self::Strb
            | Self::Swpb
            | Self::Ldrh
            | Self::Strh
            | Self::Swph => Format::M,
            Self::Adrp => Format::M1,
            Self::B | Self::Bl => Format::B1,
            Self::Bx | Self::Blx => Format::B2,
            Self::Swi => Format::S,
        }
    }

    /// Whether this opcode reads/sets the S-bit (condition flags) per its format, i.e.
    /// every format with an `S` field (`O`, `O3`, `M`).
    #[must_use]
    pub fn has_s_bit(self) -> bool {
        matches!(self.format(), Format::O | Format::O3 | Format::M)
    }
}
