//! Section kinds and headers (spec.md §4.4).

use crate::error::ObjectError;

/// The eight standard sections every BELF carries, always in this order on disk.
pub const FIXED_ORDER: [SectionType; 8] = [
    SectionType::Text,
    SectionType::Data,
    SectionType::Bss,
    SectionType::Symtab,
    SectionType::RelText,
    SectionType::RelData,
    SectionType::RelBss,
    SectionType::Strtab,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    Text,
    Data,
    Bss,
    Symtab,
    RelText,
    RelData,
    RelBss,
    Strtab,
}

impl SectionType {
    #[must_use]
    pub fn standard_name(self) -> &'static str {
        match self {
            Self::Text => ".text",
            Self::Data => ".data",
            Self::Bss => ".bss",
            Self::Symtab => ".symtab",
            Self::RelText => ".rel.text",
            Self::RelData => ".rel.data",
            Self::RelBss => ".rel.bss",
            Self::Strtab => ".strtab",
        }
    }

    #[must_use]
    pub fn standard_entry_size(self) -> u64 {
        match self {
            Self::Text => 4,
            Self::Data | Self::Strtab => 1,
            Self::Bss => 8,
            Self::Symtab => 26,
            Self::RelText | Self::RelData | Self::RelBss => 28,
        }
    }

    pub(crate) fn from_wire(tag: u32) -> Result<Self, ObjectError> {
        Ok(match tag {
            0 => Self::Text,
            1 => Self::Data,
            2 => Self::Bss,
            3 => Self::Symtab,
            4 => Self::RelText,
            5 => Self::RelData,
            6 => Self::RelBss,
            7 => Self::Strtab,
            other => return Err(ObjectError::UnknownSectionType(other)),
        })
    }

    pub(crate) fn to_wire(self) -> u32 {
        match self {
            Self::Text => 0,
            Self::Data => 1,
            Self::Bss => 2,
            Self::Symtab => 3,
            Self::RelText => 4,
            Self::RelData => 5,
            Self::RelBss => 6,
            Self::Strtab => 7,
        }
    }
}

/// A section header entry (45 bytes on disk): name, type, byte range within the body,
/// per-entry stride, and placement metadata carried through from the assembler/linker.
#[derive(Debug, Clone)]
pub struct Section {
    pub name_idx: u64,
    pub kind: SectionType,
    pub start: u64,
    pub size: u64,
    pub entry_size: u64,
    pub load_at_physical: bool,
    pub address: u64,
}
