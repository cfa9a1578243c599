//! Symbol table entries (spec.md §3, §4.4).

use crate::error::ObjectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Local,
    Global,
    Weak,
}

impl Binding {
    pub(crate) fn from_wire(tag: u16) -> Result<Self, ObjectError> {
        Ok(match tag {
            0 => Self::Local,
            1 => Self::Global,
            2 => Self::Weak,
            other => return Err(ObjectError::UnknownBinding(other)),
        })
    }

    pub(crate) fn to_wire(self) -> u16 {
        match self {
            Self::Local => 0,
            Self::Global => 1,
            Self::Weak => 2,
        }
    }
}

/// A symbol table entry. Keyed in [`crate::ObjectFile::symbol_table`] by the
/// string-table index of its own name (there is no separate symbol id space).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub value: u64,
    pub binding: Binding,
    /// Section index, or `-1` for a symbol with no section (e.g. `.extern`).
    pub section_idx: i64,
}
