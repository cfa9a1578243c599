//! BELF-level error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("byte I/O error: {0}")]
    Io(#[from] byteio::ByteReadError),

    #[error("bad BELF magic: expected \"BELF\"")]
    BadMagic,

    #[error("unknown file type tag {0}")]
    UnknownFileType(u16),

    #[error("unknown section type tag {0}")]
    UnknownSectionType(u32),

    #[error("unknown symbol binding tag {0}")]
    UnknownBinding(u16),

    #[error("unknown relocation type tag {0}")]
    UnknownRelocationType(u32),

    #[error("section name {name:?} already present")]
    DuplicateSection { name: String },

    #[error("string {value:?} already interned")]
    DuplicateString { value: String },

    #[error("symbol table entry references string index {index}, which is not in `strings`")]
    DanglingSymbolName { index: u64 },

    #[error("relocation references symbol index {index}, which is not in `symbol_table`")]
    DanglingRelocationSymbol { index: u64 },

    #[error("section_table[{name:?}] == {index} but strings[sections[{index}].name_idx] != {name:?}")]
    SectionTableMismatch { name: String, index: usize },

    #[error("text relocation offset {offset} is not a multiple of 4")]
    MisalignedTextRelocation { offset: u64 },

    #[error("too many sections to fit a u16 count")]
    TooManySections,
}
