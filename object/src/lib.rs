//! BELF (Binary Emulator Linkable Format) object files (spec.md §4.4) and the trivial
//! static-library archive built on top of them (spec.md §4.5).
//!
//! An [`ObjectFile`] always carries exactly the eight standard sections in
//! [`section::FIXED_ORDER`]; `to_bytes`/`from_bytes` round-trip the on-disk layout
//! byte-for-byte (header, section payloads in fixed order, section-header table, and a
//! trailing 8-byte pointer to that table).

#![warn(clippy::all)]

mod error;
mod library;
mod relocation;
mod section;
mod symbol;

pub use error::ObjectError;
pub use library::StaticLibrary;
pub use relocation::{Relocation, RelocationType};
pub use section::{Section, SectionType, FIXED_ORDER};
pub use symbol::{Binding, Symbol};

use byteio::{ByteReader, ByteWriter};
use std::collections::{BTreeMap, HashMap};

const MAGIC: &[u8; 4] = b"BELF";
const HEADER_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Relocatable,
    Executable,
}

impl FileType {
    fn from_wire(tag: u16) -> Result<Self, ObjectError> {
        Ok(match tag {
            0 => Self::Relocatable,
            1 => Self::Executable,
            other => return Err(ObjectError::UnknownFileType(other)),
        })
    }

    fn to_wire(self) -> u16 {
        match self {
            Self::Relocatable => 0,
            Self::Executable => 1,
        }
    }
}

/// A complete BELF object: header metadata, section payloads, symbol table, relocation
/// tables, and the interned string table backing both.
#[derive(Debug, Clone)]
pub struct ObjectFile {
    pub file_type: FileType,
    pub target_machine: u16,
    pub flags: u16,

    pub text_section: Vec<u32>,
    pub data_section: Vec<u8>,
    pub bss_section: u64,

    /// Keyed by the string-table index of the symbol's own name.
    pub symbol_table: BTreeMap<u64, Symbol>,
    pub rel_text: Vec<Relocation>,
    pub rel_data: Vec<Relocation>,
    pub rel_bss: Vec<Relocation>,

    pub strings: Vec<String>,
    pub string_table: HashMap<String, u64>,

    pub sections: Vec<Section>,
    pub section_table: HashMap<String, usize>,
}

impl ObjectFile {
    /// Builds an empty object with the eight standard sections already present (sized
    /// zero) and their names interned.
    #[must_use]
    pub fn new(file_type: FileType, target_machine: u16, flags: u16) -> Self {
        let mut obj = Self {
            file_type,
            target_machine,
            flags,
            text_section: Vec::new(),
            data_section: Vec::new(),
            bss_section: 0,
            symbol_table: BTreeMap::new(),
            rel_text: Vec::new(),
            rel_data: Vec::new(),
            rel_bss: Vec::new(),
            strings: Vec::new(),
            string_table: HashMap::new(),
            sections: Vec::new(),
            section_table: HashMap::new(),
        };
        for kind in FIXED_ORDER {
            let name = kind.standard_name();
            let name_idx = obj.intern(name);
            let index = obj.sections.len();
            obj.sections.push(Section {
                name_idx,
                kind,
                start: 0,
                size: 0,
                entry_size: kind.standard_entry_size(),
                load_at_physical: false,
                address: 0,
            });
            obj.section_table.insert(name.to_string(), index);
        }
        obj
    }

    #[must_use]
    pub fn section_index(&self, kind: SectionType) -> usize {
        FIXED_ORDER.iter().position(|&k| k == kind).expect("fixed order contains every kind")
    }

    /// Interns `s`, returning its existing index if already present (get-or-insert).
    pub fn intern(&mut self, s: &str) -> u64 {
        if let Some(&idx) = self.string_table.get(s) {
            return idx;
        }
        let idx = u64::try_from(self.strings.len()).expect("string table fits in u64");
        self.strings.push(s.to_string());
        self.string_table.insert(s.to_string(), idx);
        idx
    }

    /// Strict insertion used when a caller has already checked [`ObjectFile::intern`]
    /// isn't appropriate and wants an explicit duplicate error (spec.md §3 invariant f).
    pub fn add_string(&mut self, s: &str) -> Result<u64, ObjectError> {
        if self.string_table.contains_key(s) {
            return Err(ObjectError::DuplicateString { value: s.to_string() });
        }
        Ok(self.intern(s))
    }

    /// Checks the invariants from spec.md §3 before serialization.
    pub fn validate(&self) -> Result<(), ObjectError> {
        for &name_idx in self.symbol_table.keys() {
            if self.strings.get(name_idx as usize).is_none() {
                return Err(ObjectError::DanglingSymbolName { index: name_idx });
            }
        }
        for rel in self.rel_text.iter().chain(&self.rel_data).chain(&self.rel_bss) {
            if !self.symbol_table.contains_key(&rel.symbol_idx) {
                return Err(ObjectError::DanglingRelocationSymbol {
                    index: rel.symbol_idx,
                });
            }
        }
        for rel in &self.rel_text {
            if rel.offset % 4 != 0 {
                return Err(ObjectError::MisalignedTextRelocation { offset: rel.offset });
            }
        }
        for (name, &idx) in &self.section_table {
            let section = &self.sections[idx];
            if self.strings.get(section.name_idx as usize).map(String::as_str) != Some(name.as_str()) {
                return Err(ObjectError::SectionTableMismatch {
                    name: name.clone(),
                    index: idx,
                });
            }
        }
        Ok(())
    }

    /// Serializes to the on-disk BELF layout (spec.md §4.4).
    pub fn to_bytes(&self) -> Result<Vec<u8>, ObjectError> {
        self.validate()?;
        let mut headers = self.sections.clone();
        let mut w = ByteWriter::new();
        w.write_bytes(MAGIC);
        w.write_bytes(&[0u8; 12]);
        w.write_u16(self.file_type.to_wire());
        w.write_u16(self.target_machine);
        w.write_u16(self.flags);
        let section_count = u16::try_from(headers.len()).map_err(|_| ObjectError::TooManySections)?;
        w.write_u16(section_count);
        debug_assert_eq!(w.len(), HEADER_LEN);

        for kind in FIXED_ORDER {
            let idx = self.section_index(kind);
            let start = u64::try_from(w.len()).expect("body fits in u64");
            match kind {
                SectionType::Text => {
                    for word in &self.text_section {
                        w.write_u32(*word);
                    }
                }
                SectionType::Data => {
                    w.write_bytes(&self.data_section);
                }
                SectionType::Bss => {
                    w.write_u64(self.bss_section);
                }
                SectionType::Symtab => {
                    for (&name_idx, sym) in &self.symbol_table {
                        w.write_u64(name_idx);
                        w.write_u64(sym.value);
                        w.write_u16(sym.binding.to_wire());
                        w.write_i64(sym.section_idx);
                    }
                }
                SectionType::RelText => write_relocations(&mut w, &self.rel_text),
                SectionType::RelData => write_relocations(&mut w, &self.rel_data),
                SectionType::RelBss => write_relocations(&mut w, &self.rel_bss),
                SectionType::Strtab => {
                    for s in &self.strings {
                        w.write_cstr(s);
                    }
                }
            }
            let size = u64::try_from(w.len()).expect("body fits in u64") - start;
            headers[idx].start = start;
            headers[idx].size = size;
        }

        let section_header_start = u64::try_from(w.len()).expect("body fits in u64");
        for h in &headers {
            w.write_u64(h.name_idx);
            w.write_u32(h.kind.to_wire());
            w.write_u64(h.start);
            w.write_u64(h.size);
            w.write_u64(h.entry_size);
            w.write_u8(u8::from(h.load_at_physical));
            w.write_u64(h.address);
        }
        w.write_u64(section_header_start);

        Ok(w.into_bytes())
    }

    /// Parses the on-disk BELF layout (spec.md §4.4).
    pub fn from_bytes(data: &[u8]) -> Result<Self, ObjectError> {
        let mut r = ByteReader::new(data);
        let magic = r.read_bytes(4)?;
        if magic != MAGIC {
            return Err(ObjectError::BadMagic);
        }
        r.read_bytes(12)?;
        let file_type = FileType::from_wire(r.read_u16()?)?;
        let target_machine = r.read_u16()?;
        let flags = r.read_u16()?;
        let section_count = r.read_u16()? as usize;

        let mut tail = ByteReader::new(data);
        tail.seek(data.len() - 8);
        let section_header_start = tail.read_u64()? as usize;

        let mut sh = ByteReader::new(data);
        sh.seek(section_header_start);
        let mut headers = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            let name_idx = sh.read_u64()?;
            let kind = SectionType::from_wire(sh.read_u32()?)?;
            let start = sh.read_u64()?;
            let size = sh.read_u64()?;
            let entry_size = sh.read_u64()?;
            let load_at_physical = sh.read_u8()? != 0;
            let address = sh.read_u64()?;
            headers.push(Section {
                name_idx,
                kind,
                start,
                size,
                entry_size,
                load_at_physical,
                address,
            });
        }

        let strtab_header = headers
            .iter()
            .find(|h| h.kind == SectionType::Strtab)
            .expect("every BELF carries a .strtab header");
        let mut strings = Vec::new();
        let mut string_table = HashMap::new();
        let mut sr = ByteReader::new(data);
        sr.seek(strtab_header.start as usize);
        let strtab_end = (strtab_header.start + strtab_header.size) as usize;
        while sr.position() < strtab_end {
            let idx = u64::try_from(strings.len()).expect("string table fits in u64");
            let s = sr.read_cstr()?;
            string_table.insert(s.clone(), idx);
            strings.push(s);
        }

        let mut text_section = Vec::new();
        let mut data_section = Vec::new();
        let mut bss_section = 0u64;
        let mut symbol_table = BTreeMap::new();
        let mut rel_text = Vec::new();
        let mut rel_data = Vec::new();
        let mut rel_bss = Vec::new();

        for h in &headers {
            let mut br = ByteReader::new(data);
            br.seek(h.start as usize);
            let end = (h.start + h.size) as usize;
            match h.kind {
                SectionType::Text => {
                    while br.position() < end {
                        text_section.push(br.read_u32()?);
                    }
                }
                SectionType::Data => {
                    data_section = br.read_bytes((h.size) as usize)?.to_vec();
                }
                SectionType::Bss => {
                    bss_section = br.read_u64()?;
                }
                SectionType::Symtab => {
                    while br.position() < end {
                        let name_idx = br.read_u64()?;
                        let value = br.read_u64()?;
                        let binding = Binding::from_wire(br.read_u16()?)?;
                        let section_idx = br.read_i64()?;
                        symbol_table.insert(
                            name_idx,
                            Symbol {
                                value,
                                binding,
                                section_idx,
                            },
                        );
                    }
                }
                SectionType::RelText => rel_text = read_relocations(&mut br, end)?,
                SectionType::RelData => rel_data = read_relocations(&mut br, end)?,
                SectionType::RelBss => rel_bss = read_relocations(&mut br, end)?,
                SectionType::Strtab => {}
            }
        }

        let mut section_table = HashMap::new();
        for (idx, h) in headers.iter().enumerate() {
            let name = strings
                .get(h.name_idx as usize)
                .cloned()
                .ok_or(ObjectError::DanglingSymbolName { index: h.name_idx })?;
            section_table.insert(name, idx);
        }

        let obj = Self {
            file_type,
            target_machine,
            flags,
            text_section,
            data_section,
            bss_section,
            symbol_table,
            rel_text,
            rel_data,
            rel_bss,
            strings,
            string_table,
            sections: headers,
            section_table,
        };
        obj.validate()?;
        Ok(obj)
    }
}

fn write_relocations(w: &mut ByteWriter, rels: &[Relocation]) {
    for rel in rels {
        w.write_u64(rel.offset);
        w.write_u64(rel.symbol_idx);
        w.write_u32(rel.reloc_type.to_wire());
        w.write_u64(rel.shift);
    }
}

fn read_relocations(r: &mut ByteReader, end: usize) -> Result<Vec<Relocation>, ObjectError> {
    let mut out = Vec::new();
    while r.position() < end {
        let offset = r.read_u64()?;
        let symbol_idx = r.read_u64()?;
        let reloc_type = RelocationType::from_wire(r.read_u32()?)?;
        let shift = r.read_u64()?;
        out.push(Relocation::new(offset, symbol_idx, reloc_type, shift));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_empty_object() {
        let obj = ObjectFile::new(FileType::Relocatable, 1, 0);
        let bytes = obj.to_bytes().unwrap();
        let back = ObjectFile::from_bytes(&bytes).unwrap();
        assert_eq!(back.text_section, obj.text_section);
        assert_eq!(back.symbol_table.len(), obj.symbol_table.len());
        assert_eq!(back.strings, obj.strings);
    }

    #[test]
    fn round_trip_with_symbols_and_relocations() {
        let mut obj = ObjectFile::new(FileType::Relocatable, 1, 0);
        obj.text_section = vec![0xD503_201F, 0x1400_0000];
        obj.data_section = vec![1, 2, 3, 4];
        obj.bss_section = 16;

        let f_idx = obj.intern("f");
        obj.symbol_table.insert(
            f_idx,
            Symbol {
                value: 0,
                binding: Binding::Global,
                section_idx: obj.section_index(SectionType::Text) as i64,
            },
        );
        obj.rel_text.push(Relocation::new(4, f_idx, RelocationType::BOffset22, 0));

        let bytes = obj.to_bytes().unwrap();
        let back = ObjectFile::from_bytes(&bytes).unwrap();
        assert_eq!(back.text_section, obj.text_section);
        assert_eq!(back.data_section, obj.data_section);
        assert_eq!(back.bss_section, obj.bss_section);
        assert_eq!(back.symbol_table[&f_idx].value, 0);
        assert_eq!(back.rel_text.len(), 1);
        assert_eq!(back.rel_text[0].offset, 4);
        assert_eq!(back.rel_text[0].symbol_idx, f_idx);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = vec![0u8; 32];
        assert!(matches!(ObjectFile::from_bytes(&bytes), Err(ObjectError::BadMagic)));
    }

    #[test]
    fn misaligned_text_relocation_fails_validation() {
        let mut obj = ObjectFile::new(FileType::Relocatable, 1, 0);
        let f_idx = obj.intern("f");
        obj.symbol_table.insert(
            f_idx,
            Symbol {
                value: 0,
                binding: Binding::Global,
                section_idx: -1,
            },
        );
        obj.rel_text.push(Relocation::new(3, f_idx, RelocationType::BOffset22, 0));
        assert!(matches!(
            obj.validate(),
            Err(ObjectError::MisalignedTextRelocation { offset: 3 })
        ));
    }

    #[test]
    fn duplicate_string_insertion_is_an_error() {
        let mut obj = ObjectFile::new(FileType::Relocatable, 1, 0);
        obj.intern("f");
        assert!(matches!(
            obj.add_string("f"),
            Err(ObjectError::DuplicateString { .. })
        ));
    }
}
