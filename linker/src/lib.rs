//! The linker (spec.md §4.6): combines relocatable [`ObjectFile`]s produced by the
//! assembler into a single executable, resolving PC-relative branches in place and
//! deferring absolute-style relocations to the loader.

#![warn(clippy::all)]

mod error;
mod script;

pub use error::LinkerError;
pub use script::{LinkerScript, SectionKind, SectionPlacement};

use isa::{decode_b1, decode_opcode, encode_b1};
use object::{Binding, FileType, ObjectFile, Relocation, RelocationType, SectionType, Symbol};
use std::collections::HashMap;

/// Links `inputs` (in declaration order) against `script_source`, or the default script
/// (spec.md §4.6) when `None`.
pub fn link(inputs: Vec<ObjectFile>, script_source: Option<&str>) -> Result<ObjectFile, LinkerError> {
    let script = match script_source {
        Some(src) => script::parse(src)?,
        None => LinkerScript::default_script(),
    };
    log::info!("linking {} object file(s), entry `{}`", inputs.len(), script.entry);
    link_with_script(inputs, &script)
}

fn link_with_script(inputs: Vec<ObjectFile>, script: &LinkerScript) -> Result<ObjectFile, LinkerError> {
    let target_machine = inputs.first().map_or(0, |o| o.target_machine);
    let mut exe = ObjectFile::new(FileType::Executable, target_machine, 0);

    // Step 2: concatenate sections in declaration order, recording each input's running
    // offset within the combined section so symbol values and relocation offsets can be
    // translated later.
    let mut text_offsets = Vec::with_capacity(inputs.len());
    let mut data_offsets = Vec::with_capacity(inputs.len());
    let mut bss_offsets = Vec::with_capacity(inputs.len());
    let (mut text_run, mut data_run, mut bss_run) = (0u64, 0u64, 0u64);
    for obj in &inputs {
        text_offsets.push(text_run);
        data_offsets.push(data_run);
        bss_offsets.push(bss_run);
        exe.text_section.extend_from_slice(&obj.text_section);
        exe.data_section.extend_from_slice(&obj.data_section);
        exe.bss_section += obj.bss_section;
        text_run += obj.text_section.len() as u64 * 4;
        data_run += obj.data_section.len() as u64;
        bss_run += obj.bss_section;
    }

    // Step 3: apply the script's section placement. The cursor threads across every
    // placement statement in script order regardless of section kind (spec.md §4.6:
    // "packed consecutively ... or at the cursor after the previous section").
    let mut base = HashMap::new();
    let mut cursor = 0u64;
    for placement in &script.sections {
        let (kind, size) = match placement.kind {
            SectionKind::Text => (SectionType::Text, exe.text_section.len() as u64 * 4),
            SectionKind::Data => (SectionType::Data, exe.data_section.len() as u64),
            SectionKind::Bss => (SectionType::Bss, exe.bss_section),
        };
        let address = placement.address.unwrap_or(cursor);
        let idx = exe.section_index(kind);
        exe.sections[idx].address = address;
        exe.sections[idx].load_at_physical = placement.physical;
        base.insert(placement.kind, address);
        cursor = address + size;
        log::debug!(
            "section {:?} placed at {:#x} ({} bytes, physical={})",
            placement.kind, address, size, placement.physical
        );
    }
    let text_base = *base.get(&SectionKind::Text).unwrap_or(&0);
    let data_base = *base.get(&SectionKind::Data).unwrap_or(&0);
    let bss_base = *base.get(&SectionKind::Bss).unwrap_or(&0);

    // Step 4: symbol merging. `remap` tracks, for every (input index, input-local string
    // index) pair, the resolved (exe string index, absolute value, binding) so the
    // relocation pass below can dereference a relocation's symbol through its input.
    let mut remap: HashMap<(usize, u64), (u64, u64, Binding)> = HashMap::new();
    for (i, obj) in inputs.iter().enumerate() {
        let obj_text_idx = obj.section_index(SectionType::Text) as i64;
        let obj_data_idx = obj.section_index(SectionType::Data) as i64;
        let obj_bss_idx = obj.section_index(SectionType::Bss) as i64;
        for (&name_idx, sym) in &obj.symbol_table {
            let base_name = &obj.strings[name_idx as usize];
            let mangled = if sym.binding == Binding::Local {
                format!("{base_name}:LOCAL:{i}")
            } else {
                base_name.clone()
            };
            let value = if sym.section_idx == obj_text_idx {
                sym.value + text_base + text_offsets[i]
            } else if sym.section_idx == obj_data_idx {
                sym.value + data_base + data_offsets[i]
            } else if sym.section_idx == obj_bss_idx {
                sym.value + bss_base + bss_offsets[i]
            } else {
                sym.value
            };

            let exe_name_idx = exe.intern(&mangled);
            let keep_existing = exe
                .symbol_table
                .get(&exe_name_idx)
                .is_some_and(|existing| existing.binding != Binding::Weak && sym.binding == Binding::Weak);
            if !keep_existing {
                exe.symbol_table.insert(
                    exe_name_idx,
                    Symbol { value, binding: sym.binding, section_idx: sym.section_idx },
                );
            }
            let final_binding = exe.symbol_table[&exe_name_idx].binding;
            let final_value = exe.symbol_table[&exe_name_idx].value;
            remap.insert((i, name_idx), (exe_name_idx, final_value, final_binding));
        }
    }

    // Step 5: relocations. PC-relative branches are resolved now; absolute-style
    // relocations are deferred to the loader (spec.md §4.6 step 5).
    for (i, obj) in inputs.iter().enumerate() {
        for rel in &obj.rel_text {
            let (exe_name_idx, value, binding) = *remap
                .get(&(i, rel.symbol_idx))
                .expect("every relocation's symbol index has a symbol table entry (spec.md §3)");
            let symbol_name = exe.strings[exe_name_idx as usize].clone();
            if binding == Binding::Weak {
                return Err(LinkerError::UndefinedSymbol { symbol: symbol_name });
            }

            let combined_offset = text_base + text_offsets[i] + rel.offset;
            if rel.reloc_type == RelocationType::BOffset22 {
                if value % 4 != 0 {
                    return Err(LinkerError::MisalignedBranchTarget { symbol: symbol_name, value });
                }
                let instr_i = (combined_offset / 4) as usize;
                let word = exe.text_section[instr_i];
                let opcode = decode_opcode(word);
                let cond = decode_b1(word).cond;
                let simm22 = (value as i64 / 4) - instr_i as i64;
                exe.text_section[instr_i] = encode_b1(opcode, cond, simm22 as i32);
                continue;
            }

            exe.rel_text.push(Relocation::new(combined_offset, exe_name_idx, rel.reloc_type, rel.shift));
        }
    }

    log::info!("link complete: {} text word(s), {} data byte(s), {} bss byte(s)",
        exe.text_section.len(), exe.data_section.len(), exe.bss_section);
    Ok(exe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj_with_text(words: Vec<u32>) -> ObjectFile {
        let mut obj = ObjectFile::new(FileType::Relocatable, 1, 0);
        obj.text_section = words;
        obj
    }

    #[test]
    fn concatenates_text_sections_in_declaration_order() {
        let a = obj_with_text(vec![1, 2]);
        let b = obj_with_text(vec![3]);
        let exe = link(vec![a, b], None).unwrap();
        assert_eq!(exe.text_section, vec![1, 2, 3]);
        assert_eq!(exe.file_type, FileType::Executable);
    }

    #[test]
    fn local_branch_offset_is_patched_across_object_boundaries() {
        // obj `a` has one filler word, `obj` `b`'s local `target` is at word index 0
        // of its own text but word index 1 of the combined output.
        let a = obj_with_text(vec![0xFFFF_FFFF]);
        let mut b = obj_with_text(vec![isa::encode_b1(1, 0xE, 0), 0]);
        let target_idx = b.intern("target");
        b.symbol_table.insert(
            target_idx,
            Symbol { value: 0, binding: Binding::Global, section_idx: b.section_index(SectionType::Text) as i64 },
        );
        b.rel_text.push(Relocation::new(0, target_idx, RelocationType::BOffset22, 0));

        let exe = link(vec![a, b], None).unwrap();
        let decoded = decode_b1(exe.text_section[1]);
        // target word index (1, the combined "target" position) minus this instruction's
        // own combined word index (1) is a zero-offset branch to itself.
        assert_eq!(decoded.simm22, 0);
    }

    #[test]
    fn relocation_against_weak_symbol_is_an_error() {
        let mut a = obj_with_text(vec![0]);
        let sym_idx = a.intern("missing");
        a.symbol_table.insert(
            sym_idx,
            Symbol { value: 0, binding: Binding::Weak, section_idx: -1 },
        );
        a.rel_text.push(Relocation::new(0, sym_idx, RelocationType::OLo12, 0));
        assert!(matches!(link(vec![a], None), Err(LinkerError::UndefinedSymbol { .. })));
    }

    #[test]
    fn absolute_relocation_is_deferred_to_the_output() {
        let mut a = obj_with_text(vec![0]);
        let sym_idx = a.intern("data_sym");
        a.symbol_table.insert(
            sym_idx,
            Symbol { value: 4, binding: Binding::Global, section_idx: a.section_index(SectionType::Data) as i64 },
        );
        a.rel_text.push(Relocation::new(0, sym_idx, RelocationType::AdrpHi20, 0));
        let exe = link(vec![a], None).unwrap();
        assert_eq!(exe.rel_text.len(), 1);
        assert_eq!(exe.rel_text[0].reloc_type, RelocationType::AdrpHi20);
    }

    #[test]
    fn local_symbols_from_different_inputs_are_mangled_distinctly() {
        let mut a = obj_with_text(vec![0]);
        let a_local = a.intern("loop");
        a.symbol_table.insert(a_local, Symbol { value: 0, binding: Binding::Local, section_idx: a.section_index(SectionType::Text) as i64 });
        let mut b = obj_with_text(vec![0]);
        let b_local = b.intern("loop");
        b.symbol_table.insert(b_local, Symbol { value: 0, binding: Binding::Local, section_idx: b.section_index(SectionType::Text) as i64 });

        let exe = link(vec![a, b], None).unwrap();
        assert!(exe.string_table.contains_key("loop:LOCAL:0"));
        assert!(exe.string_table.contains_key("loop:LOCAL:1"));
    }
}
