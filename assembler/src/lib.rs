//! The two-pass assembler (spec.md §4.3): walks a fully preprocessed token stream,
//! emitting a BELF [`object::ObjectFile`] section-by-section, then resolves whichever
//! branch relocations it can settle locally in a second pass over the recorded token
//! back-references.

#![warn(clippy::all)]

mod directives;
mod error;
mod expr;
mod instr;
mod scope;

pub use error::{AssemblerError, AssemblerWarning};

use instr::AddrArg;
use isa::{
    encode_b1, encode_b2, encode_m, encode_m1, encode_o, encode_o1, encode_o2, encode_o3,
    encode_s, decode_b1, decode_opcode, AddrMode, Format, OperandM, Opcode,
};
use object::{Binding, FileType, ObjectFile, Relocation, RelocationType, SectionType, Symbol};
use tokenizer::{Token, Tokenizer, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurrentSection {
    None,
    Text,
    Data,
    Bss,
}

/// Drives one assembly unit from a preprocessed token stream to a relocatable
/// [`ObjectFile`], warning (not erroring) on clamped immediates per spec.md §7.
pub struct Assembler {
    obj: ObjectFile,
    section: CurrentSection,
    scope_stack: Vec<u64>,
    next_scope_id: u64,
    warnings: Vec<AssemblerWarning>,
}

impl Assembler {
    #[must_use]
    pub fn new(target_machine: u16) -> Self {
        Self {
            obj: ObjectFile::new(FileType::Relocatable, target_machine, 0),
            section: CurrentSection::None,
            scope_stack: Vec::new(),
            next_scope_id: 0,
            warnings: Vec::new(),
        }
    }

    fn current_scope(&self) -> Option<u64> {
        self.scope_stack.last().copied()
    }

    fn current_cursor(&self) -> u64 {
        match self.section {
            CurrentSection::Text => u64::try_from(self.obj.text_section.len() * 4).unwrap_or(u64::MAX),
            CurrentSection::Data => u64::try_from(self.obj.data_section.len()).unwrap_or(u64::MAX),
            CurrentSection::Bss => self.obj.bss_section,
            CurrentSection::None => 0,
        }
    }

    fn warn_overrun(&mut self, line: u32, directive: &'static str) {
        log::warn!("line {line}: {directive} value out of range, clamped");
        self.warnings.push(AssemblerWarning { line, directive });
    }

    /// Pads the current section forward by `delta` bytes (spec.md §4.3 `.org`/`.advance`).
    fn pad_forward(&mut self, delta: u64, line: u32) -> Result<(), AssemblerError> {
        match self.section {
            CurrentSection::Text => {
                if delta % 4 != 0 {
                    return Err(AssemblerError::MisalignedCursor {
                        line,
                        position: i64::try_from(self.current_cursor() + delta).unwrap_or(i64::MAX),
                    });
                }
                for _ in 0..(delta / 4) {
                    self.obj.text_section.push(0);
                }
            }
            CurrentSection::Data => {
                self.obj.data_section.extend(std::iter::repeat(0u8).take(delta as usize));
            }
            CurrentSection::Bss => self.obj.bss_section += delta,
            CurrentSection::None => {}
        }
        Ok(())
    }

    fn handle_org(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        let (target, overran) = expr::evaluate_clamped(tok, 0, i64::MAX)?;
        if overran {
            self.warn_overrun(line, ".org");
        }
        let current = self.current_cursor();
        if target < 0 || (target as u64) < current {
            return Err(AssemblerError::BackwardOrg { line, target, current });
        }
        self.pad_forward((target as u64) - current, line)
    }

    fn handle_advance(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        let (delta, overran) = expr::evaluate_clamped(tok, 0, i64::MAX)?;
        if overran {
            self.warn_overrun(line, ".advance");
        }
        self.pad_forward(delta as u64, line)
    }

    fn handle_align(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        let (boundary, overran) = expr::evaluate_clamped(tok, 1, i64::MAX)?;
        if overran {
            self.warn_overrun(line, ".align");
        }
        let boundary = boundary as u64;
        let current = self.current_cursor();
        let remainder = current % boundary;
        if remainder != 0 {
            self.pad_forward(boundary - remainder, line)?;
        }
        Ok(())
    }

    fn section_idx_for(&self) -> i64 {
        match self.section {
            CurrentSection::Text => self.obj.section_index(SectionType::Text) as i64,
            CurrentSection::Data => self.obj.section_index(SectionType::Data) as i64,
            CurrentSection::Bss => self.obj.section_index(SectionType::Bss) as i64,
            CurrentSection::None => -1,
        }
    }

    /// Defines `name` at the current cursor, scope-mangling it. Merges into an existing
    /// `.global`/`.extern` declaration (keeping its binding) rather than overwriting it.
    fn handle_label(&mut self, name: &str, line: u32) -> Result<(), AssemblerError> {
        if self.section == CurrentSection::None {
            return Err(AssemblerError::LabelOutsideSection { line });
        }
        let mangled = scope::mangle(name, self.current_scope());
        let value = self.current_cursor();
        let section_idx = self.section_idx_for();
        let name_idx = self.obj.intern(&mangled);
        self.obj
            .symbol_table
            .entry(name_idx)
            .and_modify(|s| {
                s.value = value;
                s.section_idx = section_idx;
            })
            .or_insert(Symbol { value, binding: Binding::Local, section_idx });
        Ok(())
    }

    fn handle_global(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        if self.section != CurrentSection::None {
            return Err(AssemblerError::DirectiveInsideSection { directive: ".global", line });
        }
        let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
        let name_idx = self.obj.intern(&name);
        self.obj
            .symbol_table
            .entry(name_idx)
            .and_modify(|s| s.binding = Binding::Global)
            .or_insert(Symbol { value: 0, binding: Binding::Global, section_idx: -1 });
        Ok(())
    }

    fn handle_extern(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        if self.section != CurrentSection::None {
            return Err(AssemblerError::DirectiveInsideSection { directive: ".extern", line });
        }
        let name = tok.consume(&[TokenKind::Symbol])?.value.clone();
        let name_idx = self.obj.intern(&name);
        self.obj
            .symbol_table
            .entry(name_idx)
            .or_insert(Symbol { value: 0, binding: Binding::Weak, section_idx: -1 });
        Ok(())
    }

    fn handle_data_values(
        &mut self,
        tok: &mut Tokenizer,
        width: usize,
        directive: &'static str,
        line: u32,
    ) -> Result<(), AssemblerError> {
        if self.section != CurrentSection::Data {
            return Err(AssemblerError::DirectiveOutsideSection { directive, line });
        }
        loop {
            let (value, overran) = expr::evaluate_clamped(tok, i64::MIN, i64::MAX)?;
            if overran {
                self.warn_overrun(line, directive);
            }
            let bytes = value.to_le_bytes();
            self.obj.data_section.extend_from_slice(&bytes[..width]);
            if tok.is_next(&[TokenKind::Comma]) {
                tok.consume_any()?;
                continue;
            }
            break;
        }
        Ok(())
    }

    fn handle_char(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        if self.section != CurrentSection::Data {
            return Err(AssemblerError::DirectiveOutsideSection { directive: ".char", line });
        }
        let t = tok.consume(&[TokenKind::LiteralChar])?;
        let byte = directives::char_literal_byte(t)?;
        self.obj.data_section.push(byte);
        let _ = line;
        Ok(())
    }

    fn handle_ascii(&mut self, tok: &mut Tokenizer, terminate: bool, line: u32) -> Result<(), AssemblerError> {
        if self.section != CurrentSection::Data {
            return Err(AssemblerError::DirectiveOutsideSection { directive: ".ascii", line });
        }
        let t = tok.consume(&[TokenKind::LiteralString])?;
        let mut bytes = directives::string_literal_bytes(t)?;
        if terminate {
            bytes.push(0);
        }
        self.obj.data_section.extend(bytes);
        Ok(())
    }

    fn push_text_word(&mut self, word: u32) -> usize {
        let idx = self.obj.text_section.len();
        self.obj.text_section.push(word);
        idx
    }

    fn add_rel_text(&mut self, offset: u64, name: &str, reloc_type: RelocationType, shift: u64, token_index: usize) {
        let symbol_idx = self.obj.intern(name);
        let mut rel = Relocation::new(offset, symbol_idx, reloc_type, shift);
        rel.token_index = Some(token_index);
        self.obj.rel_text.push(rel);
    }

    /// Encodes `ldr xt, [sym]` / `str xt, [sym]` as an `adrp`-equivalent word (carrying
    /// an `AdrpHi20` relocation) followed by the actual load/store off `[xt, #0]`
    /// (carrying an `OLo12` relocation), reusing `xt` as the scratch base register for
    /// both (spec.md §4.3's absolute-data relocation pair).
    fn encode_symbol_load_store(&mut self, opcode: Opcode, s: bool, xt: u8, name: &str, token_index: usize) {
        let adrp_offset = u64::try_from(self.obj.text_section.len() * 4).unwrap_or(0);
        let adrp_word = encode_m1(Opcode::Adrp.bits(), false, xt, 0);
        self.push_text_word(adrp_word);
        self.add_rel_text(adrp_offset, name, RelocationType::AdrpHi20, 0, token_index);

        let load_offset = u64::try_from(self.obj.text_section.len() * 4).unwrap_or(0);
        let load_word = encode_m(opcode.bits(), s, xt, xt, OperandM::Imm12(0), AddrMode::Offset);
        self.push_text_word(load_word);
        self.add_rel_text(load_offset, name, RelocationType::OLo12, 0, token_index);
    }

    /// Compares (`cmp`/`cmn`/`tst`/`teq`) always set flags and discard into `xzr`; other
    /// ALU/logical ops default to not setting flags (spec.md §4.3 gives no suffix syntax
    /// for an explicit S-bit).
    fn encode_format_o(&mut self, opcode: Opcode, tok: &mut Tokenizer) -> Result<(), AssemblerError> {
        let is_compare = matches!(opcode, Opcode::Cmp | Opcode::Cmn | Opcode::Tst | Opcode::Teq);
        let xd = if is_compare { 31 } else { instr::parse_register(tok)? };
        if !is_compare {
            tok.consume(&[TokenKind::Comma])?;
        }
        let xn = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let operand = instr::parse_operand_o(tok)?;
        let word = encode_o(opcode.bits(), is_compare, xd, xn, operand);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_format_o1(&mut self, opcode: Opcode, tok: &mut Tokenizer) -> Result<(), AssemblerError> {
        let xd = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let xn = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let operand = instr::parse_operand_o1(tok)?;
        let word = encode_o1(opcode.bits(), xd, xn, operand);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_format_o2(&mut self, opcode: Opcode, tok: &mut Tokenizer) -> Result<(), AssemblerError> {
        let xdlo = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let xdhi = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let xn = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let xm = instr::parse_register(tok)?;
        let word = encode_o2(opcode.bits(), xdlo, xdhi, xn, xm);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_format_o3(&mut self, opcode: Opcode, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        let xd = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let operand = if tok.is_next(&[TokenKind::Hash]) || tok.is_next(&[
            TokenKind::LiteralNumberDecimal,
            TokenKind::LiteralNumberHexadecimal,
            TokenKind::LiteralNumberBinary,
            TokenKind::LiteralNumberOctal,
        ]) {
            let (value, overran) = expr::evaluate_clamped(tok, 0, (1 << 19) - 1)?;
            if overran {
                self.warn_overrun(line, "mov");
            }
            isa::OperandO3::Imm19(value as u32)
        } else {
            isa::OperandO3::Reg(instr::parse_register(tok)?)
        };
        let word = encode_o3(opcode.bits(), false, xd, operand);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_load_store(
        &mut self,
        opcode: Opcode,
        tok: &mut Tokenizer,
        token_index: usize,
    ) -> Result<(), AssemblerError> {
        let xt = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        match instr::parse_addr_arg(tok)? {
            AddrArg::Symbol(name) => {
                self.encode_symbol_load_store(opcode, false, xt, &name, token_index);
            }
            AddrArg::Base { xn, operand, mode } => {
                let word = encode_m(opcode.bits(), false, xt, xn, operand, mode);
                self.push_text_word(word);
            }
        }
        Ok(())
    }

    fn encode_adrp(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        let xd = instr::parse_register(tok)?;
        tok.consume(&[TokenKind::Comma])?;
        let (imm, overran) = expr::evaluate_clamped(tok, 0, (1 << 20) - 1)?;
        if overran {
            self.warn_overrun(line, "adrp");
        }
        let word = encode_m1(Opcode::Adrp.bits(), false, xd, imm as u32);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_branch(
        &mut self,
        opcode: Opcode,
        tok: &mut Tokenizer,
        token_index: usize,
    ) -> Result<(), AssemblerError> {
        let cond = instr::parse_condition_suffix(tok)?;
        let target = tok.consume(&[TokenKind::Symbol])?.value.clone();
        let offset = u64::try_from(self.obj.text_section.len() * 4).unwrap_or(0);
        let word = encode_b1(opcode.bits(), cond.bits(), 0);
        self.push_text_word(word);
        self.add_rel_text(offset, &target, RelocationType::BOffset22, 0, token_index);
        Ok(())
    }

    fn encode_branch_reg(&mut self, opcode: Opcode, tok: &mut Tokenizer) -> Result<(), AssemblerError> {
        let cond = instr::parse_condition_suffix(tok)?;
        let xd = instr::parse_register(tok)?;
        let word = encode_b2(opcode.bits(), cond.bits(), xd);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_ret(&mut self, tok: &mut Tokenizer) -> Result<(), AssemblerError> {
        let cond = instr::parse_condition_suffix(tok)?;
        let word = encode_b2(Opcode::Bx.bits(), cond.bits(), 29);
        self.push_text_word(word);
        Ok(())
    }

    fn encode_swi(&mut self, tok: &mut Tokenizer, line: u32) -> Result<(), AssemblerError> {
        expr::skip_hash(tok);
        let (imm, overran) = expr::evaluate_clamped(tok, 0, (1i64 << 26) - 1)?;
        if overran {
            self.warn_overrun(line, "swi");
        }
        let word = encode_s(Opcode::Swi.bits(), imm as u32);
        self.push_text_word(word);
        Ok(())
    }

    fn handle_instruction(&mut self, tok: &mut Tokenizer, kind: TokenKind, line: u32) -> Result<(), AssemblerError> {
        if self.section != CurrentSection::Text {
            return Err(AssemblerError::InstructionOutsideSection { line });
        }
        let token_index = tok.get_toki();
        if kind == TokenKind::InstructionRet {
            tok.consume_any()?;
            return self.encode_ret(tok);
        }
        let opcode = instr::opcode_for(kind).ok_or(AssemblerError::UnsupportedOperand {
            line,
            mnemonic: "unknown",
        })?;
        tok.consume_any()?;
        match opcode.format() {
            Format::O => self.encode_format_o(opcode, tok),
            Format::O1 => self.encode_format_o1(opcode, tok),
            Format::O2 => self.encode_format_o2(opcode, tok),
            Format::O3 => self.encode_format_o3(opcode, tok, line),
            Format::M => self.encode_load_store(opcode, tok, token_index),
            Format::M1 => self.encode_adrp(tok, line),
            Format::B1 => self.encode_branch(opcode, tok, token_index),
            Format::B2 => self.encode_branch_reg(opcode, tok),
            Format::S => self.encode_swi(tok, line),
        }
    }

    fn run(&mut self, tok: &mut Tokenizer) -> Result<(), AssemblerError> {
        loop {
            if !tok.has_next() {
                break;
            }
            let line = tok.get_token().line;
            let kind = tok.get_token().kind;
            if kind.is_instruction() {
                self.handle_instruction(tok, kind, line)?;
                continue;
            }
            match kind {
                TokenKind::Label => {
                    let name = tok.consume(&[TokenKind::Label])?.value.clone();
                    let name = name.trim_end_matches(':').to_string();
                    self.handle_label(&name, line)?;
                }
                TokenKind::AssemblerText => {
                    tok.consume_any()?;
                    self.section = CurrentSection::Text;
                }
                TokenKind::AssemblerData => {
                    tok.consume_any()?;
                    self.section = CurrentSection::Data;
                }
                TokenKind::AssemblerBss => {
                    tok.consume_any()?;
                    self.section = CurrentSection::Bss;
                }
                TokenKind::AssemblerStop => {
                    tok.consume_any()?;
                    self.section = CurrentSection::None;
                }
                TokenKind::AssemblerOrg => {
                    tok.consume_any()?;
                    self.handle_org(tok, line)?;
                }
                TokenKind::AssemblerAdvance => {
                    tok.consume_any()?;
                    self.handle_advance(tok, line)?;
                }
                TokenKind::AssemblerAlign => {
                    tok.consume_any()?;
                    self.handle_align(tok, line)?;
                }
                TokenKind::AssemblerGlobal => {
                    tok.consume_any()?;
                    self.handle_global(tok, line)?;
                }
                TokenKind::AssemblerExtern => {
                    tok.consume_any()?;
                    self.handle_extern(tok, line)?;
                }
                TokenKind::AssemblerScope => {
                    tok.consume_any()?;
                    self.scope_stack.push(self.next_scope_id);
                    self.next_scope_id += 1;
                }
                TokenKind::AssemblerScend => {
                    tok.consume_any()?;
                    if self.scope_stack.pop().is_none() {
                        return Err(AssemblerError::UnbalancedScope { line });
                    }
                }
                TokenKind::AssemblerByte | TokenKind::AssemblerSbyte => {
                    tok.consume_any()?;
                    self.handle_data_values(tok, 1, ".byte", line)?;
                }
                TokenKind::AssemblerDbyte | TokenKind::AssemblerSdbyte => {
                    tok.consume_any()?;
                    self.handle_data_values(tok, 2, ".dbyte", line)?;
                }
                TokenKind::AssemblerWord | TokenKind::AssemblerSword => {
                    tok.consume_any()?;
                    self.handle_data_values(tok, 4, ".word", line)?;
                }
                TokenKind::AssemblerDword | TokenKind::AssemblerSdword => {
                    tok.consume_any()?;
                    self.handle_data_values(tok, 8, ".dword", line)?;
                }
                TokenKind::AssemblerChar => {
                    tok.consume_any()?;
                    self.handle_char(tok, line)?;
                }
                TokenKind::AssemblerAscii => {
                    tok.consume_any()?;
                    self.handle_ascii(tok, false, line)?;
                }
                TokenKind::AssemblerAsciz => {
                    tok.consume_any()?;
                    self.handle_ascii(tok, true, line)?;
                }
                _ => {
                    tok.consume_any()?;
                }
            }
        }
        Ok(())
    }

    /// Resolves every text-local, non-weak `BOffset22` relocation directly, leaving
    /// everything else for the linker (spec.md §4.3/§4.6).
    fn fill_local(&mut self, all_tokens: &[Token]) -> Result<(), AssemblerError> {
        let text_idx = self.obj.section_index(SectionType::Text) as i64;
        let pending = std::mem::take(&mut self.obj.rel_text);
        let mut kept = Vec::new();

        for rel in pending {
            if rel.reloc_type != RelocationType::BOffset22 {
                kept.push(rel);
                continue;
            }
            let bare_name = self.obj.strings[rel.symbol_idx as usize].clone();
            let candidates = rel.token_index.map_or_else(Vec::new, |ti| {
                scope::scope_chain_at(all_tokens, ti)
                    .into_iter()
                    .map(|scope_id| scope::mangle(&bare_name, Some(scope_id)))
                    .collect()
            });

            let mut resolved = None;
            for name in candidates.iter().chain(std::iter::once(&bare_name)) {
                if let Some(&idx) = self.obj.string_table.get(name) {
                    if let Some(sym) = self.obj.symbol_table.get(&idx) {
                        if sym.section_idx == text_idx && sym.binding != Binding::Weak {
                            resolved = Some(sym.value);
                            break;
                        }
                    }
                }
            }

            match resolved {
                Some(target) => self.patch_branch(&rel, target),
                None => {
                    if !self.obj.string_table.contains_key(&bare_name) {
                        return Err(AssemblerError::UndefinedSymbol {
                            line: 0,
                            name: bare_name,
                        });
                    }
                    kept.push(rel);
                }
            }
        }

        self.obj.rel_text = kept;
        Ok(())
    }

    fn patch_branch(&mut self, rel: &Relocation, target_value: u64) {
        let word_index = (rel.offset / 4) as usize;
        let word = self.obj.text_section[word_index];
        let opcode_bits = decode_opcode(word);
        let decoded = decode_b1(word);
        let simm22 = (target_value as i64 / 4) - (rel.offset as i64 / 4);
        self.obj.text_section[word_index] = encode_b1(opcode_bits, decoded.cond, simm22 as i32);
    }

    #[must_use]
    pub fn warnings(&self) -> &[AssemblerWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn into_object(self) -> ObjectFile {
        self.obj
    }
}

/// Assembles a fully preprocessed token stream into a relocatable [`ObjectFile`].
pub fn assemble(
    tok: &mut Tokenizer,
    target_machine: u16,
) -> Result<(ObjectFile, Vec<AssemblerWarning>), AssemblerError> {
    let mut asm = Assembler::new(target_machine);
    asm.run(tok)?;
    let all_tokens = tok.all_tokens().to_vec();
    asm.fill_local(&all_tokens)?;
    let warnings = asm.warnings().to_vec();
    Ok((asm.into_object(), warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_src(src: &str) -> ObjectFile {
        let mut tok = Tokenizer::new(src, false).unwrap();
        tok.filter_all(&[TokenKind::WhitespaceSpace, TokenKind::WhitespaceTab]);
        let (obj, _warnings) = assemble(&mut tok, 1).unwrap();
        obj
    }

    #[test]
    fn assembles_mov_and_halt() {
        let obj = assemble_src(".text\n_start:\n\tmov x0, #10\n\thlt\n");
        assert_eq!(obj.text_section.len(), 2);
        let name_idx = obj.string_table["_start"];
        assert_eq!(obj.symbol_table[&name_idx].value, 0);
    }

    #[test]
    fn local_branch_resolves_without_a_relocation() {
        let obj = assemble_src(".text\nloop:\n\tnop\n\tb loop\n");
        assert!(obj.rel_text.is_empty());
        let word = obj.text_section[1];
        let decoded = decode_b1(word);
        assert_eq!(decoded.simm22, -1);
    }

    #[test]
    fn forward_global_branch_is_deferred_to_the_linker() {
        let obj = assemble_src(".text\n\tb external_fn\n.stop\n.extern external_fn\n");
        assert_eq!(obj.rel_text.len(), 1);
    }

    #[test]
    fn data_bytes_are_emitted_little_endian() {
        let obj = assemble_src(".data\n\t.word $11223344\n");
        assert_eq!(obj.data_section, vec![0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn scoped_labels_are_mangled_distinctly() {
        let obj = assemble_src(".text\n.scope\nfoo:\n\tnop\n.scend\n.scope\nfoo:\n\tnop\n.scend\n");
        assert_eq!(obj.symbol_table.len(), 2);
    }
}
