//! The emulator core (spec.md §4.8): a dispatch-table interpreter over the 64-opcode
//! instruction set, driving a [`vm::SystemBus`].
//!
//! Per spec.md §9's design note, dispatch is a tagged `match` on [`isa::Opcode`] rather
//! than a literal array of function pointers — the 64-slot table is conceptual, not a
//! literal data structure, since correctness of the mapping is the constraint here, not
//! indirect-call performance.

mod error;
mod registers;
mod syscall;

pub use error::CpuError;
pub use registers::{Registers, FP, LR, REGISTER_COUNT, SP, XZR};

use isa::{
    decode_b1, decode_b2, decode_m, decode_m1, decode_o, decode_o1, decode_o2, decode_o3,
    decode_opcode, decode_s, AddrMode, Condition, OperandM, OperandO, OperandO1, OperandO3,
    Opcode, PState,
};
use vm::SystemBus;

/// Register holding the syscall number at a `swi` (spec.md §4.8).
pub const NR: u8 = 8;

/// The processor: register file, flags, and program counter. Owns neither the bus nor
/// its memory — `step`/`run` borrow a [`SystemBus`] for the duration of the call.
#[derive(Debug, Clone)]
pub struct Cpu {
    regs: Registers,
    pstate: PState,
    pc: u32,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    #[must_use]
    pub fn new() -> Self {
        Self { regs: Registers::new(), pstate: PState::new(), pc: 0 }
    }

    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    #[must_use]
    pub fn reg(&self, index: u8) -> u32 {
        self.regs.read(index)
    }

    pub fn set_reg(&mut self, index: u8, value: u32) {
        self.regs.write(index, value);
    }

    #[must_use]
    pub fn pstate(&self) -> PState {
        self.pstate
    }

    fn condition_holds(&self, cond: u8) -> bool {
        Condition::from_bits(cond).matches(self.pstate.n(), self.pstate.z(), self.pstate.c(), self.pstate.v())
    }

    fn resolve_o(&self, operand: OperandO) -> u32 {
        match operand {
            OperandO::Imm14(imm) => u32::from(imm),
            OperandO::Reg { xm, shift_kind, shift_amt } => shift(self.regs.read(xm), shift_kind, shift_amt),
        }
    }

    fn resolve_o1(&self, operand: OperandO1) -> u32 {
        match operand {
            OperandO1::Imm14(imm) => u32::from(imm),
            OperandO1::Reg(xm) => self.regs.read(xm),
        }
    }

    fn resolve_o3(&self, operand: OperandO3) -> u32 {
        match operand {
            OperandO3::Imm19(imm) => imm,
            OperandO3::Reg(xm) => self.regs.read(xm),
        }
    }

    fn resolve_m_address(&self, xn: u8, operand: OperandM, mode: AddrMode) -> (u32, Option<(u8, u32)>) {
        let base = self.regs.read(xn);
        let delta = match operand {
            OperandM::Imm12(imm) => u32::from(imm),
            OperandM::Reg(xm) => self.regs.read(xm),
        };
        match mode {
            AddrMode::Offset => (base.wrapping_add(delta), None),
            AddrMode::PreIndex => {
                let addr = base.wrapping_add(delta);
                (addr, Some((xn, addr)))
            }
            AddrMode::PostIndex => (base, Some((xn, base.wrapping_add(delta)))),
        }
    }

    /// Executes one instruction: fetch at `pc` via the bus's aligned-word fast path,
    /// dispatch, advance `pc` by 4. `pc` is left unadvanced if this call errors — except
    /// for `hlt`, which (per the documented end-to-end scenario) advances `pc` like any
    /// other instruction before its termination is reported.
    pub fn step(&mut self, bus: &mut SystemBus) -> Result<(), CpuError> {
        let word = bus.read_word(self.pc)?;
        let opcode = Opcode::from_bits(decode_opcode(word)).unwrap_or(Opcode::Hlt);
        let halted = self.execute(opcode, word, bus)?;
        self.pc = self.pc.wrapping_add(4);
        if halted {
            return Err(CpuError::HaltInstr { pc: self.pc });
        }
        Ok(())
    }

    /// Runs up to `n` instructions (or forever if `n == 0`). Returns the exception that
    /// ended the run — `hlt` included — or `None` if the instruction budget was spent
    /// with no exception raised.
    pub fn run(&mut self, bus: &mut SystemBus, n: u64) -> Option<CpuError> {
        let mut count = 0u64;
        while n == 0 || count < n {
            if let Err(e) = self.step(bus) {
                return Some(e);
            }
            count += 1;
        }
        None
    }

    /// Executes one decoded instruction, returning whether it was `hlt`.
    fn execute(&mut self, opcode: Opcode, word: u32, bus: &mut SystemBus) -> Result<bool, CpuError> {
        use Opcode::*;
        match opcode {
            Hlt => return Ok(true),
            Nop => {}

            Add | Sub | Rsb | Adc | Sbc | Rsc | Mul | And | Orr | Eor | Bic | Cmp | Cmn | Tst | Teq => {
                let d = decode_o(word);
                let rn = self.regs.read(d.xn);
                let rhs = self.resolve_o(d.operand);
                self.alu(opcode, d.xd, rn, rhs, d.s);
            }

            Lsl | Lsr | Asr | Ror => {
                let d = decode_o1(word);
                let rn = self.regs.read(d.xn);
                let amt = self.resolve_o1(d.operand);
                let kind = match opcode {
                    Lsl => 0,
                    Lsr => 1,
                    Asr => 2,
                    _ => 3,
                };
                self.regs.write(d.xd, shift(rn, kind, (amt & 0x1F) as u8));
            }

            Umull | Smull => {
                let d = decode_o2(word);
                let xn = u64::from(self.regs.read(d.xn));
                let xm = u64::from(self.regs.read(d.xm));
                let product = if matches!(opcode, Smull) {
                    ((xn as i32 as i64) * (xm as i32 as i64)) as u64
                } else {
                    xn * xm
                };
                self.regs.write(d.xdlo, product as u32);
                self.regs.write(d.xdhi, (product >> 32) as u32);
            }

            Mov | Mvn => {
                let d = decode_o3(word);
                let rhs = self.resolve_o3(d.operand);
                let result = if matches!(opcode, Mvn) { !rhs } else { rhs };
                self.regs.write(d.xd, result);
                if d.s {
                    self.pstate.set_nzcv(result, self.pstate.c(), self.pstate.v());
                }
            }

            Ldr | Str | Swp | Ldrb | Strb | Swpb | Ldrh | Strh | Swph => {
                let d = decode_m(word);
                let (addr, writeback) = self.resolve_m_address(d.xn, d.operand, d.mode);
                match opcode {
                    Ldr => {
                        let v = bus.read_word(addr)?;
                        self.regs.write(d.xt, v);
                    }
                    Str => bus.write_word(addr, self.regs.read(d.xt))?,
                    Ldrh => {
                        let v = bus.read_hword(addr)?;
                        self.regs.write(d.xt, u32::from(v));
                    }
                    Strh => bus.write_hword(addr, self.regs.read(d.xt) as u16)?,
                    Ldrb => {
                        let v = bus.read_byte(addr)?;
                        self.regs.write(d.xt, u32::from(v));
                    }
                    Strb => bus.write_byte(addr, self.regs.read(d.xt) as u8)?,
                    Swp => {
                        let old = bus.read_word(addr)?;
                        bus.write_word(addr, self.regs.read(d.xt))?;
                        self.regs.write(d.xt, old);
                    }
                    Swph => {
                        let old = bus.read_hword(addr)?;
                        bus.write_hword(addr, self.regs.read(d.xt) as u16)?;
                        self.regs.write(d.xt, u32::from(old));
                    }
                    Swpb => {
                        let old = bus.read_byte(addr)?;
                        bus.write_byte(addr, self.regs.read(d.xt) as u8)?;
                        self.regs.write(d.xt, u32::from(old));
                    }
                    _ => unreachable!(),
                }
                if let Some((xn, new_base)) = writeback {
                    self.regs.write(xn, new_base);
                }
            }

            Adrp => {
                let d = decode_m1(word);
                let page_base = self.pc & !0xFFF;
                let target = page_base.wrapping_add(d.imm20 << 12);
                self.regs.write(d.xd, target);
                if d.s {
                    self.pstate.set_nzcv(target, self.pstate.c(), self.pstate.v());
                }
            }

            B | Bl => {
                let d = decode_b1(word);
                if self.condition_holds(d.cond) {
                    let target = (self.pc as i64 + i64::from(d.simm22) * 4) as u32;
                    if matches!(opcode, Bl) {
                        self.regs.write(LR, self.pc.wrapping_add(4));
                    }
                    self.pc = target.wrapping_sub(4);
                }
            }

            Bx | Blx => {
                let d = decode_b2(word);
                if self.condition_holds(d.cond) {
                    let target = self.regs.read(d.xd);
                    if matches!(opcode, Blx) {
                        self.regs.write(LR, self.pc.wrapping_add(4));
                    }
                    self.pc = target.wrapping_sub(4);
                }
            }

            Swi => {
                let cond = ((decode_s(word) >> 22) & 0xF) as u8;
                if self.condition_holds(cond) {
                    self.dispatch_syscall(bus)?;
                }
            }

            // Floating point is a declared stub (spec.md §4.8): decode and discard.
            Vabs | Vneg | Vsqrt | Vadd | Vsub | Vdiv | Vmul | Vcmp | Vsel | Vmov => {
                let _ = decode_o(word);
            }
        }
        Ok(false)
    }

    fn alu(&mut self, opcode: Opcode, xd: u8, rn: u32, rhs: u32, s: bool) {
        use Opcode::*;
        let carry_in = self.pstate.c();
        let (result, carry, overflow) = match opcode {
            Add | Cmn => add_with_carry(rn, rhs, false),
            Adc => add_with_carry(rn, rhs, carry_in),
            Sub | Cmp => add_with_carry(rn, !rhs, true),
            Sbc => add_with_carry(rn, !rhs, carry_in),
            Rsb => add_with_carry(rhs, !rn, true),
            Rsc => add_with_carry(rhs, !rn, carry_in),
            Mul => (rn.wrapping_mul(rhs), carry_in, self.pstate.v()),
            And | Tst => (rn & rhs, carry_in, self.pstate.v()),
            Orr => (rn | rhs, carry_in, self.pstate.v()),
            Eor | Teq => (rn ^ rhs, carry_in, self.pstate.v()),
            Bic => (rn & !rhs, carry_in, self.pstate.v()),
            _ => unreachable!("alu() called with a non-ALU opcode"),
        };

        if !matches!(opcode, Cmp | Cmn | Tst | Teq) {
            self.regs.write(xd, result);
        }
        if s || matches!(opcode, Cmp | Cmn | Tst | Teq) {
            self.pstate.set_nzcv(result, carry, overflow);
        }
    }
}

fn add_with_carry(a: u32, b: u32, carry_in: bool) -> (u32, bool, bool) {
    let (r1, c1) = a.overflowing_add(b);
    let (result, c2) = r1.overflowing_add(u32::from(carry_in));
    let carry = c1 || c2;
    let overflow = (((a ^ result) & (b ^ result)) >> 31) & 1 == 1;
    (result, carry, overflow)
}

fn shift(value: u32, kind: u8, amt: u8) -> u32 {
    let amt = amt & 0x1F;
    match kind & 0b11 {
        0 => value << amt,
        1 => value >> amt,
        2 => ((value as i32) >> amt) as u32,
        _ => value.rotate_right(u32::from(amt)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isa::{encode_b1, encode_m, encode_o, encode_o3, encode_s};
    use vm::{Disk, Ram, VirtualMemory};

    fn bus(name: &str) -> SystemBus {
        let path = std::env::temp_dir().join(format!("cpu_test_{name}_{}.img", std::process::id()));
        let disk = Disk::open(path, 4).unwrap();
        let mmu = VirtualMemory::new(0, 3, disk);
        let mut b = SystemBus::new(mmu);
        b.register(Box::new(Ram::new(4, 0)));
        b
    }

    fn load_program(bus: &mut SystemBus, words: &[u32]) {
        for (i, w) in words.iter().enumerate() {
            bus.write_word(i as u32 * 4, *w).unwrap();
        }
    }

    #[test]
    fn mov_then_halt_matches_the_documented_end_to_end_scenario() {
        let mut bus = bus("mov_halt");
        load_program(&mut bus, &[encode_o3(Opcode::Mov as u8, false, 0, isa::OperandO3::Imm19(10)), Opcode::Hlt as u32]);
        let mut cpu = Cpu::new();
        let err = cpu.run(&mut bus, 0);
        assert!(matches!(err, Some(CpuError::HaltInstr { pc: 8 })));
        assert_eq!(cpu.reg(0), 10);
    }

    #[test]
    fn xzr_writes_are_discarded() {
        let mut bus = bus("xzr");
        load_program(&mut bus, &[encode_o3(Opcode::Mov as u8, false, XZR, isa::OperandO3::Imm19(99)), Opcode::Hlt as u32]);
        let mut cpu = Cpu::new();
        let _ = cpu.run(&mut bus, 0);
        assert_eq!(cpu.reg(XZR), 0);
    }

    #[test]
    fn add_sets_zero_flag() {
        let mut bus = bus("add_zero");
        load_program(
            &mut bus,
            &[encode_o(Opcode::Add as u8, true, 0, XZR, isa::OperandO::Imm14(0)), Opcode::Hlt as u32],
        );
        let mut cpu = Cpu::new();
        let _ = cpu.run(&mut bus, 0);
        assert!(cpu.pstate().z());
    }

    #[test]
    fn unconditional_branch_skips_the_next_instruction() {
        let mut bus = bus("bcond");
        // b.al over one instruction, which would otherwise set x0 = 1.
        load_program(
            &mut bus,
            &[
                encode_b1(Opcode::B as u8, Condition::Al as u8, 2),
                encode_o3(Opcode::Mov as u8, false, 0, isa::OperandO3::Imm19(1)),
                Opcode::Hlt as u32,
            ],
        );
        let mut cpu = Cpu::new();
        let _ = cpu.run(&mut bus, 0);
        assert_eq!(cpu.reg(0), 0);
    }

    #[test]
    fn failing_branch_condition_falls_through() {
        let mut bus = bus("bcond_fail");
        // Z is false on a fresh Cpu, so b.eq must not be taken.
        load_program(
            &mut bus,
            &[
                encode_b1(Opcode::B as u8, Condition::Eq as u8, 2),
                encode_o3(Opcode::Mov as u8, false, 0, isa::OperandO3::Imm19(1)),
                Opcode::Hlt as u32,
            ],
        );
        let mut cpu = Cpu::new();
        let _ = cpu.run(&mut bus, 0);
        assert_eq!(cpu.reg(0), 1);
    }

    #[test]
    fn bl_sets_the_link_register_to_the_next_instruction() {
        let mut bus = bus("bl");
        load_program(
            &mut bus,
            &[encode_b1(Opcode::Bl as u8, Condition::Al as u8, 2), Opcode::Nop as u32, Opcode::Hlt as u32],
        );
        let mut cpu = Cpu::new();
        let _ = cpu.run(&mut bus, 0);
        assert_eq!(cpu.reg(LR), 4);
    }

    #[test]
    fn str_then_ldr_round_trips_through_the_bus() {
        let mut bus = bus("str_ldr");
        load_program(
            &mut bus,
            &[
                encode_o3(Opcode::Mov as u8, false, 0, isa::OperandO3::Imm19(0x200)),
                encode_o3(Opcode::Mov as u8, false, 1, isa::OperandO3::Imm19(42)),
                encode_m(Opcode::Str as u8, false, 1, 0, isa::OperandM::Imm12(0), isa::AddrMode::Offset),
                encode_m(Opcode::Ldr as u8, false, 2, 0, isa::OperandM::Imm12(0), isa::AddrMode::Offset),
                Opcode::Hlt as u32,
            ],
        );
        let mut cpu = Cpu::new();
        let _ = cpu.run(&mut bus, 0);
        assert_eq!(cpu.reg(2), 42);
    }

    #[test]
    fn unknown_syscall_number_raises_bad_instr() {
        let mut bus = bus("bad_swi");
        load_program(
            &mut bus,
            &[
                encode_o3(Opcode::Mov as u8, false, NR, isa::OperandO3::Imm19(4242)),
                encode_s(Opcode::Swi as u8, u32::from(Condition::Al as u8) << 22),
            ],
        );
        let mut cpu = Cpu::new();
        let err = cpu.run(&mut bus, 0);
        assert!(matches!(err, Some(CpuError::BadInstr { number: 4242, .. })));
    }
}
