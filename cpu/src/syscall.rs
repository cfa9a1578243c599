//! Software-interrupt handlers (spec.md §4.8): `swi`'s emulator-test subset of
//! print/assert services, dispatched on the syscall number in `x8` with arguments in
//! `x0..x5` in declaration order.

use crate::error::CpuError;
use crate::Cpu;
use isa::Syscall;
use std::io::Write;
use vm::SystemBus;

fn read_cstring(bus: &mut SystemBus, mut addr: u32) -> Result<String, CpuError> {
    let mut bytes = Vec::new();
    loop {
        let b = bus.read_byte(addr)?;
        if b == 0 {
            break;
        }
        bytes.push(b);
        addr += 1;
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_sized(bus: &mut SystemBus, addr: u32, size: u8, little_endian: bool) -> Result<u32, CpuError> {
    let mut val: u32 = 0;
    if little_endian {
        for i in (0..size).rev() {
            val = (val << 8) | u32::from(bus.read_byte(addr + u32::from(i))?);
        }
    } else {
        for i in 0..size {
            val = (val << 8) | u32::from(bus.read_byte(addr + u32::from(i))?);
        }
    }
    Ok(val)
}

impl Cpu {
    pub(crate) fn dispatch_syscall(&mut self, bus: &mut SystemBus) -> Result<(), CpuError> {
        let number = self.regs.read(crate::NR);
        let arg0 = self.regs.read(0);
        let arg1 = self.regs.read(1);
        let arg2 = self.regs.read(2);
        let arg3 = self.regs.read(3);
        let arg4 = self.regs.read(4);

        let Some(syscall) = Syscall::from_number(number) else {
            return Err(CpuError::BadInstr { number, pc: self.pc });
        };

        match syscall {
            Syscall::Print => {
                let s = read_cstring(bus, arg0)?;
                print!("{s}");
                let _ = std::io::stdout().flush();
            }
            Syscall::PrintR => {
                let reg = self.reg_index(arg0)?;
                println!("REG: {reg} = {:#x}", self.regs.read(reg));
            }
            Syscall::PrintM => {
                let val = read_sized(bus, arg0, arg1 as u8, arg2 != 0)?;
                println!("MEM: {arg0:#x} = {val:#x}");
            }
            Syscall::PrintP => {
                println!(
                    "PSTATE: N={},Z={},C={},V={}",
                    u8::from(self.pstate.n()),
                    u8::from(self.pstate.z()),
                    u8::from(self.pstate.c()),
                    u8::from(self.pstate.v())
                );
            }
            Syscall::AssertR => {
                let reg = self.reg_index(arg0)?;
                let val = self.regs.read(reg);
                if val < arg1 || val > arg2 {
                    return Err(CpuError::FailedAssert {
                        pc: self.pc,
                        message: format!("expected register {reg} in [{arg1}, {arg2}], got {val}"),
                    });
                }
            }
            Syscall::AssertM => {
                let val = read_sized(bus, arg0, arg1 as u8, arg2 != 0)?;
                if val < arg3 || val > arg4 {
                    return Err(CpuError::FailedAssert {
                        pc: self.pc,
                        message: format!("expected memory at {arg0:#x} in [{arg3}, {arg4}], got {val}"),
                    });
                }
            }
            Syscall::AssertP => {
                let expected = arg1 != 0;
                let actual = self.pstate.get(arg0);
                if actual != expected {
                    return Err(CpuError::FailedAssert {
                        pc: self.pc,
                        message: format!("expected pstate bit {arg0} to be {expected}, got {actual}"),
                    });
                }
            }
        }
        Ok(())
    }

    fn reg_index(&self, raw: u32) -> Result<u8, CpuError> {
        if raw >= crate::registers::REGISTER_COUNT as u32 {
            return Err(CpuError::BadReg { index: raw });
        }
        Ok(raw as u8)
    }
}
