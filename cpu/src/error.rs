//! Emulator runtime exception taxonomy (spec.md §7). These unwind the `run` loop
//! cleanly; `pc` is left unadvanced past the instruction that raised one.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CpuError {
    #[error("register index {index} is out of range (0..32)")]
    BadReg { index: u32 },

    #[error("unrecognized syscall number {number} at pc {pc:#x}")]
    BadInstr { number: u32, pc: u32 },

    #[error("halted at pc {pc:#x}")]
    HaltInstr { pc: u32 },

    #[error("assertion failed at pc {pc:#x}: {message}")]
    FailedAssert { pc: u32, message: String },

    #[error("no active page table for the current process")]
    BadPageDir,

    #[error("page fault translating address {address:#x}")]
    PageFault { address: u32 },

    #[error(transparent)]
    Bus(#[from] vm::VmError),
}
