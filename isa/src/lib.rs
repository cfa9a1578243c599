//! Instruction-set definitions shared by the assembler's encoder and the emulator's
//! decoder, so the two can never silently disagree about a mnemonic's bits.

mod condition;
mod format;
mod opcode;
mod pstate;
mod syscall;

pub use condition::Condition;
pub use format::{
    decode_b1, decode_b2, decode_m, decode_m1, decode_o, decode_o1, decode_o2, decode_o3,
    decode_opcode, decode_s, encode_b1, encode_b2, encode_m, encode_m1, encode_o, encode_o1,
    encode_o2, encode_o3, encode_s, AddrMode, DecodedB1, DecodedB2, DecodedM, DecodedM1, DecodedO,
    DecodedO1, DecodedO2, DecodedO3, Format, OperandM, OperandO, OperandO1, OperandO3,
};
pub use opcode::Opcode;
pub use pstate::{PState, C_BIT, N_BIT, REAL_BIT, USER_BIT, V_BIT, Z_BIT};
pub use syscall::Syscall;
