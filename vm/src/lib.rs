//! Software-emulated memory subsystem (spec.md §4.7): page-addressed RAM/ROM regions,
//! a routing system bus, a per-process MMU, and a page-swapping disk.

pub mod disk;
pub mod error;
pub mod memory;
pub mod system_bus;
pub mod virtual_memory;

/// Page size in bytes, used throughout as the unit of address translation.
pub const PAGE_SIZE: u32 = 4096;
/// `log2(PAGE_SIZE)`, used to convert between byte addresses and page numbers.
pub const PAGE_SHIFT: u32 = 12;

pub use disk::Disk;
pub use error::VmError;
pub use memory::{Memory, Ram, Rom};
pub use system_bus::SystemBus;
pub use virtual_memory::{Eviction, PageIn, VirtualMemory};
