//! Routes CPU-facing addresses through the MMU to registered [`Memory`] regions
//! (spec.md §4.7). Remembers the last region it routed to and falls back to a linear
//! scan by page range on a miss; half/word accesses that straddle a page boundary are
//! split into per-byte MMU-routed accesses.

use crate::error::VmError;
use crate::memory::Memory;
use crate::virtual_memory::{PageIn, VirtualMemory};
use crate::PAGE_SHIFT;

/// The bus a CPU issues loads/stores against: registered memory regions plus the MMU
/// that translates every address before it reaches them.
pub struct SystemBus {
    regions: Vec<Box<dyn Memory>>,
    last_routed: Option<usize>,
    mmu: VirtualMemory,
}

fn same_page(a: u32, b: u32) -> bool {
    (a >> PAGE_SHIFT) == (b >> PAGE_SHIFT)
}

impl SystemBus {
    #[must_use]
    pub fn new(mmu: VirtualMemory) -> Self {
        Self { regions: Vec::new(), last_routed: None, mmu }
    }

    pub fn register(&mut self, region: Box<dyn Memory>) {
        self.regions.push(region);
    }

    pub fn mmu_mut(&mut self) -> &mut VirtualMemory {
        &mut self.mmu
    }

    fn route(&mut self, address: u32) -> Result<usize, VmError> {
        if let Some(i) = self.last_routed {
            if self.regions[i].in_bounds(address) {
                return Ok(i);
            }
        }
        for (i, region) in self.regions.iter().enumerate() {
            if region.in_bounds(address) {
                self.last_routed = Some(i);
                return Ok(i);
            }
        }
        Err(VmError::UnroutedAddress { address })
    }

    fn route_page(&mut self, ppage: u32) -> Result<usize, VmError> {
        self.route(ppage << PAGE_SHIFT)
    }

    /// Commits the effects of an MMU fault: writes the evicted victim's live bytes to
    /// disk (if any), then installs the freshly-fetched page's bytes into RAM.
    fn handle_page_in(&mut self, page_in: PageIn) -> Result<(), VmError> {
        if let Some(eviction) = page_in.eviction {
            let victim_idx = self.route_page(eviction.victim_ppage)?;
            let victim_bytes = self.regions[victim_idx].read_page_bytes(eviction.victim_ppage)?;
            self.mmu.disk_mut().write_page(eviction.victim_disk_page, &victim_bytes)?;
        }
        let dest_idx = self.route_page(page_in.ppage)?;
        self.regions[dest_idx].write_page_bytes(page_in.ppage, &page_in.bytes)
    }

    fn translate(&mut self, address: u32) -> Result<u32, VmError> {
        let (phys, page_in) = self.mmu.map_address(address)?;
        if let Some(page_in) = page_in {
            self.handle_page_in(page_in)?;
        }
        Ok(phys)
    }

    pub fn read_byte(&mut self, address: u32) -> Result<u8, VmError> {
        let phys = self.translate(address)?;
        let idx = self.route(phys)?;
        self.regions[idx].read_byte(phys)
    }

    pub fn write_byte(&mut self, address: u32, value: u8) -> Result<(), VmError> {
        let phys = self.translate(address)?;
        let idx = self.route(phys)?;
        self.regions[idx].write_byte(phys, value)
    }

    pub fn read_hword(&mut self, address: u32) -> Result<u16, VmError> {
        if same_page(address, address + 1) {
            let phys = self.translate(address)?;
            let idx = self.route(phys)?;
            self.regions[idx].read_hword(phys)
        } else {
            let lo = self.read_byte(address)?;
            let hi = self.read_byte(address + 1)?;
            Ok(u16::from_le_bytes([lo, hi]))
        }
    }

    pub fn write_hword(&mut self, address: u32, value: u16) -> Result<(), VmError> {
        if same_page(address, address + 1) {
            let phys = self.translate(address)?;
            let idx = self.route(phys)?;
            self.regions[idx].write_hword(phys, value)
        } else {
            for (i, b) in value.to_le_bytes().into_iter().enumerate() {
                self.write_byte(address + i as u32, b)?;
            }
            Ok(())
        }
    }

    pub fn read_word(&mut self, address: u32) -> Result<u32, VmError> {
        if same_page(address, address + 3) {
            let phys = self.translate(address)?;
            let idx = self.route(phys)?;
            self.regions[idx].read_word_aligned(phys)
        } else {
            let mut bytes = [0u8; 4];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = self.read_byte(address + i as u32)?;
            }
            Ok(u32::from_le_bytes(bytes))
        }
    }

    pub fn write_word(&mut self, address: u32, value: u32) -> Result<(), VmError> {
        if same_page(address, address + 3) {
            let phys = self.translate(address)?;
            let idx = self.route(phys)?;
            self.regions[idx].write_word(phys, value)
        } else {
            for (i, b) in value.to_le_bytes().into_iter().enumerate() {
                self.write_byte(address + i as u32, b)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::Disk;
    use crate::memory::Ram;

    fn bus(name: &str) -> SystemBus {
        let path = std::env::temp_dir().join(format!("vm_bus_test_{name}_{}.img", std::process::id()));
        let disk = Disk::open(path, 8).unwrap();
        let mmu = VirtualMemory::new(0, 7, disk);
        SystemBus::new(mmu)
    }

    #[test]
    fn reads_and_writes_with_no_active_process() {
        let mut b = bus("identity");
        b.register(Box::new(Ram::new(4, 0)));
        b.write_word(0x10, 0xDEAD_BEEF).unwrap();
        assert_eq!(b.read_word(0x10).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn unrouted_address_is_an_error() {
        let mut b = bus("unrouted");
        b.register(Box::new(Ram::new(1, 0)));
        assert!(matches!(b.read_byte(0x10000), Err(VmError::UnroutedAddress { .. })));
    }

    #[test]
    fn halfword_straddling_two_regions_is_split_per_byte() {
        let mut b = bus("straddle");
        b.register(Box::new(Ram::new(1, 0)));
        b.register(Box::new(Ram::new(1, 1)));
        let last_byte_of_first_page = crate::PAGE_SIZE - 1;
        b.write_hword(last_byte_of_first_page, 0xBEEF).unwrap();
        assert_eq!(b.read_hword(last_byte_of_first_page).unwrap(), 0xBEEF);
    }

    #[test]
    fn routing_cache_is_invalidated_across_regions() {
        let mut b = bus("cache");
        b.register(Box::new(Ram::new(1, 0)));
        b.register(Box::new(Ram::new(1, 1)));
        b.write_byte(0x10, 1).unwrap();
        b.write_byte(crate::PAGE_SIZE + 0x10, 2).unwrap();
        assert_eq!(b.read_byte(0x10).unwrap(), 1);
        assert_eq!(b.read_byte(crate::PAGE_SIZE + 0x10).unwrap(), 2);
    }
}
