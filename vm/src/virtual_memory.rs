//! The MMU (spec.md §4.7): per-process page tables backed by a global physical free
//! list and LRU, with pages swapped to/from a [`crate::Disk`] on demand.

use crate::disk::Disk;
use crate::error::VmError;
use crate::PAGE_SHIFT;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Pte {
    ppage: u32,
    on_disk: bool,
    disk_page: u32,
}

/// Describes a physical page eviction `map_address` had to perform to satisfy a fault:
/// the caller (the system bus, which alone can see RAM's contents) must copy the
/// victim's live bytes into `victim_disk_page` before anything overwrites them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub victim_ppage: u32,
    pub victim_disk_page: u32,
}

/// A disk-backed page was just faulted in: the caller must install `bytes` into RAM at
/// `ppage` (and, if `eviction` is set, write the victim's current RAM contents to disk
/// first, since the VM itself cannot see RAM).
#[derive(Debug, Clone)]
pub struct PageIn {
    pub ppage: u32,
    pub bytes: Vec<u8>,
    pub eviction: Option<Eviction>,
}

#[derive(Default)]
struct LruNode {
    prev: Option<u32>,
    next: Option<u32>,
}

/// A doubly linked list of resident physical pages with O(1) touch/evict, the aux map
/// keyed by ppage standing in for the original's raw node pointers (spec.md §4.7:
/// "doubly linked + aux map for O(1) remove").
#[derive(Default)]
struct Lru {
    head: Option<u32>,
    tail: Option<u32>,
    nodes: HashMap<u32, LruNode>,
}

impl Lru {
    fn unlink(&mut self, ppage: u32) {
        let (prev, next) = {
            let node = &self.nodes[&ppage];
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes.get_mut(&p).unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes.get_mut(&n).unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    /// Moves `ppage` to the most-recently-used end, inserting it if new.
    fn touch(&mut self, ppage: u32) {
        if self.nodes.contains_key(&ppage) {
            if self.tail == Some(ppage) {
                return;
            }
            self.unlink(ppage);
        }
        let old_tail = self.tail;
        self.nodes.insert(ppage, LruNode { prev: old_tail, next: None });
        if let Some(t) = old_tail {
            self.nodes.get_mut(&t).unwrap().next = Some(ppage);
        } else {
            self.head = Some(ppage);
        }
        self.tail = Some(ppage);
    }

    /// Evicts and returns the least-recently-used page.
    fn pop_front(&mut self) -> Option<u32> {
        let victim = self.head?;
        self.unlink(victim);
        self.nodes.remove(&victim);
        Some(victim)
    }
}

/// Per-process MMU state (spec.md §4.7).
pub struct VirtualMemory {
    disk: Disk,
    process_tables: HashMap<i64, HashMap<u32, Pte>>,
    current_pid: Option<i64>,
    physical_owner: HashMap<u32, (i64, u32)>,
    free_list: fbl::FreeBlockList,
    lru: Lru,
}

impl VirtualMemory {
    #[must_use]
    pub fn new(ram_start_page: u32, ram_end_page: u32, disk: Disk) -> Self {
        Self {
            disk,
            process_tables: HashMap::new(),
            current_pid: None,
            physical_owner: HashMap::new(),
            free_list: fbl::FreeBlockList::new(u64::from(ram_start_page), u64::from(ram_end_page - ram_start_page + 1), true),
            lru: Lru::default(),
        }
    }

    pub fn disk_mut(&mut self) -> &mut Disk {
        &mut self.disk
    }

    /// Switches the active page table. Logs and does nothing if `pid` has no table.
    pub fn set_process(&mut self, pid: i64) {
        if !self.process_tables.contains_key(&pid) {
            log::error!("cannot set memory map of process {pid}, it doesn't exist");
            return;
        }
        self.current_pid = Some(pid);
    }

    /// Creates a page table for `pid` covering `[lo_byte >> 12, hi_byte >> 12]` and
    /// makes it current.
    pub fn begin_process(&mut self, pid: i64, lo_byte: u32, hi_byte: u32) -> Result<(), VmError> {
        if self.process_tables.contains_key(&pid) {
            log::error!("process {pid} already has a memory map");
            return Ok(());
        }
        self.process_tables.insert(pid, HashMap::new());
        self.current_pid = Some(pid);
        for vpage in (lo_byte >> PAGE_SHIFT)..=(hi_byte >> PAGE_SHIFT) {
            self.add_page(pid, vpage)?;
        }
        Ok(())
    }

    /// Returns every resident/paged-out page of `pid` to its free list and drops the
    /// table.
    pub fn end_process(&mut self, pid: i64) -> Result<(), VmError> {
        let Some(table) = self.process_tables.remove(&pid) else {
            log::error!("cannot end process {pid}, it has no memory map");
            return Ok(());
        };
        for (_, pte) in table {
            if pte.on_disk {
                self.disk.return_page(pte.disk_page)?;
            } else {
                self.physical_owner.remove(&pte.ppage);
                self.free_list.return_block(u64::from(pte.ppage), 1)?;
            }
        }
        if self.current_pid == Some(pid) {
            self.current_pid = None;
        }
        Ok(())
    }

    fn add_page(&mut self, pid: i64, vpage: u32) -> Result<(), VmError> {
        let disk_page = self.disk.get_free_page()?;
        let table = self.process_tables.get_mut(&pid).expect("caller holds a valid pid");
        table.insert(vpage, Pte { ppage: 0, on_disk: true, disk_page });
        Ok(())
    }

    /// Translates `address`, allocating/faulting pages as needed (spec.md §4.7). On a
    /// disk fetch the caller must act on the returned [`PageIn`] — installing its bytes
    /// into RAM at `ppage`, and first writing back the evicted victim if one is named —
    /// since the VM has no access to RAM itself.
    pub fn map_address(&mut self, address: u32) -> Result<(u32, Option<PageIn>), VmError> {
        let Some(pid) = self.current_pid else {
            return Ok((address, None));
        };
        let vpage = address >> PAGE_SHIFT;

        if !self.process_tables[&pid].contains_key(&vpage) {
            self.add_page(pid, vpage)?;
        }

        let pte = self.process_tables[&pid][&vpage];
        if !pte.on_disk {
            self.lru.touch(pte.ppage);
            return Ok(((pte.ppage << PAGE_SHIFT) | (address & 0xFFF), None));
        }

        let mut eviction = None;
        if self.free_list.get_free_block(1).is_err() {
            let victim_ppage = self.lru.pop_front().expect("free list exhausted implies a resident page exists");
            let (victim_pid, victim_vpage) = self.physical_owner.remove(&victim_ppage).expect("lru/owner map stay in sync");
            let victim_disk_page = self.disk.get_free_page()?;
            let victim_pte = self
                .process_tables
                .get_mut(&victim_pid)
                .and_then(|t| t.get_mut(&victim_vpage))
                .expect("victim pte still exists in its process table");
            victim_pte.on_disk = true;
            victim_pte.disk_page = victim_disk_page;
            self.free_list.return_block(u64::from(victim_ppage), 1)?;
            eviction = Some(Eviction { victim_ppage, victim_disk_page });
        }

        let ppage = self.free_list.get_free_block(1)? as u32;
        let bytes = self.disk.read_page(pte.disk_page)?;
        self.disk.return_page(pte.disk_page)?;

        let table = self.process_tables.get_mut(&pid).expect("pid was validated above");
        let pte_mut = table.get_mut(&vpage).expect("vpage was validated above");
        pte_mut.ppage = ppage;
        pte_mut.on_disk = false;

        self.physical_owner.insert(ppage, (pid, vpage));
        self.lru.touch(ppage);

        Ok(((ppage << PAGE_SHIFT) | (address & 0xFFF), Some(PageIn { ppage, bytes, eviction })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(ram_pages: u32, disk_pages: u32, name: &str) -> VirtualMemory {
        let path = std::env::temp_dir().join(format!("vm_test_{name}_{}.img", std::process::id()));
        let disk = Disk::open(path, disk_pages).unwrap();
        VirtualMemory::new(0, ram_pages - 1, disk)
    }

    #[test]
    fn identity_maps_with_no_current_process() {
        let mut m = vm(4, 8, "identity");
        let (phys, fault) = m.map_address(0x1234).unwrap();
        assert_eq!(phys, 0x1234);
        assert!(fault.is_none());
    }

    #[test]
    fn begin_process_resolves_its_own_pages() {
        let mut m = vm(4, 8, "resolve");
        m.begin_process(1, 0, 0x1FFF).unwrap();
        let (phys_a, _) = m.map_address(0x0010).unwrap();
        let (phys_b, _) = m.map_address(0x1010).unwrap();
        assert_ne!(phys_a & !0xFFF, phys_b & !0xFFF);
        assert_eq!(phys_a & 0xFFF, 0x10);
    }

    #[test]
    fn eviction_triggers_when_ram_is_exhausted() {
        let mut m = vm(1, 8, "evict");
        m.begin_process(1, 0, 0x1FFF).unwrap();
        let (_, fault_a) = m.map_address(0x0000).unwrap();
        assert!(fault_a.is_none(), "first page fits in the single ram page");
        let (_, fault_b) = m.map_address(0x1000).unwrap();
        assert!(fault_b.is_some(), "second page must evict the first");
    }

    #[test]
    fn end_process_frees_its_pages() {
        let mut m = vm(4, 8, "end");
        m.begin_process(1, 0, 0xFFF).unwrap();
        m.map_address(0x10).unwrap();
        m.end_process(1).unwrap();
        assert!(m.process_tables.is_empty());
    }
}
