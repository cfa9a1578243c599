//! A sorted, coalescing free-block allocator over a contiguous `[begin, begin+len)`
//! address space.
//!
//! Used for both disk-page allocation (`vm::Disk`) and physical-page allocation
//! (`vm::VirtualMemory`). Free ranges are kept in a `BTreeMap<addr, len>` rather than the
//! doubly linked node list of the original implementation: address order is exactly the
//! map's iteration order, and merging adjacent ranges on return is a couple of
//! neighbor lookups instead of pointer surgery.

#![warn(clippy::all)]

use std::collections::BTreeMap;
use thiserror::Error;

/// Failure from a `FreeBlockList` operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FblError {
    /// No single free range was large enough to satisfy the request.
    #[error("not enough space to allocate a block of length {length}")]
    NotEnoughSpace {
        /// Requested length.
        length: u64,
    },
    /// The address or range falls outside `[begin, begin+len)`.
    #[error("address {addr:#x} length {length:#x} is outside the list's domain")]
    InvalidAddr {
        /// Offending address.
        addr: u64,
        /// Offending length.
        length: u64,
    },
    /// `return_block` was given a range that overlaps an already-free range.
    #[error("double free of address {addr:#x} length {length:#x}")]
    DoubleFree {
        /// Offending address.
        addr: u64,
        /// Offending length.
        length: u64,
    },
}

/// A sorted, coalescing list of free `[addr, addr+len)` ranges over a fixed domain.
#[derive(Debug, Clone)]
pub struct FreeBlockList {
    begin: u64,
    len: u64,
    /// Maps the start address of each free range to its length. No two entries are
    /// adjacent (`addr + len == next_addr`) after any public operation returns: that
    /// is the coalescing invariant this type maintains.
    free: BTreeMap<u64, u64>,
}

impl FreeBlockList {
    /// Creates a list over `[begin, begin+len)`. If `init` is true the whole domain
    /// starts free; otherwise the list starts fully allocated.
    #[must_use]
    pub fn new(begin: u64, len: u64, init: bool) -> Self {
        let mut free = BTreeMap::new();
        if init && len > 0 {
            free.insert(begin, len);
        }
        Self { begin, len, free }
    }

    /// Start of this list's domain.
    #[must_use]
    pub fn begin(&self) -> u64 {
        self.begin
    }

    /// Length of this list's domain.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Total bytes currently free.
    #[must_use]
    pub fn free_bytes(&self) -> u64 {
        self.free.values().sum()
    }

    /// Number of disjoint free ranges, used by the coalescing property test: this is
    /// minimal whenever no two free ranges are adjacent.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.free.len()
    }

    fn in_domain(&self, addr: u64, length: u64) -> bool {
        length > 0
            && addr >= self.begin
            && addr
                .checked_add(length)
                .is_some_and(|end| end <= self.begin + self.len)
    }

    /// Allocates the first-fit free range of at least `length`, returning its start
    /// address. The matched range is split if it is larger than requested.
    pub fn get_free_block(&mut self, length: u64) -> Result<u64, FblError> {
        if length == 0 {
            return Ok(self.begin);
        }
        let found = self
            .free
            .iter()
            .find(|(_, &blk_len)| blk_len >= length)
            .map(|(&addr, &blk_len)| (addr, blk_len));

        let Some((addr, blk_len)) = found else {
            return Err(FblError::NotEnoughSpace { length });
        };

        self.free.remove(&addr);
        if blk_len > length {
            self.free.insert(addr + length, blk_len - length);
        }
        log::debug!("fbl: allocated [{addr:#x}, {:#x})", addr + length);
        Ok(addr)
    }

    /// Returns a previously allocated `[addr, addr+length)` range to the free list,
    /// coalescing with adjacent free ranges on either side.
    pub fn return_block(&mut self, addr: u64, length: u64) -> Result<(), FblError> {
        if length == 0 {
            return Ok(());
        }
        if !self.in_domain(addr, length) {
            return Err(FblError::InvalidAddr { addr, length });
        }

        // Any free range that overlaps [addr, addr+length) means the caller is
        // returning memory that was never (fully) allocated to it.
        let end = addr + length;
        let overlaps = self
            .free
            .range(..end)
            .next_back()
            .map(|(&a, &l)| a < end && a + l > addr)
            .unwrap_or(false);
        if overlaps {
            return Err(FblError::DoubleFree { addr, length });
        }

        let mut new_addr = addr;
        let mut new_len = length;

        // Merge with the predecessor range, if adjacent.
        if let Some((&prev_addr, &prev_len)) = self.free.range(..addr).next_back() {
            if prev_addr + prev_len == addr {
                self.free.remove(&prev_addr);
                new_addr = prev_addr;
                new_len += prev_len;
            }
        }
        // Merge with the successor range, if adjacent.
        if let Some((&next_addr, &next_len)) = self.free.range(new_addr + new_len..).next() {
            if new_addr + new_len == next_addr {
                self.free.remove(&next_addr);
                new_len += next_len;
            }
        }

        self.free.insert(new_addr, new_len);
        log::debug!("fbl: freed [{addr:#x}, {:#x})", addr + length);
        Ok(())
    }

    /// Resets the list back to a clean, fully free state.
    pub fn reset(&mut self) {
        self.free.clear();
        if self.len > 0 {
            self.free.insert(self.begin, self.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_and_splits() {
        let mut fbl = FreeBlockList::new(0, 100, true);
        let a = fbl.get_free_block(30).unwrap();
        assert_eq!(a, 0);
        let b = fbl.get_free_block(20).unwrap();
        assert_eq!(b, 30);
        assert_eq!(fbl.free_bytes(), 50);
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut fbl = FreeBlockList::new(0, 10, true);
        assert_eq!(fbl.get_free_block(5).unwrap(), 0);
        assert_eq!(
            fbl.get_free_block(6),
            Err(FblError::NotEnoughSpace { length: 6 })
        );
    }

    #[test]
    fn coalesces_after_any_alloc_return_sequence() {
        let mut fbl = FreeBlockList::new(0, 40, true);
        let a = fbl.get_free_block(10).unwrap();
        let b = fbl.get_free_block(10).unwrap();
        let c = fbl.get_free_block(10).unwrap();
        // One big free block remains (40..40 is empty, so 3 nodes: used regions are
        // gone, free is just the tail [30,40)).
        assert_eq!(fbl.node_count(), 1);

        fbl.return_block(a, 10).unwrap();
        fbl.return_block(c, 10).unwrap();
        // a and the tail are not adjacent to each other (b sits between a and the
        // region already merged with the tail), so two nodes are expected here.
        assert_eq!(fbl.node_count(), 2);

        fbl.return_block(b, 10).unwrap();
        // Returning the middle block merges everything back into a single span.
        assert_eq!(fbl.node_count(), 1);
        assert_eq!(fbl.free_bytes(), 40);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut fbl = FreeBlockList::new(0, 10, true);
        let a = fbl.get_free_block(5).unwrap();
        assert!(fbl.return_block(a, 5).is_ok());
        assert!(matches!(
            fbl.return_block(a, 5),
            Err(FblError::DoubleFree { .. })
        ));
    }

    #[test]
    fn out_of_domain_is_rejected() {
        let mut fbl = FreeBlockList::new(100, 10, false);
        assert!(matches!(
            fbl.return_block(0, 5),
            Err(FblError::InvalidAddr { .. })
        ));
    }
}
