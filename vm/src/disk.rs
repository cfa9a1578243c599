//! Simulated disk (spec.md §4.7): a host file of `npages * 4096` bytes, accessed through
//! a small direct-mapped write-back cache, with page allocation delegated to an
//! [`fbl::FreeBlockList`] over page indices.

use crate::error::VmError;
use crate::PAGE_SIZE;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const CACHE_SIZE: usize = 32;

struct CachePage {
    page: Option<u32>,
    data: Vec<u8>,
    dirty: bool,
}

impl CachePage {
    fn empty() -> Self {
        Self { page: None, data: vec![0; PAGE_SIZE as usize], dirty: false }
    }
}

/// Page-granular storage backed by a host file, with write-back caching.
pub struct Disk {
    path: PathBuf,
    npages: u32,
    cache: Vec<CachePage>,
    free_list: fbl::FreeBlockList,
}

impl Disk {
    /// Opens (creating and zero-padding if needed) a disk file of `npages` pages.
    pub fn open(path: PathBuf, npages: u32) -> Result<Self, VmError> {
        let want_len = npages as u64 * u64::from(PAGE_SIZE);
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
        let len = file.metadata().map_err(|source| VmError::Io { path: path.display().to_string(), source })?.len();
        if len < want_len {
            file.set_len(want_len).map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
        }
        log::debug!("opened disk file {} ({npages} pages)", path.display());
        Ok(Self {
            path,
            npages,
            cache: (0..CACHE_SIZE).map(|_| CachePage::empty()).collect(),
            free_list: fbl::FreeBlockList::new(0, u64::from(npages), true),
        })
    }

    #[must_use]
    pub fn npages(&self) -> u32 {
        self.npages
    }

    /// Allocates and returns a free disk page (contents not guaranteed zeroed).
    pub fn get_free_page(&mut self) -> Result<u32, VmError> {
        Ok(self.free_list.get_free_block(1)? as u32)
    }

    /// Returns a disk page to the free list.
    pub fn return_page(&mut self, page: u32) -> Result<(), VmError> {
        Ok(self.free_list.return_block(u64::from(page), 1)?)
    }

    fn check_page(&self, page: u32) -> Result<(), VmError> {
        if page >= self.npages {
            return Err(VmError::DiskPageOutOfRange { page, npages: self.npages });
        }
        Ok(())
    }

    /// Fetches (reading from the host file on a miss, evicting+flushing a dirty slot
    /// first if needed) the cache slot for `page`.
    fn get_cpage(&mut self, page: u32) -> Result<usize, VmError> {
        self.check_page(page)?;
        let slot = page as usize % CACHE_SIZE;
        if self.cache[slot].page == Some(page) {
            return Ok(slot);
        }
        if self.cache[slot].dirty {
            if let Some(evicted) = self.cache[slot].page {
                write_page_to_file(&self.path, evicted, &self.cache[slot].data)?;
            }
        }
        let mut buf = vec![0u8; PAGE_SIZE as usize];
        read_page_from_file(&self.path, page, &mut buf)?;
        self.cache[slot] = CachePage { page: Some(page), data: buf, dirty: false };
        Ok(slot)
    }

    /// Reads a whole page's bytes.
    pub fn read_page(&mut self, page: u32) -> Result<Vec<u8>, VmError> {
        let slot = self.get_cpage(page)?;
        Ok(self.cache[slot].data.clone())
    }

    /// Writes a whole page's bytes (must be exactly [`crate::PAGE_SIZE`] long).
    pub fn write_page(&mut self, page: u32, data: &[u8]) -> Result<(), VmError> {
        self.check_page(page)?;
        let slot = self.get_cpage(page)?;
        self.cache[slot].data[..data.len().min(PAGE_SIZE as usize)]
            .copy_from_slice(&data[..data.len().min(PAGE_SIZE as usize)]);
        self.cache[slot].dirty = true;
        Ok(())
    }

    pub fn read_byte(&mut self, address: u32) -> Result<u8, VmError> {
        let (page, offset) = split_address(address);
        let slot = self.get_cpage(page)?;
        Ok(self.cache[slot].data[offset])
    }

    pub fn read_hword(&mut self, address: u32) -> Result<u16, VmError> {
        let lo = self.read_byte(address)?;
        let hi = self.read_byte(address + 1)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn read_word(&mut self, address: u32) -> Result<u32, VmError> {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = self.read_byte(address + i as u32)?;
        }
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn write_byte(&mut self, address: u32, value: u8) -> Result<(), VmError> {
        let (page, offset) = split_address(address);
        let slot = self.get_cpage(page)?;
        self.cache[slot].data[offset] = value;
        self.cache[slot].dirty = true;
        Ok(())
    }

    pub fn write_hword(&mut self, address: u32, value: u16) -> Result<(), VmError> {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.write_byte(address + i as u32, *b)?;
        }
        Ok(())
    }

    pub fn write_word(&mut self, address: u32, value: u32) -> Result<(), VmError> {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.write_byte(address + i as u32, *b)?;
        }
        Ok(())
    }

    /// Flushes every dirty cache slot back to the host file.
    pub fn save(&mut self) -> Result<(), VmError> {
        for cpage in &mut self.cache {
            if cpage.dirty {
                if let Some(page) = cpage.page {
                    write_page_to_file(&self.path, page, &cpage.data)?;
                    cpage.dirty = false;
                }
            }
        }
        log::debug!("flushed dirty disk cache pages to {}", self.path.display());
        Ok(())
    }
}

fn split_address(address: u32) -> (u32, usize) {
    (address / PAGE_SIZE, (address % PAGE_SIZE) as usize)
}

fn read_page_from_file(path: &Path, page: u32, buf: &mut [u8]) -> Result<(), VmError> {
    let mut file = std::fs::File::open(path).map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
    file.seek(SeekFrom::Start(u64::from(page) * u64::from(PAGE_SIZE)))
        .map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
    file.read_exact(buf).map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

fn write_page_to_file(path: &Path, page: u32, data: &[u8]) -> Result<(), VmError> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
    file.seek(SeekFrom::Start(u64::from(page) * u64::from(PAGE_SIZE)))
        .map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
    file.write_all(data).map_err(|source| VmError::Io { path: path.display().to_string(), source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_disk(name: &str, npages: u32) -> Disk {
        let path = std::env::temp_dir().join(format!("vm_disk_test_{name}_{}.img", std::process::id()));
        Disk::open(path, npages).unwrap()
    }

    #[test]
    fn write_then_read_byte_round_trips() {
        let mut disk = temp_disk("rw_byte", 4);
        disk.write_byte(10, 0x42).unwrap();
        assert_eq!(disk.read_byte(10).unwrap(), 0x42);
    }

    #[test]
    fn eviction_flushes_dirty_page_before_reuse() {
        let mut disk = temp_disk("evict", CACHE_SIZE as u32 + 1);
        // Pages CACHE_SIZE apart alias to the same direct-mapped cache slot.
        disk.write_byte(0, 0xAA).unwrap();
        disk.write_byte(CACHE_SIZE as u32 * PAGE_SIZE, 0xBB).unwrap();
        disk.save().unwrap();
        assert_eq!(disk.read_byte(0).unwrap(), 0xAA);
        assert_eq!(disk.read_byte(CACHE_SIZE as u32 * PAGE_SIZE).unwrap(), 0xBB);
    }

    #[test]
    fn page_allocation_round_trips_through_free_list() {
        let mut disk = temp_disk("alloc", 2);
        let page = disk.get_free_page().unwrap();
        disk.return_page(page).unwrap();
        assert_eq!(disk.get_free_page().unwrap(), page);
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let mut disk = temp_disk("range", 1);
        assert!(matches!(disk.read_byte(PAGE_SIZE), Err(VmError::DiskPageOutOfRange { .. })));
    }
}
