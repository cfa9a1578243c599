//! Memory/MMU/disk error taxonomy (spec.md §4.7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("address {address:#x} could not be routed to any registered memory region")]
    UnroutedAddress { address: u32 },

    #[error("address {address:#x} is out of bounds for this memory region")]
    OutOfBounds { address: u32 },

    #[error(transparent)]
    Disk(#[from] fbl::FblError),

    #[error("disk page {page} is out of range (disk has {npages} pages)")]
    DiskPageOutOfRange { page: u32, npages: u32 },

    #[error("io error accessing disk file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
