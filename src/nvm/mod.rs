//! Non-volatile register store
//!
//! A fixed-size byte array that survives soft resets. [`Counter`]s claim a
//! whole byte and [`Flag`]s claim a single bit; both are plain descriptors
//! that operate on an explicitly passed [`NvmStore`]. Descriptors can only be
//! obtained from an [`NvmRegistry`], which rejects overlapping claims, so no
//! two state items can alias the same bits.
//!
//! Access is single-threaded and synchronous: the store is owned by the
//! [`Satellite`](crate::satellite::Satellite) and mutated only from the
//! control loop.

pub mod counter;
pub mod flag;
pub mod layout;

pub use counter::Counter;
pub use flag::Flag;
pub use layout::{NvmRegistry, SatelliteRegisters};

use crate::error::NvmError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, error, warn};

/// Backing medium of the store.
pub trait NvmMedium {
    fn len(&self) -> usize;
    fn read(&self, index: usize) -> u8;
    fn write(&mut self, index: usize, value: u8);
}

/// RAM-backed medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNvm {
    bytes: Vec<u8>,
}

impl MemoryNvm {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl NvmMedium for MemoryNvm {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or_default()
    }

    fn write(&mut self, index: usize, value: u8) {
        if let Some(byte) = self.bytes.get_mut(index) {
            *byte = value;
        }
    }
}

/// File-backed medium; every write goes straight through to the file.
#[derive(Debug)]
pub struct FileNvm {
    file: File,
    bytes: Vec<u8>,
}

impl FileNvm {
    /// Open a store file of exactly `size` bytes, creating it zeroed if it is
    /// missing or empty.
    ///
    /// # Errors
    ///
    /// Returns `NvmError::Unavailable` if the file cannot be opened, sized or
    /// read, or if an existing file holds a different number of bytes.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self, NvmError> {
        let path = path.as_ref();
        let unavailable = |e: std::io::Error| NvmError::Unavailable(e.to_string());

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(unavailable)?;

        let existing = file.metadata().map_err(unavailable)?.len();
        if existing == 0 {
            file.set_len(size as u64).map_err(unavailable)?;
        } else if existing != size as u64 {
            warn!(path = %path.display(), existing, size, "nvm file size mismatch");
            return Err(NvmError::Unavailable(format!(
                "{} holds {existing} bytes, expected {size}",
                path.display()
            )));
        }

        let mut bytes = vec![0; size];
        file.seek(SeekFrom::Start(0)).map_err(unavailable)?;
        file.read_exact(&mut bytes).map_err(unavailable)?;

        debug!(path = %path.display(), size, "opened file nvm");
        Ok(Self { file, bytes })
    }

    fn write_through(&mut self, index: usize, value: u8) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(index as u64))?;
        self.file.write_all(&[value])?;
        self.file.sync_data()
    }
}

impl NvmMedium for FileNvm {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or_default()
    }

    fn write(&mut self, index: usize, value: u8) {
        let Some(byte) = self.bytes.get_mut(index) else {
            return;
        };
        *byte = value;
        if let Err(e) = self.write_through(index, value) {
            error!(index, error = %e, "nvm write-through failed");
        }
    }
}

/// Owner of the persistent byte array.
pub struct NvmStore {
    medium: Box<dyn NvmMedium>,
}

impl core::fmt::Debug for NvmStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NvmStore")
            .field("len", &self.medium.len())
            .finish()
    }
}

impl NvmStore {
    /// # Errors
    ///
    /// Returns `NvmError::Unavailable` when the medium has no storage.
    pub fn new(medium: Box<dyn NvmMedium>) -> Result<Self, NvmError> {
        if medium.len() == 0 {
            return Err(NvmError::Unavailable(
                "medium has zero capacity".to_string(),
            ));
        }
        Ok(Self { medium })
    }

    /// Convenience constructor over a zeroed RAM medium.
    ///
    /// # Errors
    ///
    /// Returns `NvmError::Unavailable` when `size` is zero.
    pub fn in_memory(size: usize) -> Result<Self, NvmError> {
        Self::new(Box::new(MemoryNvm::new(size)))
    }

    pub fn len(&self) -> usize {
        self.medium.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medium.len() == 0
    }

    /// Raw byte, for diagnostics and tests.
    pub fn byte(&self, index: usize) -> u8 {
        self.medium.read(index)
    }

    pub(crate) fn read(&self, index: usize) -> u8 {
        self.medium.read(index)
    }

    pub(crate) fn write(&mut self, index: usize, value: u8) {
        self.medium.write(index, value);
    }
}
