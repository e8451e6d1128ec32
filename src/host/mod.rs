pub mod bus;

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Display;

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Access beyond the end of the medium.
    OutOfBounds { offset: u64, len: usize },
    /// Write attempted on a read-only medium.
    ReadOnly,
    /// Host side I/O failure.
    Io,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::OutOfBounds { offset, len } => {
                write!(f, "Access of {} bytes at offset {:#x} is out of bounds", len, offset)
            }
            StoreError::ReadOnly => write!(f, "Medium is read-only"),
            StoreError::Io => write!(f, "I/O error on host side"),
        }
    }
}

pub type StoreResult<T = ()> = Result<T, StoreError>;

/// Backing medium of a card. Offsets are in bytes; the card only issues
/// accesses it has already checked against `size()`.
pub trait BlockStore: Send {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult;
    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult;
    /// Size in bytes.
    fn size(&self) -> u64;
    fn is_writable(&self) -> bool;

    fn is_inserted(&self) -> bool {
        true
    }

    /// Writes `len` copies of `byte` starting at `offset`, in 512-byte chunks.
    fn fill(&mut self, offset: u64, len: u64, byte: u8) -> StoreResult {
        let chunk = [byte; 512];
        let mut done = 0u64;
        while done < len {
            let n = core::cmp::min(len - done, chunk.len() as u64) as usize;
            self.write(offset + done, &chunk[..n])?;
            done += n as u64;
        }
        Ok(())
    }
}

/// In-memory medium.
#[derive(Debug, Clone)]
pub struct MemStore {
    data: Vec<u8>,
    writable: bool,
    inserted: bool,
}

impl MemStore {
    /// Zero-filled medium of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::from_vec(vec![0; size])
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, writable: true, inserted: true }
    }

    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    pub fn set_inserted(&mut self, inserted: bool) {
        self.inserted = inserted;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, offset: u64, len: usize) -> StoreResult<core::ops::Range<usize>> {
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= self.data.len() as u64 => Ok(offset as usize..end as usize),
            _ => Err(StoreError::OutOfBounds { offset, len }),
        }
    }
}

impl BlockStore for MemStore {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult {
        let range = self.range(offset, buf.len())?;
        trace!("MemStore read {} bytes at {:#x}", buf.len(), offset);
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult {
        if !self.writable {
            return Err(StoreError::ReadOnly);
        }
        let range = self.range(offset, buf.len())?;
        trace!("MemStore write {} bytes at {:#x}", buf.len(), offset);
        self.data[range].copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn is_inserted(&self) -> bool {
        self.inserted
    }
}
