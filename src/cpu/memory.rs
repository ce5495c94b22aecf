//! MiniMIPS memory subsystem.
//!
//! Memory is a flat array of 256 integer cells, zero-initialized and
//! addressed by plain index. One cell holds one value regardless of its
//! nominal width: string data stores one character code per cell, word
//! data and `sw` store whole integers. There is no sub-word addressing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 256;

/// Flat memory: 256 integer cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read the cell at a signed address.
    ///
    /// Addresses are signed so that an underflowed address like `-1`
    /// is representable and rejected rather than wrapped.
    pub fn load(&self, addr: i64) -> Result<i64, MemoryError> {
        let index = self.addr_to_index(addr)?;
        Ok(self.cells[index])
    }

    /// Write the cell at a signed address.
    pub fn store(&mut self, addr: i64, value: i64) -> Result<(), MemoryError> {
        let index = self.addr_to_index(addr)?;
        self.cells[index] = value;
        Ok(())
    }

    fn addr_to_index(&self, addr: i64) -> Result<usize, MemoryError> {
        if addr < 0 || addr >= MEMORY_SIZE as i64 {
            return Err(MemoryError::AddressOutOfRange(addr));
        }
        Ok(addr as usize)
    }

    /// Clear all cells to zero.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = 0;
        }
    }

    /// Install a data-segment image starting at cell 0.
    ///
    /// The loader guarantees the image fits; a too-large image is a load
    /// error long before it reaches this point.
    pub fn install_data(&mut self, data: &[i64]) -> Result<(), MemoryError> {
        if data.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                size: data.len(),
                available: MEMORY_SIZE,
            });
        }
        self.cells[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// The full cell array, for read-only snapshots.
    pub fn cells(&self) -> &[i64] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|c| **c != 0).count();
        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MemoryError {
    /// Address is outside `[0, 256)`.
    #[error("memory address {0} out of range (0-{})", MEMORY_SIZE - 1)]
    AddressOutOfRange(i64),

    /// A data image does not fit in memory.
    #[error("data image of {size} cells exceeds available space {available}")]
    ImageTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_load_store() {
        let mut mem = Memory::new();
        mem.store(10, 42).unwrap();
        assert_eq!(mem.load(10).unwrap(), 42);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();

        assert!(mem.load(0).is_ok());
        assert!(mem.load(255).is_ok());

        assert_eq!(mem.load(-1), Err(MemoryError::AddressOutOfRange(-1)));
        assert_eq!(mem.load(256), Err(MemoryError::AddressOutOfRange(256)));
        assert_eq!(mem.store(256, 1), Err(MemoryError::AddressOutOfRange(256)));
    }

    #[test]
    fn test_failed_store_leaves_memory_unmodified() {
        let mut mem = Memory::new();
        mem.store(0, 7).unwrap();
        assert!(mem.store(-1, 99).is_err());
        assert!(mem.store(256, 99).is_err());
        assert_eq!(mem.load(0).unwrap(), 7);
        assert!(mem.cells().iter().skip(1).all(|c| *c == 0));
    }

    #[test]
    fn test_install_data() {
        let mut mem = Memory::new();
        mem.install_data(&[104, 105, 0]).unwrap();
        assert_eq!(mem.load(0).unwrap(), 104);
        assert_eq!(mem.load(1).unwrap(), 105);
        assert_eq!(mem.load(2).unwrap(), 0);
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new();
        mem.store(5, 1).unwrap();
        mem.clear();
        assert!(mem.cells().iter().all(|c| *c == 0));
    }
}
