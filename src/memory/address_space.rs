//! Flat address space
//!
//! A fixed number of cells, each unset or holding one [`Word`]. Addresses
//! arrive from bytecode as signed words, so every access goes through
//! [`AddressSpace::resolve`] before touching the backing vector.

use super::{Address, Cell, Word};
use crate::interpreter::errors::{VmError, VmResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpace {
    cells: Vec<Cell>,
}

impl AddressSpace {
    /// Create an address space with every cell unset
    pub fn new(capacity: usize) -> Self {
        AddressSpace {
            cells: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Convert a word used as an address into an index, checking bounds
    pub fn resolve(&self, address: i64) -> VmResult<Address> {
        if address < 0 || address as u64 >= self.cells.len() as u64 {
            return Err(VmError::InvalidAddress { address });
        }
        Ok(address as Address)
    }

    /// Read a set cell
    pub fn read(&self, address: Address) -> VmResult<Word> {
        match self.cells.get(address) {
            Some(Some(value)) => Ok(*value),
            Some(None) => Err(VmError::UninitializedRead { address }),
            None => Err(VmError::InvalidAddress {
                address: address as i64,
            }),
        }
    }

    /// Write a cell and return what it held before
    pub fn write(&mut self, address: Address, value: Word) -> VmResult<Cell> {
        let slot = self
            .cells
            .get_mut(address)
            .ok_or(VmError::InvalidAddress {
                address: address as i64,
            })?;
        Ok(slot.replace(value))
    }

    /// Raw cell access; out-of-range addresses read as unset
    pub fn cell(&self, address: Address) -> Cell {
        self.cells.get(address).copied().flatten()
    }

    /// All set cells in ascending address order
    pub fn occupied(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(address, cell)| cell.map(|value| (address, value)))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}
