//! Addressable data banks backing a simulated Modbus device
//!
//! A [`DataStore`] aggregates the four Modbus memory areas:
//!
//! | Bank | Cell | Access |
//! |------|------|--------|
//! | Discrete Inputs | bit | read-only |
//! | Coils | bit | read-write |
//! | Input Registers | 16-bit word | read-only |
//! | Holding Registers | 16-bit word | read-write |
//!
//! "Read-only" is a wire-protocol property: the device/adapter that owns
//! the store writes input banks freely to reflect its simulated state,
//! while remote clients can only read them.
//!
//! One `DataStore` is shared by every client connection's engine, so each
//! bank guards its cells with a mutex scoped to a single `get`/`set`.
//! That is the whole synchronization contract: a reader never observes a
//! torn `set`, and nothing larger (cross-bank or cross-request) is atomic.

use std::sync::Mutex;

use crate::constants::BANK_FULL_SPAN;
use crate::error::{ModbusError, ModbusResult};

/// A bounded, address-indexed store of fixed-width cells.
///
/// Cells are either `bool` (bit banks) or `u16` (word banks); see the
/// [`BitBank`] and [`WordBank`] aliases. Capacity is fixed at
/// construction and never changes.
#[derive(Debug)]
pub struct DataBank<T> {
    cells: Mutex<Vec<T>>,
    capacity: usize,
}

/// Bank of single-bit cells (coils or discrete inputs)
pub type BitBank = DataBank<bool>;

/// Bank of 16-bit word cells (input or holding registers)
pub type WordBank = DataBank<u16>;

impl<T: Copy + Default> Default for DataBank<T> {
    /// Full 16-bit address span, filled with the cell default
    fn default() -> Self {
        Self::new(BANK_FULL_SPAN)
    }
}

impl<T: Copy + Default> DataBank<T> {
    /// Create a bank of `capacity` cells, filled with the cell default.
    pub fn new(capacity: usize) -> Self {
        Self::filled(T::default(), capacity)
    }

    /// Create a bank of `capacity` cells, all set to `value`.
    pub fn filled(value: T, capacity: usize) -> Self {
        Self {
            cells: Mutex::new(vec![value; capacity]),
            capacity,
        }
    }

    /// Number of addressable cells
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read `count` contiguous cells starting at `addr`.
    ///
    /// Fails with [`ModbusError::AddressRange`] if the range does not lie
    /// entirely within the bank. No side effects.
    pub fn get(&self, addr: u16, count: usize) -> ModbusResult<Vec<T>> {
        let start = addr as usize;
        let end = self.checked_range(start, count)?;
        let cells = self.cells.lock().expect("data bank lock poisoned");
        Ok(cells[start..end].to_vec())
    }

    /// Overwrite `values.len()` contiguous cells starting at `addr`.
    ///
    /// All-or-nothing: on a range violation no cell is mutated.
    pub fn set(&self, addr: u16, values: &[T]) -> ModbusResult<()> {
        let start = addr as usize;
        let end = self.checked_range(start, values.len())?;
        let mut cells = self.cells.lock().expect("data bank lock poisoned");
        cells[start..end].copy_from_slice(values);
        Ok(())
    }

    fn checked_range(&self, start: usize, count: usize) -> ModbusResult<usize> {
        let end = start + count;
        if end > self.capacity {
            return Err(ModbusError::AddressRange {
                start,
                end,
                capacity: self.capacity,
            });
        }
        Ok(end)
    }
}

/// Aggregate of the four Modbus data banks.
///
/// Pure state holder: construction and field access only. The owning
/// device/adapter populates it before serving and mutates the input
/// banks to reflect simulated processes; protocol engines reference it
/// for the whole server lifetime.
#[derive(Debug, Default)]
pub struct DataStore {
    /// Read-only bits (FC02)
    pub discrete_inputs: BitBank,
    /// Read-write bits (FC01, FC05, FC15)
    pub coils: BitBank,
    /// Read-only words (FC04)
    pub input_registers: WordBank,
    /// Read-write words (FC03, FC06, FC16)
    pub holding_registers: WordBank,
}

impl DataStore {
    /// Create a store with all four banks spanning the full 16-bit
    /// address range, zero-filled.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let bank: WordBank = DataBank::new(16);
        bank.set(4, &[0xABCD, 0x1234]).unwrap();
        assert_eq!(bank.get(4, 2).unwrap(), vec![0xABCD, 0x1234]);
        // Neighbours untouched
        assert_eq!(bank.get(3, 1).unwrap(), vec![0]);
        assert_eq!(bank.get(6, 1).unwrap(), vec![0]);
    }

    #[test]
    fn test_range_check_at_upper_bound() {
        let bank: WordBank = DataBank::new(BANK_FULL_SPAN);
        // Last two valid cells
        assert!(bank.get(0xFFFE, 2).is_ok());
        // One past the end
        assert!(matches!(
            bank.get(0xFFFF, 2),
            Err(ModbusError::AddressRange { .. })
        ));
        assert!(matches!(
            bank.set(0xFFFF, &[1, 2]),
            Err(ModbusError::AddressRange { .. })
        ));
    }

    #[test]
    fn test_failed_set_mutates_nothing() {
        let bank: WordBank = DataBank::new(8);
        bank.set(6, &[7, 8]).unwrap();
        assert!(bank.set(7, &[9, 10]).is_err());
        assert_eq!(bank.get(6, 2).unwrap(), vec![7, 8]);
    }

    #[test]
    fn test_zero_count_read() {
        let bank: BitBank = DataBank::new(8);
        assert_eq!(bank.get(8, 0).unwrap(), Vec::<bool>::new());
        assert!(bank.get(9, 0).is_err());
    }

    #[test]
    fn test_filled_bank() {
        let bank = BitBank::filled(true, 4);
        assert_eq!(bank.get(0, 4).unwrap(), vec![true; 4]);
        assert_eq!(bank.capacity(), 4);
    }

    #[test]
    fn test_store_default_span() {
        let store = DataStore::new();
        assert_eq!(store.coils.capacity(), BANK_FULL_SPAN);
        assert_eq!(store.holding_registers.capacity(), BANK_FULL_SPAN);
    }
}
