//! Immutable cell values
//!
//! A cell is the atomic unit of the ledger's data format: an ordered bit
//! sequence (at most 1023 bits) plus an ordered list of child cells (at
//! most 4). Cells are plain values: once finalized by the builder they are
//! never mutated, so any number of readers may hold the same cell.

use crate::Cursor;

/// Maximum number of data bits in one cell
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of child references in one cell
pub const MAX_CELL_REFS: usize = 4;

/// Immutable binary tree node: bits plus child references
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl Cell {
    /// Construct directly from raw parts.
    ///
    /// Callers must uphold the capacity invariants; the builder and the
    /// container parser are the only constructors in this workspace.
    pub(crate) fn from_parts(data: Vec<u8>, bit_len: usize, refs: Vec<Cell>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(refs.len() <= MAX_CELL_REFS);
        debug_assert!(data.len() == (bit_len + 7) / 8);
        Cell { data, bit_len, refs }
    }

    /// An empty cell: zero bits, zero references
    pub fn empty() -> Self {
        Cell {
            data: Vec::new(),
            bit_len: 0,
            refs: Vec::new(),
        }
    }

    /// Number of data bits
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Raw data bytes; the final byte is zero-padded past `bit_len`
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Child references, in storage order
    #[inline]
    pub fn refs(&self) -> &[Cell] {
        &self.refs
    }

    /// Read the bit at `index` (0-based, most significant first)
    ///
    /// Panics if `index >= bit_len()`; bounds are the reader's concern and
    /// `Cursor` is the checked interface.
    pub(crate) fn bit(&self, index: usize) -> bool {
        let byte = self.data[index / 8];
        (byte >> (7 - index % 8)) & 1 == 1
    }

    /// Open a sequential reader over this cell
    pub fn begin_parse(&self) -> Cursor<'_> {
        Cursor::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellBuilder;

    #[test]
    fn test_empty_cell() {
        let cell = Cell::empty();
        assert_eq!(cell.bit_len(), 0);
        assert!(cell.refs().is_empty());
    }

    #[test]
    fn test_value_equality() {
        let mut a = CellBuilder::new();
        a.store_uint(0xAB, 8).unwrap();
        let mut b = CellBuilder::new();
        b.store_uint(0xAB, 8).unwrap();
        assert_eq!(a.end_cell().unwrap(), b.end_cell().unwrap());
    }

    #[test]
    fn test_shared_reads_do_not_interfere() {
        let mut b = CellBuilder::new();
        b.store_uint(0x1234, 16).unwrap();
        let cell = b.end_cell().unwrap();

        let mut first = cell.begin_parse();
        let mut second = cell.begin_parse();
        assert_eq!(first.load_uint(16).unwrap(), 0x1234);
        assert_eq!(second.load_uint(8).unwrap(), 0x12);
    }
}
