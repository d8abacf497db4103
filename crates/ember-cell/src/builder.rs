//! Append-only cell builder
//!
//! Writes bits and child references left-to-right and finalizes into an
//! immutable `Cell`. Overflow is always a reported error, never silent
//! masking: a value that does not fit its declared width is `Range`, and
//! the 1023-bit / 4-ref limits are `Capacity`.

use ember_core::{EmberError, EmberResult};

use crate::{Cell, MAX_CELL_BITS, MAX_CELL_REFS};

/// Append-only writer for one cell
#[derive(Clone, Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        CellBuilder::default()
    }

    /// Number of bits stored so far
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Number of references stored so far
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    /// Append a single bit
    pub fn store_bit(&mut self, bit: bool) -> EmberResult<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(EmberError::Capacity(format!(
                "cell holds at most {} bits",
                MAX_CELL_BITS
            )));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Append `bits` bits of `value`'s big-endian unsigned representation
    ///
    /// Fails with `Range` if `value` does not fit in `bits` bits, and with
    /// `Capacity` if the cell would exceed 1023 bits. `bits` may be 0..=64.
    pub fn store_uint(&mut self, value: u64, bits: u16) -> EmberResult<&mut Self> {
        if bits > 64 {
            return Err(EmberError::Capacity(format!(
                "store_uint width {} exceeds 64 bits",
                bits
            )));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(EmberError::Range { value, bits });
        }
        if self.bit_len + bits as usize > MAX_CELL_BITS {
            return Err(EmberError::Capacity(format!(
                "cell holds at most {} bits",
                MAX_CELL_BITS
            )));
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    /// Append whole bytes
    pub fn store_bytes(&mut self, bytes: &[u8]) -> EmberResult<&mut Self> {
        for &b in bytes {
            self.store_uint(b as u64, 8)?;
        }
        Ok(self)
    }

    /// Append text as its UTF-8 bytes, filling the remainder of the cell
    ///
    /// This is the convention the target program uses for inline strings:
    /// the trailing byte-aligned content of a cell is the text.
    pub fn store_string_tail(&mut self, text: &str) -> EmberResult<&mut Self> {
        self.store_bytes(text.as_bytes())
    }

    /// Append another cell's bits and references inline
    pub fn store_slice(&mut self, cell: &Cell) -> EmberResult<&mut Self> {
        let mut cur = cell.begin_parse();
        while cur.remaining_bits() > 0 {
            self.store_bit(cur.load_bit()?)?;
        }
        while cur.remaining_refs() > 0 {
            self.store_ref(cur.next_ref()?.clone())?;
        }
        Ok(self)
    }

    /// Append a child reference
    pub fn store_ref(&mut self, cell: Cell) -> EmberResult<&mut Self> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(EmberError::Capacity(format!(
                "cell holds at most {} references",
                MAX_CELL_REFS
            )));
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Finalize into an immutable cell snapshot
    pub fn end_cell(self) -> EmberResult<Cell> {
        if self.bit_len > MAX_CELL_BITS {
            return Err(EmberError::Capacity(format!(
                "cell holds at most {} bits",
                MAX_CELL_BITS
            )));
        }
        Ok(Cell::from_parts(self.data, self.bit_len, self.refs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_uint_roundtrip() {
        for (value, bits) in [(0u64, 1u16), (1, 1), (7, 3), (0xFF, 8), (12345, 64)] {
            let mut b = CellBuilder::new();
            b.store_uint(value, bits).unwrap();
            let cell = b.end_cell().unwrap();
            assert_eq!(cell.begin_parse().load_uint(bits).unwrap(), value);
        }
    }

    #[test]
    fn test_store_uint_range_error() {
        let mut b = CellBuilder::new();
        let err = b.store_uint(2, 1).unwrap_err();
        assert!(matches!(err, EmberError::Range { value: 2, bits: 1 }));

        let mut b = CellBuilder::new();
        assert!(b.store_uint(256, 8).is_err());
        assert!(b.store_uint(255, 8).is_ok());
    }

    #[test]
    fn test_bit_capacity() {
        let mut b = CellBuilder::new();
        // 15 * 64 = 960 bits, then 63 more reaches the 1023 limit
        for _ in 0..15 {
            b.store_uint(0, 64).unwrap();
        }
        b.store_uint(0, 63).unwrap();
        let err = b.store_bit(false).unwrap_err();
        assert!(matches!(err, EmberError::Capacity(_)));
    }

    #[test]
    fn test_ref_capacity() {
        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_ref(Cell::empty()).unwrap();
        }
        let err = b.store_ref(Cell::empty()).unwrap_err();
        assert!(matches!(err, EmberError::Capacity(_)));
    }

    #[test]
    fn test_empty_end_cell() {
        let cell = CellBuilder::new().end_cell().unwrap();
        assert_eq!(cell, Cell::empty());
    }

    #[test]
    fn test_store_slice_appends_bits_and_refs() {
        let mut inner = CellBuilder::new();
        inner.store_uint(0x2A, 6).unwrap();
        inner.store_ref(Cell::empty()).unwrap();
        let inner = inner.end_cell().unwrap();

        let mut b = CellBuilder::new();
        b.store_uint(1, 2).unwrap();
        b.store_slice(&inner).unwrap();
        let cell = b.end_cell().unwrap();

        assert_eq!(cell.bit_len(), 8);
        assert_eq!(cell.refs().len(), 1);
        let mut cur = cell.begin_parse();
        assert_eq!(cur.load_uint(2).unwrap(), 1);
        assert_eq!(cur.load_uint(6).unwrap(), 0x2A);
    }

    #[test]
    fn test_unaligned_then_bytes() {
        let mut b = CellBuilder::new();
        b.store_bit(true).unwrap();
        b.store_uint(0xA5, 8).unwrap();
        let cell = b.end_cell().unwrap();
        let mut cur = cell.begin_parse();
        assert!(cur.load_uint(1).unwrap() == 1);
        assert_eq!(cur.load_uint(8).unwrap(), 0xA5);
    }
}
