//! Sequential cell reader
//!
//! A cursor consumes one cell's bits and references left-to-right and
//! fails with `Underrun` on over-read. Cursors never cross cell
//! boundaries: following a reference means opening a new cursor over the
//! referenced cell.

use ember_core::{EmberError, EmberResult};

use crate::Cell;

/// Read-only traversal view over one cell (zero-copy)
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(cell: &'a Cell) -> Self {
        Cursor {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Bits not yet consumed
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    /// References not yet consumed
    #[inline]
    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    /// Consume one bit
    pub fn load_bit(&mut self) -> EmberResult<bool> {
        if self.remaining_bits() < 1 {
            return Err(EmberError::Underrun {
                requested: 1,
                remaining: 0,
            });
        }
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Consume the next `bits` bits as a big-endian unsigned integer
    pub fn load_uint(&mut self, bits: u16) -> EmberResult<u64> {
        if bits > 64 {
            return Err(EmberError::Underrun {
                requested: bits as usize,
                remaining: self.remaining_bits(),
            });
        }
        if self.remaining_bits() < bits as usize {
            return Err(EmberError::Underrun {
                requested: bits as usize,
                remaining: self.remaining_bits(),
            });
        }
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | (self.load_bit()? as u64);
        }
        Ok(value)
    }

    /// Consume all remaining bits as UTF-8 text
    ///
    /// The remainder must be byte-aligned; this matches the convention that
    /// text is stored as the trailing byte-aligned content of a cell.
    pub fn load_string_tail(&mut self) -> EmberResult<String> {
        let remaining = self.remaining_bits();
        if remaining % 8 != 0 {
            return Err(EmberError::Encoding(format!(
                "text tail is not byte-aligned: {} bits remain",
                remaining
            )));
        }
        let mut bytes = Vec::with_capacity(remaining / 8);
        for _ in 0..remaining / 8 {
            bytes.push(self.load_uint(8)? as u8);
        }
        String::from_utf8(bytes).map_err(|e| EmberError::Encoding(e.to_string()))
    }

    /// Consume the next child reference
    pub fn next_ref(&mut self) -> EmberResult<&'a Cell> {
        let Some(cell) = self.cell.refs().get(self.ref_pos) else {
            return Err(EmberError::Underrun {
                requested: 1,
                remaining: 0,
            });
        };
        self.ref_pos += 1;
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellBuilder;

    fn text_cell(text: &str) -> Cell {
        let mut b = CellBuilder::new();
        b.store_string_tail(text).unwrap();
        b.end_cell().unwrap()
    }

    #[test]
    fn test_load_uint_underrun() {
        let mut b = CellBuilder::new();
        b.store_uint(0b101, 3).unwrap();
        let cell = b.end_cell().unwrap();
        let mut cur = cell.begin_parse();
        assert_eq!(cur.load_uint(3).unwrap(), 0b101);
        let err = cur.load_uint(1).unwrap_err();
        assert!(matches!(
            err,
            EmberError::Underrun {
                requested: 1,
                remaining: 0
            }
        ));
    }

    #[test]
    fn test_load_string_tail() {
        let cell = text_cell("ouch");
        assert_eq!(cell.begin_parse().load_string_tail().unwrap(), "ouch");
    }

    #[test]
    fn test_load_string_tail_after_prefix() {
        let mut b = CellBuilder::new();
        b.store_uint(0, 32).unwrap();
        b.store_string_tail("hello").unwrap();
        let cell = b.end_cell().unwrap();
        let mut cur = cell.begin_parse();
        cur.load_uint(32).unwrap();
        assert_eq!(cur.load_string_tail().unwrap(), "hello");
    }

    #[test]
    fn test_string_tail_misaligned() {
        let mut b = CellBuilder::new();
        b.store_uint(0b10101, 5).unwrap();
        let cell = b.end_cell().unwrap();
        let err = cell.begin_parse().load_string_tail().unwrap_err();
        assert!(matches!(err, EmberError::Encoding(_)));
    }

    #[test]
    fn test_string_tail_invalid_utf8() {
        let mut b = CellBuilder::new();
        b.store_bytes(&[0xFF, 0xFE]).unwrap();
        let cell = b.end_cell().unwrap();
        let err = cell.begin_parse().load_string_tail().unwrap_err();
        assert!(matches!(err, EmberError::Encoding(_)));
    }

    #[test]
    fn test_next_ref() {
        let mut b = CellBuilder::new();
        b.store_ref(text_cell("a")).unwrap();
        b.store_ref(text_cell("b")).unwrap();
        let cell = b.end_cell().unwrap();

        let mut cur = cell.begin_parse();
        assert_eq!(cur.remaining_refs(), 2);
        assert_eq!(cur.next_ref().unwrap().begin_parse().load_string_tail().unwrap(), "a");
        assert_eq!(cur.next_ref().unwrap().begin_parse().load_string_tail().unwrap(), "b");
        assert!(matches!(cur.next_ref(), Err(EmberError::Underrun { .. })));
    }

    #[test]
    fn test_empty_tail_is_empty_string() {
        let cell = Cell::empty();
        assert_eq!(cell.begin_parse().load_string_tail().unwrap(), "");
    }
}
