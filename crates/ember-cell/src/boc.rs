//! Canonical cell container encoding
//!
//! The standard serialized form of a cell tree, exchanged as base64 over
//! transport. Layout (all multi-byte integers big-endian):
//! - Bytes 0-3: Magic `0xB5EE9C72`
//! - Byte 4: has_index (1 bit) + has_checksum (1 bit) + has_cache_bits (1 bit)
//!   + flags (2 bits) + ref-size in bytes (3 bits)
//! - Byte 5: offset size in bytes
//! - Cell count, root count, absent count (ref-size bytes each)
//! - Total cell-data size (offset-size bytes)
//! - Root indices (ref-size bytes each)
//! - Optional index table, then per-cell records: two descriptor bytes,
//!   bit data with a completion tag when not byte-aligned, and forward
//!   reference indices
//! - Optional trailing checksum
//!
//! This codec must stay byte-compatible with the ledger's canonical form;
//! any deviation breaks interoperability with the remote program. The
//! serializer emits neither index nor checksum (both optional); the parser
//! accepts and skips them.

use bytes::{BufMut, BytesMut};
use ember_core::{EmberError, EmberResult};

use crate::{Cell, MAX_CELL_REFS};

/// Container magic prefix
pub const CONTAINER_MAGIC: u32 = 0xB5EE_9C72;

/// Serialize one root cell to the canonical container bytes
pub fn serialize(root: &Cell) -> Vec<u8> {
    // Pre-order walk guarantees every reference points forward.
    let mut cells: Vec<&Cell> = Vec::new();
    collect(root, &mut cells);

    let ref_size = byte_width(cells.len() as u64);
    let data_size: u64 = cells
        .iter()
        .map(|c| record_size(c, ref_size) as u64)
        .sum();
    let off_size = byte_width(data_size);

    let mut buf = BytesMut::new();
    buf.put_u32(CONTAINER_MAGIC);
    buf.put_u8(ref_size as u8);
    buf.put_u8(off_size as u8);
    put_be(&mut buf, cells.len() as u64, ref_size);
    put_be(&mut buf, 1, ref_size); // roots
    put_be(&mut buf, 0, ref_size); // absent
    put_be(&mut buf, data_size, off_size);
    put_be(&mut buf, 0, ref_size); // root index

    let mut index_of = std::collections::HashMap::new();
    for (i, c) in cells.iter().enumerate() {
        index_of.insert(*c as *const Cell, i);
    }
    for cell in &cells {
        let bit_len = cell.bit_len();
        let data_bytes = (bit_len + 7) / 8;
        let d1 = cell.refs().len() as u8;
        let d2 = (bit_len / 8 + data_bytes) as u8;
        buf.put_u8(d1);
        buf.put_u8(d2);
        let mut data = cell.data().to_vec();
        if bit_len % 8 != 0 {
            // Completion tag: one set bit after the data, zeros to the end
            data[data_bytes - 1] |= 0x80 >> (bit_len % 8);
        }
        buf.put_slice(&data);
        for child in cell.refs() {
            put_be(&mut buf, index_of[&(child as *const Cell)] as u64, ref_size);
        }
    }

    buf.to_vec()
}

/// Serialize one root cell and base64-encode the container
pub fn to_base64(root: &Cell) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(serialize(root))
}

/// Parse a canonical container, returning its root cells in order
pub fn parse(buf: &[u8]) -> EmberResult<Vec<Cell>> {
    let mut r = Reader::new(buf);

    if r.read_be(4)? as u32 != CONTAINER_MAGIC {
        return Err(EmberError::ContainerFormat("bad magic".into()));
    }
    let b = r.read_be(1)? as u8;
    let has_index = b & 0x80 != 0;
    let has_checksum = b & 0x40 != 0;
    let ref_size = (b & 0x07) as usize;
    if ref_size == 0 || ref_size > 4 {
        return Err(EmberError::ContainerFormat(format!(
            "invalid reference size {}",
            ref_size
        )));
    }
    let off_size = r.read_be(1)? as usize;
    if off_size == 0 || off_size > 8 {
        return Err(EmberError::ContainerFormat(format!(
            "invalid offset size {}",
            off_size
        )));
    }

    let cell_count = r.read_be(ref_size)? as usize;
    let root_count = r.read_be(ref_size)? as usize;
    let absent = r.read_be(ref_size)?;
    let _data_size = r.read_be(off_size)?;
    if root_count == 0 {
        return Err(EmberError::ContainerFormat("no root cells".into()));
    }
    if absent != 0 {
        return Err(EmberError::ContainerFormat("absent cells unsupported".into()));
    }
    // The counts are attacker-controlled: bound them by what the input
    // could possibly hold before allocating anything. Every cell record
    // is at least its two descriptor bytes.
    if cell_count > buf.len() / 2 {
        return Err(EmberError::ContainerFormat(format!(
            "declared cell count {} exceeds input size",
            cell_count
        )));
    }
    if root_count > cell_count {
        return Err(EmberError::ContainerFormat(format!(
            "declared root count {} exceeds cell count {}",
            root_count, cell_count
        )));
    }

    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        let idx = r.read_be(ref_size)? as usize;
        if idx >= cell_count {
            return Err(EmberError::ContainerFormat(format!(
                "root index {} out of range",
                idx
            )));
        }
        roots.push(idx);
    }
    if has_index {
        r.skip(cell_count * off_size)?;
    }

    // First pass: raw records, references kept as indices
    let mut raw: Vec<(Vec<u8>, usize, Vec<usize>)> = Vec::with_capacity(cell_count);
    for i in 0..cell_count {
        let d1 = r.read_be(1)? as u8;
        let d2 = r.read_be(1)? as u8;
        if d1 & 0x08 != 0 {
            return Err(EmberError::ContainerFormat("exotic cells unsupported".into()));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_CELL_REFS {
            return Err(EmberError::ContainerFormat(format!(
                "cell {} has {} references",
                i, ref_count
            )));
        }
        let data_bytes = (d2 as usize + 1) / 2;
        let mut data = r.take(data_bytes)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            data_bytes * 8
        } else {
            // Completion tag: the lowest set bit of the final byte marks
            // the end of the data bits
            let last = *data.last().ok_or_else(|| {
                EmberError::ContainerFormat("partial byte in empty cell".into())
            })?;
            if last == 0 {
                return Err(EmberError::ContainerFormat(
                    "missing completion tag".into(),
                ));
            }
            let tag_pos = last.trailing_zeros() as u32;
            let bit_len = data_bytes * 8 - tag_pos as usize - 1;
            let idx = data.len() - 1;
            // Clear the tag and anything below it so the stored bytes are
            // zero-padded past bit_len
            data[idx] &= 0xFFu8.checked_shl(tag_pos + 1).unwrap_or(0);
            data.truncate((bit_len + 7) / 8);
            bit_len
        };
        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let target = r.read_be(ref_size)? as usize;
            if target <= i || target >= cell_count {
                return Err(EmberError::ContainerFormat(format!(
                    "cell {} references {} out of order",
                    i, target
                )));
            }
            refs.push(target);
        }
        raw.push((data, bit_len, refs));
    }
    if has_checksum {
        r.skip(4)?;
    }

    // Second pass: build bottom-up so every reference already exists
    let mut built: Vec<Option<Cell>> = vec![None; cell_count];
    for i in (0..cell_count).rev() {
        let (data, bit_len, ref_indices) = raw[i].clone();
        let refs = ref_indices
            .iter()
            .map(|&j| built[j].clone().expect("forward reference already built"))
            .collect();
        built[i] = Some(Cell::from_parts(data, bit_len, refs));
    }

    Ok(roots
        .into_iter()
        .map(|idx| built[idx].clone().expect("root already built"))
        .collect())
}

/// Parse a container and return its first root cell
pub fn parse_root(buf: &[u8]) -> EmberResult<Cell> {
    let mut roots = parse(buf)?;
    Ok(roots.remove(0))
}

/// Decode base64 and parse, returning the first root cell
pub fn from_base64(encoded: &str) -> EmberResult<Cell> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| EmberError::ContainerFormat(e.to_string()))?;
    parse_root(&bytes)
}

fn collect<'a>(cell: &'a Cell, out: &mut Vec<&'a Cell>) {
    out.push(cell);
    for child in cell.refs() {
        collect(child, out);
    }
}

/// Bytes of one cell record: descriptors + data + reference indices
fn record_size(cell: &Cell, ref_size: usize) -> usize {
    2 + (cell.bit_len() + 7) / 8 + cell.refs().len() * ref_size
}

/// Minimal byte width holding `value`
fn byte_width(value: u64) -> usize {
    let mut width = 1;
    while value >> (width * 8) != 0 {
        width += 1;
    }
    width
}

fn put_be(buf: &mut BytesMut, value: u64, width: usize) {
    for i in (0..width).rev() {
        buf.put_u8((value >> (i * 8)) as u8);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> EmberResult<&'a [u8]> {
        if self.pos + len > self.buf.len() {
            return Err(EmberError::ContainerFormat(format!(
                "truncated container: need {} bytes at offset {}",
                len, self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> EmberResult<()> {
        self.take(len).map(|_| ())
    }

    fn read_be(&mut self, width: usize) -> EmberResult<u64> {
        let bytes = self.take(width)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}
