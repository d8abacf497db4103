//! Fuzz the canonical container parser: arbitrary bytes must either parse
//! into in-bounds cells that re-serialize and re-parse identically, or
//! fail with a typed error. No panics either way.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ember_cell::{boc, MAX_CELL_BITS, MAX_CELL_REFS};

fuzz_target!(|data: &[u8]| {
    let Ok(roots) = boc::parse(data) else {
        return;
    };
    for root in &roots {
        assert!(root.bit_len() <= MAX_CELL_BITS);
        assert!(root.refs().len() <= MAX_CELL_REFS);
        let reparsed = boc::parse_root(&boc::serialize(root)).unwrap();
        assert_eq!(&reparsed, root);
    }
});
