//! EMBER Cell Codec - Binary cell trees and the canonical container
//!
//! This crate implements the ledger's data-encoding atom:
//! - `Cell`: immutable bit sequence plus up to four child references
//! - `CellBuilder`: append-only bit/reference writer with hard capacity checks
//! - `Cursor`: sequential read-only view over one cell
//! - `boc`: the canonical serialized container, byte-compatible with the
//!   ledger's standard form, exchanged as base64 over transport

pub mod boc;
pub mod builder;
pub mod cell;
pub mod cursor;

pub use boc::*;
pub use builder::*;
pub use cell::*;
pub use cursor::*;
