//! EMBER Core - Fundamental types for the ledger client
//!
//! This crate defines the types shared across the EMBER workspace:
//! - Error taxonomy (`EmberError`) and result alias
//! - Operation codes pinned to the target program

pub mod error;
pub mod op;

pub use error::*;
pub use op::*;
