//! Error types for the EMBER ledger client

use thiserror::Error;

/// Core EMBER errors
///
/// Encoder-side errors (`Range`, `Capacity`) are programmer errors and
/// always fail fast; nothing in the codec silently truncates. Decoder-side
/// failures during typed-value interpretation are absorbed into the
/// `StackValue` union and never surface through this enum.
#[derive(Error, Debug)]
pub enum EmberError {
    // Cell builder errors
    #[error("value {value} does not fit in {bits} bits")]
    Range { value: u64, bits: u16 },

    #[error("cell capacity exceeded: {0}")]
    Capacity(String),

    // Cursor errors
    #[error("read past end of cell: requested {requested}, {remaining} remaining")]
    Underrun { requested: usize, remaining: usize },

    #[error("invalid text encoding: {0}")]
    Encoding(String),

    // Container errors
    #[error("malformed cell container: {0}")]
    ContainerFormat(String),

    // Decoder errors
    #[error("malformed numeric literal: {0}")]
    Parse(String),

    // Boundary errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Result type for EMBER operations
pub type EmberResult<T> = Result<T, EmberError>;
