//! EMBER Client - Talking to a ledger-backed program
//!
//! This crate provides:
//! - Typed decoding of query stack results, including the recursive cell
//!   fallback chain
//! - Operation payload encoding (opcode + correlation id + arguments)
//! - Trait seams for the external transport and signer
//! - A read-only query client and the submit-then-poll orchestrator

pub mod client;
pub mod orchestrator;
pub mod request;
pub mod stack;
pub mod transport;

pub use client::*;
pub use orchestrator::*;
pub use request::*;
pub use stack::*;
pub use transport::*;
