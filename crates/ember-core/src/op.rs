//! Operation codes for the target ledger program
//!
//! Every submittable message body starts with a 32-bit opcode followed by
//! a 64-bit correlation id. The values here must match the receiving
//! program bit-for-bit; a mismatch is a silent protocol failure on the
//! remote side and is not detectable locally.

/// Width of the opcode field in bits
pub const OPCODE_BITS: u16 = 32;

/// Width of the correlation id field in bits
pub const CORRELATION_ID_BITS: u16 = 64;

/// Operation codes understood by the target program
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Increase the program's counter by a 32-bit argument
    Increase = 0x7e8764ef,
    /// Reset the counter
    Reset = 0x3a752f06,
    /// Request a fresh result; observable via a later read-only query
    FetchResult = 0x15f7f5a3,
}

impl Opcode {
    /// Parse from a wire value
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0x7e8764ef => Some(Opcode::Increase),
            0x3a752f06 => Some(Opcode::Reset),
            0x15f7f5a3 => Some(Opcode::FetchResult),
            _ => None,
        }
    }

    /// Convert to the 32-bit wire value
    #[inline]
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}
