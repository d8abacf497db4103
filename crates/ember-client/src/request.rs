//! Operation payload encoding
//!
//! A submittable operation body is a single cell: opcode (32 bits), then
//! correlation id (64 bits), then any operation-specific fields, finalized
//! and serialized to the canonical container as base64. The field widths
//! are fixed by protocol convention and must match the receiving program
//! bit-for-bit; a mismatch is a silent failure on the remote side.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use ember_cell::{boc, Cell, CellBuilder};
use ember_core::{EmberResult, Opcode, CORRELATION_ID_BITS, OPCODE_BITS};

/// One submittable operation
///
/// The correlation id tags this request for matching its asynchronous
/// confirmation. Uniqueness is the caller's responsibility: there is no
/// persistent request table, and concurrent in-flight operations with
/// colliding ids are indistinguishable.
#[derive(Clone, Debug)]
pub struct OperationRequest {
    pub opcode: Opcode,
    pub correlation_id: u64,
    /// Operation-specific fields, appended inline after the fixed header
    pub arguments: Option<Cell>,
}

impl OperationRequest {
    pub fn new(opcode: Opcode) -> Self {
        OperationRequest {
            opcode,
            correlation_id: 0,
            arguments: None,
        }
    }

    pub fn with_correlation_id(mut self, id: u64) -> Self {
        self.correlation_id = id;
        self
    }

    pub fn with_arguments(mut self, args: Cell) -> Self {
        self.arguments = Some(args);
        self
    }

    /// Increase the counter by `amount`
    pub fn increase(amount: u32, correlation_id: u64) -> EmberResult<Self> {
        let mut args = CellBuilder::new();
        args.store_uint(amount as u64, 32)?;
        Ok(OperationRequest::new(Opcode::Increase)
            .with_correlation_id(correlation_id)
            .with_arguments(args.end_cell()?))
    }

    /// Reset the counter
    pub fn reset(correlation_id: u64) -> Self {
        OperationRequest::new(Opcode::Reset).with_correlation_id(correlation_id)
    }

    /// Request a fresh result; observable via a later read-only query
    pub fn fetch_result(correlation_id: u64) -> Self {
        OperationRequest::new(Opcode::FetchResult).with_correlation_id(correlation_id)
    }

    /// Build the finalized message body cell
    pub fn body(&self) -> EmberResult<Cell> {
        let mut b = CellBuilder::new();
        b.store_uint(self.opcode.to_u32() as u64, OPCODE_BITS)?
            .store_uint(self.correlation_id, CORRELATION_ID_BITS)?;
        if let Some(args) = &self.arguments {
            b.store_slice(args)?;
        }
        b.end_cell()
    }

    /// Serialize the body to its base64 transport form
    pub fn encode(&self) -> EmberResult<String> {
        Ok(boc::to_base64(&self.body()?))
    }

    /// Wrap the encoded body in a signer-ready transaction
    pub fn into_transaction(
        self,
        address: &str,
        amount: &str,
        ttl_seconds: u64,
    ) -> EmberResult<TransactionRequest> {
        let payload = self.encode()?;
        Ok(TransactionRequest {
            valid_until: unix_now() + ttl_seconds,
            messages: vec![TransactionMessage {
                address: address.to_owned(),
                amount: amount.to_owned(),
                payload,
            }],
        })
    }
}

/// Build an operation payload with no extra fields
pub fn build_operation(opcode: Opcode, correlation_id: u64) -> EmberResult<String> {
    OperationRequest::new(opcode)
        .with_correlation_id(correlation_id)
        .encode()
}

/// Build an operation payload, delegating extra fields to `args`
pub fn build_operation_with<F>(
    opcode: Opcode,
    correlation_id: u64,
    args: F,
) -> EmberResult<String>
where
    F: FnOnce(&mut CellBuilder) -> EmberResult<()>,
{
    let mut b = CellBuilder::new();
    b.store_uint(opcode.to_u32() as u64, OPCODE_BITS)?
        .store_uint(correlation_id, CORRELATION_ID_BITS)?;
    args(&mut b)?;
    Ok(boc::to_base64(&b.end_cell()?))
}

/// Request handed to the external signer
#[derive(Clone, Debug, Serialize)]
pub struct TransactionRequest {
    /// Unix-seconds deadline for the signer
    #[serde(rename = "validUntil")]
    pub valid_until: u64,
    pub messages: Vec<TransactionMessage>,
}

/// One outgoing message within a transaction
#[derive(Clone, Debug, Serialize)]
pub struct TransactionMessage {
    /// Target program address
    pub address: String,
    /// Attached value in minor units, as a decimal string
    pub amount: String,
    /// Base64 canonical container holding the message body
    pub payload: String,
}

/// Initial persistent state of the target program: four 32-bit fields
#[derive(Clone, Copy, Debug)]
pub struct ContractState {
    pub id: u32,
    pub counter: u32,
    pub result_count: u32,
    pub random_seed: u32,
}

impl ContractState {
    /// Encode as the program's data cell layout
    pub fn to_cell(&self) -> EmberResult<Cell> {
        let mut b = CellBuilder::new();
        b.store_uint(self.id as u64, 32)?
            .store_uint(self.counter as u64, 32)?
            .store_uint(self.result_count as u64, 32)?
            .store_uint(self.random_seed as u64, 32)?;
        b.end_cell()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
