//! External collaborator seams
//!
//! The HTTP/RPC plumbing and the wallet signer live outside this crate;
//! both are reached through async traits. The JSON envelope types here
//! mirror the node API wire format exactly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ember_core::EmberResult;

use crate::{StackEntry, TransactionRequest};

/// One read-only query call
#[derive(Clone, Debug, Serialize)]
pub struct QueryCall {
    /// Target program address
    pub address: String,
    /// Read-only method name
    pub method: String,
    /// Ordered argument stack, `[typeTag, value]` pairs
    pub stack: Vec<StackEntry>,
}

/// Envelope returned by the node for a query call
#[derive(Clone, Debug, Deserialize)]
pub struct QueryResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<QueryResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Successful query payload: the program's result stack
#[derive(Clone, Debug, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub stack: Vec<StackEntry>,
}

/// Read-only access to the ledger node
///
/// A non-`ok` response or an I/O failure maps to
/// `EmberError::Transport`; this layer never retries.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn run_get_method(&self, call: QueryCall) -> EmberResult<QueryResponse>;
}

/// External wallet/session signer
///
/// Accepts a built transaction request and returns an opaque submission
/// handle. Signing and fee handling are entirely the signer's concern.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn send_transaction(&self, request: &TransactionRequest) -> EmberResult<String>;
}
