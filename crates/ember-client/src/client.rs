//! Read-only query client
//!
//! Thin typed layer over the transport seam: issues one get-method call,
//! decodes the first stack entry, and hands back a `StackValue`. Aggregate
//! counts shown to users are always re-queried through here, never tallied
//! locally.

use ember_core::{EmberError, EmberResult};

use crate::{decode_entry, LedgerTransport, QueryCall, StackEntry, StackValue};

/// Typed read-only access to one deployed program
pub struct ContractClient<T> {
    transport: T,
    address: String,
}

impl<T: LedgerTransport> ContractClient<T> {
    pub fn new(transport: T, address: impl Into<String>) -> Self {
        ContractClient {
            transport,
            address: address.into(),
        }
    }

    /// Program address queries are issued against
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Run a get method and decode the top of the result stack
    ///
    /// An empty result stack decodes to `Absent`.
    pub async fn run(&self, method: &str, stack: Vec<StackEntry>) -> EmberResult<StackValue> {
        let call = QueryCall {
            address: self.address.clone(),
            method: method.to_owned(),
            stack,
        };
        let response = self.transport.run_get_method(call).await?;
        if !response.ok {
            return Err(EmberError::Transport(
                response.error.unwrap_or_else(|| "query rejected".into()),
            ));
        }
        let stack = response.result.map(|r| r.stack).unwrap_or_default();
        Ok(stack
            .first()
            .map(decode_entry)
            .unwrap_or(StackValue::Absent))
    }

    /// Query a method expected to return an integer
    pub async fn query_int(&self, method: &str, stack: Vec<StackEntry>) -> EmberResult<i128> {
        match self.run(method, stack).await? {
            StackValue::Int(n) => Ok(n),
            other => Err(EmberError::Parse(format!(
                "method '{}' returned {}, not an integer",
                method,
                other.as_text_lossy()
            ))),
        }
    }

    /// Query a method expected to return text
    ///
    /// Never fails past the transport: malformed values come back as an
    /// explanatory placeholder.
    pub async fn query_text(&self, method: &str, stack: Vec<StackEntry>) -> EmberResult<String> {
        Ok(self.run(method, stack).await?.as_text_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueryResponse, QueryResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedTransport {
        response: fn() -> EmberResult<QueryResponse>,
    }

    #[async_trait]
    impl LedgerTransport for CannedTransport {
        async fn run_get_method(&self, _call: QueryCall) -> EmberResult<QueryResponse> {
            (self.response)()
        }
    }

    fn ok_stack(entries: Vec<StackEntry>) -> QueryResponse {
        QueryResponse {
            ok: true,
            result: Some(QueryResult { stack: entries }),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_query_int() {
        let client = ContractClient::new(
            CannedTransport {
                response: || Ok(ok_stack(vec![StackEntry("int".into(), json!("0x2a"))])),
            },
            "EQBHepjX",
        );
        assert_eq!(client.query_int("currentCounter", vec![]).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_query_int_rejects_text() {
        let client = ContractClient::new(
            CannedTransport {
                response: || Ok(ok_stack(vec![StackEntry("string".into(), json!("hi"))])),
            },
            "EQBHepjX",
        );
        let err = client.query_int("currentCounter", vec![]).await.unwrap_err();
        assert!(matches!(err, EmberError::Parse(_)));
    }

    #[tokio::test]
    async fn test_non_ok_response_is_transport_error() {
        let client = ContractClient::new(
            CannedTransport {
                response: || {
                    Ok(QueryResponse {
                        ok: false,
                        result: None,
                        error: Some("rate limited".into()),
                    })
                },
            },
            "EQBHepjX",
        );
        let err = client.run("anything", vec![]).await.unwrap_err();
        assert!(matches!(err, EmberError::Transport(msg) if msg == "rate limited"));
    }

    #[tokio::test]
    async fn test_empty_stack_is_absent() {
        let client = ContractClient::new(
            CannedTransport {
                response: || Ok(ok_stack(vec![])),
            },
            "EQBHepjX",
        );
        assert_eq!(client.run("whatever", vec![]).await.unwrap(), StackValue::Absent);
    }

    #[tokio::test]
    async fn test_query_text_is_lossy() {
        let client = ContractClient::new(
            CannedTransport {
                response: || Ok(ok_stack(vec![StackEntry("null".into(), json!(null))])),
            },
            "EQBHepjX",
        );
        assert_eq!(
            client.query_text("getResult", vec![]).await.unwrap(),
            "no value"
        );
    }
}
