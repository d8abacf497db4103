//! Submit-and-poll orchestration
//!
//! A state-mutating operation has no push notification for confirmation:
//! the orchestrator submits the signed transaction, waits a fixed interval
//! as a confirmation heuristic, then re-queries the read-only endpoint.
//! Every cycle terminates in exactly one settlement. Transport failures
//! after submission degrade to a locally selected fallback value instead
//! of surfacing an error; submission failures themselves are always
//! surfaced, since value is at stake.
//!
//! Each call owns its whole cycle and shares no mutable state with
//! concurrent cycles; a caller wanting cancellation simply drops the
//! future.

use std::time::Duration;

use rand::seq::SliceRandom;

use ember_core::EmberResult;

use crate::{
    ContractClient, LedgerTransport, OperationRequest, StackValue, TransactionSigner,
};

/// Progress of one submit-and-poll cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitted,
    AwaitingConfirmation,
    Settled,
}

/// Terminal outcome of a cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The re-query decoded to a usable value
    Success(String),
    /// Locally selected stand-in; the remote result was unavailable
    Fallback(String),
}

impl Settlement {
    /// The user-facing text, whichever way the cycle settled
    pub fn text(&self) -> &str {
        match self {
            Settlement::Success(s) | Settlement::Fallback(s) => s,
        }
    }
}

/// What to do when the re-query fails or decodes to an unusable value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Settle with a random catalog entry; failures are logged, not shown.
    /// This mirrors the observed product behavior but masks real outages.
    LocalCatalog,
    /// Settle with the placeholder rendering of whatever came back, and
    /// propagate transport errors to the caller
    Surface,
}

/// Orchestrator tuning
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Heuristic wait for ledger confirmation before the re-query
    pub confirmation_wait: Duration,
    /// Attached value per submission, minor units as a decimal string
    pub amount: String,
    /// Transaction validity window handed to the signer
    pub ttl_seconds: u64,
    pub fallback: FallbackPolicy,
    /// Local result set: indexed by integer results and drawn from at
    /// random on fallback
    pub catalog: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            confirmation_wait: Duration::from_secs(5),
            amount: "50000000".into(),
            ttl_seconds: 300,
            fallback: FallbackPolicy::LocalCatalog,
            catalog: DEFAULT_CATALOG.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Stand-in results used when the remote program is unreachable
pub const DEFAULT_CATALOG: &[&str] = &[
    "You're the reason we need warning labels.",
    "You bring everyone so much joy... when you leave the room.",
    "You're like a cloud. When you disappear, it's a beautiful day.",
    "You're not stupid; you just have bad luck thinking.",
    "I'd agree with you but then we'd both be wrong.",
    "Don't worry about me. Worry about your eyebrows.",
    "You're... actually not that bad. Just kidding!",
];

/// Drives submit-and-poll cycles against one deployed program
pub struct Orchestrator<T, S> {
    client: ContractClient<T>,
    signer: S,
    config: OrchestratorConfig,
}

impl<T: LedgerTransport, S: TransactionSigner> Orchestrator<T, S> {
    pub fn new(client: ContractClient<T>, signer: S, config: OrchestratorConfig) -> Self {
        Orchestrator {
            client,
            signer,
            config,
        }
    }

    /// Read-only access to the underlying client
    pub fn client(&self) -> &ContractClient<T> {
        &self.client
    }

    /// Run one full cycle: submit, wait, re-query, settle
    ///
    /// `poll_method` is the read-only method whose result becomes
    /// observable once the operation confirms. The only error path is
    /// submission/signing failure (plus transport failure under
    /// `FallbackPolicy::Surface`); everything else settles.
    pub async fn execute(
        &self,
        request: OperationRequest,
        poll_method: &str,
    ) -> EmberResult<Settlement> {
        let mut state = SubmitState::Idle;
        let correlation_id = request.correlation_id;
        tracing::debug!(correlation_id, ?state, "cycle started");

        let tx = request.into_transaction(
            self.client.address(),
            &self.config.amount,
            self.config.ttl_seconds,
        )?;
        // No silent fallback here: the user must see a failed submission
        self.signer.send_transaction(&tx).await?;
        state = SubmitState::Submitted;
        tracing::debug!(correlation_id, ?state, "transaction submitted");

        state = SubmitState::AwaitingConfirmation;
        tracing::debug!(
            correlation_id,
            ?state,
            wait_ms = self.config.confirmation_wait.as_millis() as u64,
            "waiting for confirmation"
        );
        tokio::time::sleep(self.config.confirmation_wait).await;

        let settlement = match self.client.run(poll_method, vec![]).await {
            Ok(StackValue::Text(text)) => Settlement::Success(text),
            Ok(StackValue::Int(n)) => Settlement::Success(self.resolve_index(n)),
            Ok(other) => {
                tracing::warn!(
                    correlation_id,
                    value = %other.as_text_lossy(),
                    "re-query decoded to an unusable value"
                );
                match self.config.fallback {
                    FallbackPolicy::LocalCatalog => self.local_fallback(),
                    FallbackPolicy::Surface => Settlement::Fallback(other.as_text_lossy()),
                }
            }
            Err(e) => {
                tracing::warn!(correlation_id, error = %e, "re-query failed");
                match self.config.fallback {
                    FallbackPolicy::LocalCatalog => self.local_fallback(),
                    FallbackPolicy::Surface => return Err(e),
                }
            }
        };
        state = SubmitState::Settled;
        tracing::debug!(correlation_id, ?state, ?settlement, "cycle settled");
        Ok(settlement)
    }

    /// Map an integer result onto the catalog; out-of-range indices keep
    /// their numeric rendering
    fn resolve_index(&self, n: i128) -> String {
        usize::try_from(n)
            .ok()
            .and_then(|i| self.config.catalog.get(i).cloned())
            .unwrap_or_else(|| n.to_string())
    }

    fn local_fallback(&self) -> Settlement {
        let text = self
            .config
            .catalog
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "no result available".into());
        Settlement::Fallback(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueryCall, QueryResponse, QueryResult, StackEntry, TransactionRequest};
    use async_trait::async_trait;
    use ember_core::EmberError;
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

    struct OkSigner;

    #[async_trait]
    impl TransactionSigner for OkSigner {
        async fn send_transaction(&self, _request: &TransactionRequest) -> EmberResult<String> {
            Ok("handle".into())
        }
    }

    struct RefusingSigner;

    #[async_trait]
    impl TransactionSigner for RefusingSigner {
        async fn send_transaction(&self, _request: &TransactionRequest) -> EmberResult<String> {
            Err(EmberError::Signing("user rejected".into()))
        }
    }

    fn stack_response(entries: Vec<StackEntry>) -> EmberResult<QueryResponse> {
        Ok(QueryResponse {
            ok: true,
            result: Some(QueryResult { stack: entries }),
            error: None,
        })
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            confirmation_wait: Duration::ZERO,
            catalog: vec!["alpha".into(), "beta".into()],
            ..OrchestratorConfig::default()
        }
    }

    fn orchestrator<S: TransactionSigner>(
        response: fn() -> EmberResult<QueryResponse>,
        signer: S,
        cfg: OrchestratorConfig,
    ) -> Orchestrator<CannedTransport, S> {
        Orchestrator::new(
            ContractClient::new(CannedTransport { response }, "EQBHepjX"),
            signer,
            cfg,
        )
    }

    #[tokio::test]
    async fn test_text_result_settles_success() {
        let orch = orchestrator(
            || stack_response(vec![StackEntry("string".into(), json!("fresh result"))]),
            OkSigner,
            config(),
        );
        let settlement = orch
            .execute(OperationRequest::fetch_result(1), "getResult")
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Success("fresh result".into()));
        assert_eq!(settlement.text(), "fresh result");
    }

    #[tokio::test]
    async fn test_int_result_resolves_through_catalog() {
        let orch = orchestrator(
            || stack_response(vec![StackEntry("int".into(), json!("1"))]),
            OkSigner,
            config(),
        );
        let settlement = orch
            .execute(OperationRequest::fetch_result(2), "getResult")
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Success("beta".into()));
    }

    #[tokio::test]
    async fn test_out_of_range_int_keeps_numeric_form() {
        let orch = orchestrator(
            || stack_response(vec![StackEntry("int".into(), json!("99"))]),
            OkSigner,
            config(),
        );
        let settlement = orch
            .execute(OperationRequest::fetch_result(3), "getResult")
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Success("99".into()));
    }

    #[tokio::test]
    async fn test_transport_failure_settles_fallback() {
        let orch = orchestrator(
            || Err(EmberError::Transport("connection refused".into())),
            OkSigner,
            config(),
        );
        let settlement = orch
            .execute(OperationRequest::fetch_result(4), "getResult")
            .await
            .unwrap();
        match settlement {
            Settlement::Fallback(text) => {
                assert!(["alpha", "beta"].contains(&text.as_str()));
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unusable_decode_settles_fallback() {
        let orch = orchestrator(
            || stack_response(vec![StackEntry("null".into(), json!(null))]),
            OkSigner,
            config(),
        );
        let settlement = orch
            .execute(OperationRequest::fetch_result(5), "getResult")
            .await
            .unwrap();
        assert!(matches!(settlement, Settlement::Fallback(_)));
    }

    #[tokio::test]
    async fn test_signing_failure_is_surfaced() {
        let orch = orchestrator(
            || stack_response(vec![]),
            RefusingSigner,
            config(),
        );
        let err = orch
            .execute(OperationRequest::fetch_result(6), "getResult")
            .await
            .unwrap_err();
        assert!(matches!(err, EmberError::Signing(_)));
    }

    #[tokio::test]
    async fn test_surface_policy_propagates_transport_error() {
        let mut cfg = config();
        cfg.fallback = FallbackPolicy::Surface;
        let orch = orchestrator(
            || Err(EmberError::Transport("down".into())),
            OkSigner,
            cfg,
        );
        let err = orch
            .execute(OperationRequest::fetch_result(7), "getResult")
            .await
            .unwrap_err();
        assert!(matches!(err, EmberError::Transport(_)));
    }

    #[tokio::test]
    async fn test_concurrent_cycles_both_settle() {
        let orch = orchestrator(
            || stack_response(vec![StackEntry("string".into(), json!("ok"))]),
            OkSigner,
            config(),
        );
        let (a, b) = tokio::join!(
            orch.execute(OperationRequest::fetch_result(8), "getResult"),
            orch.execute(OperationRequest::fetch_result(9), "getResult"),
        );
        assert_eq!(a.unwrap(), Settlement::Success("ok".into()));
        assert_eq!(b.unwrap(), Settlement::Success("ok".into()));
    }
}
