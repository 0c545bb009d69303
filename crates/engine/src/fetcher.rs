//! Concurrent upstream fan-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use oraclet_types::{AdapterError, OutboundCall, ProviderOutcome, ProviderResponse};
use oraclet_util::redact_sensitive;
use tracing::{debug, warn};

use crate::plan::PlannedCall;

/// Transport seam for issuing one upstream call.
///
/// The production implementation wraps [`oraclet_api::ProviderClient`];
/// tests substitute spies that record calls and return canned responses.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn execute(&self, call: &OutboundCall) -> ProviderResponse;
}

/// HTTP transport backed by [`oraclet_api::ProviderClient`].
pub struct HttpTransport {
    client: oraclet_api::ProviderClient,
}

impl HttpTransport {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: oraclet_api::ProviderClient::new()?,
        })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn execute(&self, call: &OutboundCall) -> ProviderResponse {
        self.client.execute(call).await
    }
}

/// Issue every ready call concurrently and collect every outcome.
///
/// Pre-failed planned calls pass straight through without touching the
/// transport. Calls share no mutable state, so sibling failures never abort
/// one another. The whole phase runs under one deadline: on expiry every
/// outstanding call is abandoned and the request fails with
/// [`AdapterError::Timeout`], with no partial aggregation even if quorum had
/// already been reached.
pub async fn fetch_all(
    transport: &Arc<dyn UpstreamTransport>,
    calls: &[PlannedCall],
    overall_timeout_ms: u64,
) -> Result<Vec<ProviderResponse>, AdapterError> {
    let futures = calls.iter().map(|planned| {
        let transport = Arc::clone(transport);
        async move {
            match planned {
                PlannedCall::Failed(response) => response.clone(),
                PlannedCall::Ready(call) => transport.execute(call).await,
            }
        }
    });

    let deadline = Duration::from_millis(overall_timeout_ms);
    let responses = tokio::time::timeout(deadline, join_all(futures))
        .await
        .map_err(|_| AdapterError::Timeout {
            timeout_ms: overall_timeout_ms,
        })?;

    for response in &responses {
        match &response.outcome {
            ProviderOutcome::Payload(_) => debug!(provider = %response.provider, "upstream call succeeded"),
            ProviderOutcome::Failed(failure) => warn!(
                provider = %response.provider,
                status = ?failure.status,
                "upstream call failed: {}",
                redact_sensitive(&failure.message)
            ),
        }
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedTransport {
        calls: Mutex<Vec<String>>,
        delay_ms: u64,
    }

    impl CannedTransport {
        fn new(delay_ms: u64) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay_ms,
            }
        }
    }

    #[async_trait]
    impl UpstreamTransport for CannedTransport {
        async fn execute(&self, call: &OutboundCall) -> ProviderResponse {
            self.calls.lock().expect("lock").push(call.provider.clone());
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            ProviderResponse::success(call.provider.clone(), serde_json::json!({ "price": 1.0 }))
        }
    }

    fn ready(provider: &str) -> PlannedCall {
        PlannedCall::Ready(OutboundCall {
            provider: provider.into(),
            method: "GET".into(),
            url: format!("https://api.example.com/{provider}"),
            headers: vec![],
            query: vec![],
            body: None,
            timeout_ms: 5_000,
        })
    }

    #[tokio::test]
    async fn pre_failed_calls_never_touch_the_transport() {
        let transport = Arc::new(CannedTransport::new(0));
        let dyn_transport: Arc<dyn UpstreamTransport> = transport.clone();
        let calls = vec![
            PlannedCall::Failed(ProviderResponse::failure("broken", None, "planned failure")),
            ready("healthy"),
        ];

        let responses = fetch_all(&dyn_transport, &calls, 1_000).await.expect("fetch");
        assert_eq!(responses.len(), 2);
        assert!(!responses[0].is_success());
        assert!(responses[1].is_success());
        assert_eq!(*transport.calls.lock().expect("lock"), vec!["healthy".to_string()]);
    }

    #[tokio::test]
    async fn deadline_expiry_abandons_all_outstanding_calls() {
        let transport = Arc::new(CannedTransport::new(200));
        let dyn_transport: Arc<dyn UpstreamTransport> = transport.clone();
        let calls = vec![ready("slow-a"), ready("slow-b")];

        let error = fetch_all(&dyn_transport, &calls, 10).await.expect_err("should time out");
        assert_eq!(error, AdapterError::Timeout { timeout_ms: 10 });
    }
}
