//! # Oraclet Engine
//!
//! The adapter pipeline: validate an inbound request, fan out to the
//! configured data providers, aggregate the survivors under the feed's
//! quorum policy, and encode the result for on-chain delivery.
//!
//! Control flow is strictly linear (Validator, then Fetcher, then Encoder) with
//! the fetcher stage running its calls concurrently. Validation and
//! encoding are pure; suspension happens only at the outbound I/O boundary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oraclet_engine::{Adapter, load_config_file};
//! use serde_json::json;
//!
//! let config = load_config_file("oraclet.yaml")?;
//! let adapter = Adapter::with_http_transport(config)?;
//! let result = adapter
//!     .handle(&json!({ "source": "crypto-usd", "args": ["1", "bitcoin", "btc-bitcoin"] }))
//!     .await?;
//! println!("{}", result.to_wire());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - **`validator`**: parameter-schema validation into an immutable request
//! - **`config`**: the one configuration object, constructed at startup
//! - **`plan`**: per-provider call construction and the query budget
//! - **`fetcher`**: concurrent fan-out behind the transport seam
//! - **`aggregate`**: result-path extraction and the quorum policy
//! - **`encoder`**: decimal shift, 32-byte words, the response-size guard

use std::sync::Arc;

use oraclet_types::{AdapterError, AdapterRequest, EncodedResult};
use serde_json::Value;
use tracing::{Instrument, debug, debug_span};

pub mod aggregate;
pub mod config;
pub mod encoder;
pub mod fetcher;
pub mod plan;
pub mod validator;

// Re-export commonly used types for convenience
pub use aggregate::{Candidate, select_median};
pub use config::{AdapterConfig, FeedSpec, ProviderSpec, ReturnType, load_config_file};
pub use encoder::Encoder;
pub use fetcher::{HttpTransport, UpstreamTransport};
pub use plan::PlannedCall;
pub use validator::Validator;

/// The adapter: configuration plus a transport, wired once at startup and
/// stateless across requests.
pub struct Adapter {
    config: AdapterConfig,
    validator: Validator,
    transport: Arc<dyn UpstreamTransport>,
}

impl Adapter {
    /// Wire the pipeline stages against an explicit transport.
    pub fn new(config: AdapterConfig, transport: Arc<dyn UpstreamTransport>) -> Self {
        let validator = Validator::new(config.default_max_http_queries, config.default_max_response_bytes);
        Self {
            config,
            validator,
            transport,
        }
    }

    /// Wire the pipeline against the production HTTP transport.
    pub fn with_http_transport(config: AdapterConfig) -> anyhow::Result<Self> {
        let transport: Arc<dyn UpstreamTransport> = Arc::new(HttpTransport::new()?);
        Ok(Self::new(config, transport))
    }

    /// Run one request through validate → fetch → encode.
    ///
    /// Validator and limit errors are fatal immediately. Individual
    /// upstream failures are recovered locally unless the aggregate misses
    /// quorum. The request id, when present, annotates the span so log
    /// lines correlate back to the on-chain request.
    pub async fn handle(&self, raw: &Value) -> Result<EncodedResult, AdapterError> {
        let request = self.validator.validate(raw)?;
        let span = debug_span!(
            "request",
            id = request.request_id().unwrap_or("-"),
            source = request.source()
        );
        self.run_pipeline(&request).instrument(span).await
    }

    async fn run_pipeline(&self, request: &AdapterRequest) -> Result<EncodedResult, AdapterError> {
        let Some(feed) = self.config.feeds.get(request.source()) else {
            return Err(AdapterError::unknown_source(request.source()));
        };

        let calls = plan::plan_calls(request, feed)?;
        debug!(calls = calls.len(), "fan-out planned");

        let responses = fetcher::fetch_all(&self.transport, &calls, self.config.overall_timeout_ms).await?;
        let candidate = aggregate::aggregate(&responses, feed)?;

        let encoder = Encoder::new(feed.decimals, request.max_response_bytes());
        encoder.encode(&candidate, feed.result_type)
    }
}
