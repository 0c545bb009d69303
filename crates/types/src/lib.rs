//! Shared type definitions for the oraclet adapter pipeline.
//!
//! These types flow between the three pipeline stages: the validator
//! produces an immutable [`AdapterRequest`], the fetcher consumes
//! [`OutboundCall`]s and yields [`ProviderResponse`]s, and the encoder
//! emits an [`EncodedResult`] in the wire format the on-chain consumer
//! expects (`"0x0"` for the empty sentinel, `"0x" + hex` otherwise).

use std::fmt;

use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod error;

pub use error::AdapterError;

/// Primitive type accepted for a declared request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    /// Array of strings, e.g. the `args` parameter.
    StringArray,
    /// String-to-string mapping, e.g. the `secrets` parameter.
    StringMap,
}

impl ParamType {
    /// Human-readable phrasing used in type-mismatch messages.
    pub fn expected_name(self) -> &'static str {
        match self {
            ParamType::String => "a string",
            ParamType::Integer => "an integer",
            ParamType::StringArray => "an array of strings",
            ParamType::StringMap => "a string-to-string map",
        }
    }
}

/// Declaration of a single request parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Alternate names accepted for this parameter.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Whether validation fails when the parameter is absent.
    #[serde(default)]
    pub required: bool,
    /// Primitive type the raw value must carry.
    pub r#type: ParamType,
    /// Human-readable description of what this parameter does.
    #[serde(default)]
    pub description: Option<String>,
}

/// Ordered parameter declarations driving request validation.
///
/// A schema is built once at startup and never mutated at request time;
/// iteration order is declaration order, which keeps validation errors
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct ParameterSchema {
    params: IndexMap<String, ParamSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter, builder style.
    pub fn declare(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    /// Iterate declarations in the order they were declared.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamSpec)> {
        self.params.iter()
    }

    /// Resolve an incoming key to its canonical parameter name, honoring
    /// declared aliases. Returns `None` for keys the schema does not know.
    pub fn canonical_name(&self, key: &str) -> Option<&str> {
        if let Some((name, _)) = self.params.get_key_value(key) {
            return Some(name.as_str());
        }
        self.params
            .iter()
            .find(|(_, spec)| spec.aliases.iter().any(|alias| alias == key))
            .map(|(name, _)| name.as_str())
    }
}

/// String-to-string secret material supplied with a request.
///
/// Values are credentials for upstream providers. `Debug` renders key names
/// only; the values must never reach logs or error messages.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SecretMap(IndexMap<String, String>);

impl SecretMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.keys().map(|key| (key, "<redacted>"))).finish()
    }
}

impl FromIterator<(String, String)> for SecretMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A validated, normalized request.
///
/// Constructed only by the validator; immutable for the remainder of the
/// pipeline. The effective limits have already had configuration ceilings
/// applied.
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    source: String,
    args: Vec<String>,
    secrets: SecretMap,
    request_id: Option<String>,
    num_allowed_queries: usize,
    max_response_bytes: usize,
}

impl AdapterRequest {
    pub fn new(
        source: String,
        args: Vec<String>,
        secrets: SecretMap,
        request_id: Option<String>,
        num_allowed_queries: usize,
        max_response_bytes: usize,
    ) -> Self {
        Self {
            source,
            args,
            secrets,
            request_id,
            num_allowed_queries,
            max_response_bytes,
        }
    }

    /// Name of the configured feed this request targets.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Positional string arguments interpolated into provider calls.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn secrets(&self) -> &SecretMap {
        &self.secrets
    }

    /// Correlation identifier supplied by the caller, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Effective ceiling on outbound calls for this request.
    pub fn num_allowed_queries(&self) -> usize {
        self.num_allowed_queries
    }

    /// Effective ceiling on the encoded response size, in bytes.
    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }
}

/// A single planned upstream call.
#[derive(Clone)]
pub struct OutboundCall {
    /// Configured provider name, used for correlation and logging.
    pub provider: String,
    /// HTTP method, e.g. "GET".
    pub method: String,
    /// Finished URL including the interpolated path.
    pub url: String,
    /// Header name/value pairs; values may carry credentials.
    pub headers: Vec<(String, String)>,
    /// Query parameter name/value pairs.
    pub query: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

// Header values may carry interpolated credentials; render names only.
impl fmt::Debug for OutboundCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundCall")
            .field("provider", &self.provider)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>())
            .field("query", &self.query.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>())
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Failure descriptor for one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// HTTP status code when the provider answered at all.
    pub status: Option<u16>,
    pub message: String,
}

/// Outcome of one upstream call: a parsed payload or a failure descriptor.
///
/// Failures are values here, not early returns, so sibling calls keep
/// running and the quorum policy decides what is fatal.
#[derive(Debug, Clone)]
pub enum ProviderOutcome {
    Payload(Value),
    Failed(ProviderFailure),
}

/// Result of one upstream call, owned by the fetcher stage.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider: String,
    pub outcome: ProviderOutcome,
}

impl ProviderResponse {
    pub fn success(provider: impl Into<String>, payload: Value) -> Self {
        Self {
            provider: provider.into(),
            outcome: ProviderOutcome::Payload(payload),
        }
    }

    pub fn failure(provider: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            outcome: ProviderOutcome::Failed(ProviderFailure {
                status,
                message: message.into(),
            }),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            ProviderOutcome::Payload(payload) => Some(payload),
            ProviderOutcome::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProviderOutcome::Payload(_))
    }
}

/// Final encoded output bytes. Immutable once produced.
///
/// The zero-length sentinel disambiguates "no data" from an encoded zero
/// value on the wire: it renders as the literal `"0x0"`, never `"0x"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResult(Vec<u8>);

impl EncodedResult {
    /// The reserved empty sentinel.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the wire string consumed by the on-chain bridge.
    pub fn to_wire(&self) -> String {
        if self.0.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", hex::encode(&self.0))
        }
    }

    /// Parse a wire string back into bytes.
    pub fn from_wire(wire: &str) -> Result<Self> {
        if wire == "0x0" {
            return Ok(Self::empty());
        }
        let digits = wire
            .strip_prefix("0x")
            .ok_or_else(|| anyhow!("wire value '{}' is missing the 0x prefix", wire))?;
        let bytes = hex::decode(digits).with_context(|| format!("wire value '{}' is not valid hex", wire))?;
        Ok(Self(bytes))
    }

    /// Interpret the bytes as a big-endian unsigned integer.
    ///
    /// Returns `None` when the value does not fit in 128 bits.
    pub fn decode_uint(&self) -> Option<u128> {
        let bytes = &self.0;
        if bytes.len() > 16 {
            let (high, low) = bytes.split_at(bytes.len() - 16);
            if high.iter().any(|byte| *byte != 0) {
                return None;
            }
            let mut word = [0u8; 16];
            word.copy_from_slice(low);
            return Some(u128::from_be_bytes(word));
        }
        let mut word = [0u8; 16];
        word[16 - bytes.len()..].copy_from_slice(bytes);
        Some(u128::from_be_bytes(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_resolves_aliases() {
        let schema = ParameterSchema::new().declare(
            "requestId",
            ParamSpec {
                aliases: vec!["id".into(), "jobRunId".into()],
                required: false,
                r#type: ParamType::String,
                description: None,
            },
        );
        assert_eq!(schema.canonical_name("requestId"), Some("requestId"));
        assert_eq!(schema.canonical_name("jobRunId"), Some("requestId"));
        assert_eq!(schema.canonical_name("unknown"), None);
    }

    #[test]
    fn secret_map_debug_redacts_values() {
        let mut secrets = SecretMap::new();
        secrets.insert("apiKey", "super-secret-value");
        let rendered = format!("{:?}", secrets);
        assert!(rendered.contains("apiKey"));
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn outbound_call_debug_hides_header_values() {
        let call = OutboundCall {
            provider: "cmc".into(),
            method: "GET".into(),
            url: "https://example.com/v1".into(),
            headers: vec![("X-CMC_PRO_API_KEY".into(), "credential".into())],
            query: vec![],
            body: None,
            timeout_ms: 5_000,
        };
        let rendered = format!("{:?}", call);
        assert!(rendered.contains("X-CMC_PRO_API_KEY"));
        assert!(!rendered.contains("credential"));
    }

    #[test]
    fn empty_result_renders_sentinel_not_bare_prefix() {
        let result = EncodedResult::empty();
        assert_eq!(result.to_wire(), "0x0");
        assert_ne!(result.to_wire(), "0x");
    }

    #[test]
    fn wire_round_trip_preserves_bytes() {
        let result = EncodedResult::from_bytes(vec![0x12, 0xd6, 0x87]);
        let wire = result.to_wire();
        assert_eq!(wire, "0x12d687");
        assert_eq!(EncodedResult::from_wire(&wire).expect("decode"), result);
    }

    #[test]
    fn decode_uint_reads_big_endian_with_leading_zeros() {
        let mut word = vec![0u8; 32];
        word[29] = 0x12;
        word[30] = 0xd6;
        word[31] = 0x87;
        let result = EncodedResult::from_bytes(word);
        assert_eq!(result.decode_uint(), Some(1_234_567));
    }

    #[test]
    fn decode_uint_rejects_values_beyond_128_bits() {
        let mut word = vec![0u8; 32];
        word[0] = 0x01;
        let result = EncodedResult::from_bytes(word);
        assert_eq!(result.decode_uint(), None);
    }
}
