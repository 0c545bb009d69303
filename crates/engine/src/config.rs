//! Adapter configuration.
//!
//! Configuration is consolidated into one [`AdapterConfig`] object,
//! constructed once at process start and passed explicitly into the
//! pipeline; request handling never reads the environment or the
//! filesystem.

use std::collections::HashSet;
use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Environment override for the default query ceiling.
pub const ENV_MAX_HTTP_QUERIES: &str = "ORACLET_MAX_HTTP_QUERIES";
/// Environment override for the default response-byte ceiling.
pub const ENV_MAX_RESPONSE_BYTES: &str = "ORACLET_MAX_RESPONSE_BYTES";

fn default_max_http_queries() -> usize {
    5
}

fn default_max_response_bytes() -> usize {
    256
}

fn default_overall_timeout_ms() -> u64 {
    10_000
}

fn default_decimals() -> u32 {
    2
}

fn default_method() -> String {
    "GET".to_string()
}

/// Expected wire type of a feed's aggregated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// 32-byte big-endian unsigned integer.
    #[default]
    Uint256,
    /// 32-byte big-endian two's-complement integer.
    Int256,
    /// Raw UTF-8 bytes.
    String,
}

/// Top-level adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Ceiling applied when a request does not set `numAllowedQueries`.
    #[serde(default = "default_max_http_queries")]
    pub default_max_http_queries: usize,
    /// Ceiling applied when a request does not set `maxResponseBytes`.
    #[serde(default = "default_max_response_bytes")]
    pub default_max_response_bytes: usize,
    /// Deadline for the whole concurrent fetch phase.
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
    /// Feeds keyed by the name a request's `source` parameter selects.
    pub feeds: IndexMap<String, FeedSpec>,
}

/// One feed: a quorum policy over an ordered list of providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSpec {
    /// Minimum number of successful provider responses required.
    pub quorum: usize,
    /// Decimal shift applied to numeric results before encoding.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Wire type of the aggregated result.
    #[serde(default)]
    pub result_type: ReturnType,
    pub providers: Vec<ProviderSpec>,
}

/// One upstream data provider within a feed.
///
/// The `path`, `query` values, and `headers` values are templates: they may
/// reference `${{ args.N }}` and `${{ secrets.NAME }}` from the validated
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub base_url: String,
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub query: IndexMap<String, String>,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Dotted/indexed locator of the value of interest in the payload.
    pub result_path: String,
    /// Per-call timeout override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Loads a configuration file with automatic format detection.
///
/// The file is parsed as JSON for a `.json` extension and as YAML
/// otherwise. Environment ceiling overrides are applied and the result is
/// validated before it is returned.
pub fn load_config_file(file_path: impl AsRef<Path>) -> Result<AdapterConfig> {
    let file_path = file_path.as_ref();
    let content =
        fs::read_to_string(file_path).with_context(|| format!("Failed to read config file: {}", file_path.display()))?;

    let mut config: AdapterConfig = match file_path.extension().and_then(|extension| extension.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Config file is not valid JSON: {}", file_path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Config file is not valid YAML: {}", file_path.display()))?,
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Apply `ORACLET_MAX_HTTP_QUERIES` / `ORACLET_MAX_RESPONSE_BYTES`
/// overrides to the configured ceilings.
pub fn apply_env_overrides(config: &mut AdapterConfig) {
    if let Some(value) = env_usize(ENV_MAX_HTTP_QUERIES) {
        config.default_max_http_queries = value;
    }
    if let Some(value) = env_usize(ENV_MAX_RESPONSE_BYTES) {
        config.default_max_response_bytes = value;
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse().ok()
}

static NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9._-]+$").expect("name regex should compile"));

/// Validate the entire adapter configuration.
pub fn validate_config(config: &AdapterConfig) -> Result<()> {
    if config.feeds.is_empty() {
        bail!("config declares no feeds");
    }

    for (feed_name, feed) in &config.feeds {
        validate_name(feed_name).with_context(|| format!("feed '{}'", feed_name))?;
        validate_feed(feed_name, feed)?;
        debug!("Validated feed configuration: {}", feed_name);
    }

    Ok(())
}

fn validate_feed(feed_name: &str, feed: &FeedSpec) -> Result<()> {
    if feed.providers.is_empty() {
        bail!("feed '{}' declares no providers", feed_name);
    }
    if feed.quorum == 0 || feed.quorum > feed.providers.len() {
        bail!(
            "feed '{}' quorum {} must be between 1 and its provider count {}",
            feed_name,
            feed.quorum,
            feed.providers.len()
        );
    }

    let mut seen_names = HashSet::new();
    for provider in &feed.providers {
        validate_name(&provider.name).with_context(|| format!("feed '{}' provider '{}'", feed_name, provider.name))?;
        if !seen_names.insert(provider.name.as_str()) {
            bail!("feed '{}' declares provider '{}' more than once", feed_name, provider.name);
        }
        validate_base_url(&provider.base_url)
            .with_context(|| format!("feed '{}' provider '{}'", feed_name, provider.name))?;
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if !NAME_REGEX.is_match(name) {
        bail!("name must contain only lowercase letters, numbers, dots, underscores, and hyphens");
    }
    Ok(())
}

/// Validate that a provider base URL is acceptable.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be https
fn validate_base_url(base: &str) -> Result<()> {
    let parsed = Url::parse(base).map_err(|error| anyhow!("invalid base URL '{}': {}", base, error))?;

    let host_name = parsed
        .host_str()
        .ok_or_else(|| anyhow!("base URL '{}' must include a host", base))?;

    if host_name.eq_ignore_ascii_case("localhost") || host_name == "127.0.0.1" {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        bail!("base URL '{}' must use https for non-localhost hosts", base);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FEED_YAML: &str = r#"
feeds:
  crypto-usd:
    quorum: 2
    providers:
      - name: coinmarketcap
        base_url: https://pro-api.coinmarketcap.com
        path: /v1/cryptocurrency/quotes/latest
        query:
          id: "${{ args.0 }}"
          convert: USD
        headers:
          X-CMC_PRO_API_KEY: "${{ secrets.apiKey }}"
        result_path: data.1.quote.USD.price
      - name: coingecko
        base_url: https://api.coingecko.com
        path: /api/v3/simple/price
        query:
          ids: "${{ args.1 }}"
          vs_currencies: usd
        result_path: bitcoin.usd
      - name: coinpaprika
        base_url: https://api.coinpaprika.com
        path: /v1/tickers/${{ args.2 }}
        result_path: quotes.USD.price
"#;

    fn parse_yaml(content: &str) -> AdapterConfig {
        serde_yaml::from_str(content).expect("parse config yaml")
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let config = parse_yaml(FEED_YAML);
        assert_eq!(config.default_max_http_queries, 5);
        assert_eq!(config.default_max_response_bytes, 256);
        assert_eq!(config.overall_timeout_ms, 10_000);

        let feed = &config.feeds["crypto-usd"];
        assert_eq!(feed.quorum, 2);
        assert_eq!(feed.decimals, 2);
        assert_eq!(feed.result_type, ReturnType::Uint256);
        assert_eq!(feed.providers.len(), 3);
        assert_eq!(feed.providers[0].method, "GET");
        assert_eq!(feed.providers[2].path, "/v1/tickers/${{ args.2 }}");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn load_config_file_accepts_json_by_extension() {
        let json = r#"{
            "default_max_http_queries": 4,
            "feeds": {
                "demo": {
                    "quorum": 1,
                    "result_type": "string",
                    "providers": [
                        { "name": "countries", "base_url": "https://countries.example.com",
                          "path": "/v1/${{ args.0 }}", "result_path": "country.name" }
                    ]
                }
            }
        }"#;
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let path = temp_dir.path().join("adapter.json");
        let mut file = fs::File::create(&path).expect("create file");
        file.write_all(json.as_bytes()).expect("write file");

        let config = load_config_file(&path).expect("load json config");
        assert_eq!(config.default_max_http_queries, 4);
        assert_eq!(config.feeds["demo"].result_type, ReturnType::String);
    }

    #[test]
    fn rejects_quorum_above_provider_count() {
        let mut config = parse_yaml(FEED_YAML);
        config.feeds.get_mut("crypto-usd").expect("feed exists").quorum = 4;
        let error = validate_config(&config).expect_err("should reject");
        assert!(error.to_string().contains("quorum"), "error: {error}");
    }

    #[test]
    fn rejects_plain_http_provider_base_urls() {
        let mut config = parse_yaml(FEED_YAML);
        config.feeds.get_mut("crypto-usd").expect("feed exists").providers[0].base_url = "http://pro-api.coinmarketcap.com".into();
        let error = validate_config(&config).expect_err("should reject");
        assert!(error.root_cause().to_string().contains("https"), "error: {error:#}");
    }

    #[test]
    fn rejects_duplicate_provider_names() {
        let mut config = parse_yaml(FEED_YAML);
        let feed = config.feeds.get_mut("crypto-usd").expect("feed exists");
        feed.providers[1].name = "coinmarketcap".into();
        let error = validate_config(&config).expect_err("should reject");
        assert!(error.to_string().contains("more than once"), "error: {error}");
    }

    #[test]
    fn env_overrides_replace_the_default_ceilings() {
        temp_env::with_vars(
            [(ENV_MAX_HTTP_QUERIES, Some("9")), (ENV_MAX_RESPONSE_BYTES, Some("1024"))],
            || {
                let mut config = parse_yaml(FEED_YAML);
                apply_env_overrides(&mut config);
                assert_eq!(config.default_max_http_queries, 9);
                assert_eq!(config.default_max_response_bytes, 1024);
            },
        );
    }
}
