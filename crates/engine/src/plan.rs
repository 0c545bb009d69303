//! Builds the outbound fan-out for a validated request.
//!
//! Each configured provider yields one call. Provider templates may
//! reference `${{ args.N }}` and `${{ secrets.NAME }}`; values substituted
//! into URL paths are percent-encoded. The query budget is enforced here,
//! synchronously, before any call is issued.

use oraclet_api::{DEFAULT_CALL_TIMEOUT_MS, MAX_CALL_TIMEOUT_MS, MAX_URL_BYTES};
use oraclet_types::{AdapterError, AdapterRequest, OutboundCall, ProviderResponse};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::{FeedSpec, ProviderSpec};

/// A call that is ready to issue, or one that failed during planning and
/// carries its failure descriptor instead of ever reaching the network.
#[derive(Debug, Clone)]
pub enum PlannedCall {
    Ready(OutboundCall),
    Failed(ProviderResponse),
}

/// Plan the full fan-out for a request.
///
/// Fails with [`AdapterError::QueryLimitExceeded`] when the feed would need
/// more calls than the request allows, checked before anything is issued.
/// A template referencing an absent arg or secret is fatal for the whole
/// request; per-provider ceiling violations (URL length, per-call timeout)
/// demote only that provider.
pub fn plan_calls(request: &AdapterRequest, feed: &FeedSpec) -> Result<Vec<PlannedCall>, AdapterError> {
    if feed.providers.len() > request.num_allowed_queries() {
        return Err(AdapterError::QueryLimitExceeded {
            requested: feed.providers.len(),
            allowed: request.num_allowed_queries(),
        });
    }

    feed.providers
        .iter()
        .map(|provider| plan_provider_call(request, provider))
        .collect()
}

fn plan_provider_call(request: &AdapterRequest, provider: &ProviderSpec) -> Result<PlannedCall, AdapterError> {
    let path = interpolate(&provider.path, request, true)?;
    let url = format!("{}{}", provider.base_url.trim_end_matches('/'), path);
    if url.len() > MAX_URL_BYTES {
        return Ok(PlannedCall::Failed(ProviderResponse::failure(
            provider.name.clone(),
            None,
            format!("call URL is {} bytes, ceiling is {}", url.len(), MAX_URL_BYTES),
        )));
    }

    let timeout_ms = provider.timeout_ms.unwrap_or(DEFAULT_CALL_TIMEOUT_MS);
    if timeout_ms > MAX_CALL_TIMEOUT_MS {
        return Ok(PlannedCall::Failed(ProviderResponse::failure(
            provider.name.clone(),
            None,
            format!("per-call timeout {}ms exceeds the {}ms ceiling", timeout_ms, MAX_CALL_TIMEOUT_MS),
        )));
    }

    let query = provider
        .query
        .iter()
        .map(|(name, template)| Ok((name.clone(), interpolate(template, request, false)?)))
        .collect::<Result<Vec<_>, AdapterError>>()?;
    let headers = provider
        .headers
        .iter()
        .map(|(name, template)| Ok((name.clone(), interpolate(template, request, false)?)))
        .collect::<Result<Vec<_>, AdapterError>>()?;

    Ok(PlannedCall::Ready(OutboundCall {
        provider: provider.name.clone(),
        method: provider.method.clone(),
        url,
        headers,
        query,
        body: None,
        timeout_ms,
    }))
}

/// Substitute `${{ ... }}` expressions in a template.
///
/// Unterminated expressions are kept literally. When `encode_for_path` is
/// set, substituted values are percent-encoded.
fn interpolate(template: &str, request: &AdapterRequest, encode_for_path: bool) -> Result<String, AdapterError> {
    let mut out = String::with_capacity(template.len());
    let mut remainder = template;

    while let Some(start) = remainder.find("${{") {
        out.push_str(&remainder[..start]);
        let after_start = &remainder[start + 3..];
        let Some(end) = after_start.find("}}") else {
            out.push_str(&remainder[start..]);
            return Ok(out);
        };
        let expression = after_start[..end].trim();
        let value = resolve_expression(expression, request)?;
        if encode_for_path {
            out.push_str(&utf8_percent_encode(&value, NON_ALPHANUMERIC).to_string());
        } else {
            out.push_str(&value);
        }
        remainder = &after_start[end + 2..];
    }

    out.push_str(remainder);
    Ok(out)
}

fn resolve_expression(expression: &str, request: &AdapterRequest) -> Result<String, AdapterError> {
    if let Some(index_raw) = expression.strip_prefix("args.") {
        let index: usize = index_raw
            .parse()
            .map_err(|_| AdapterError::type_mismatch(expression, "an args index", index_raw))?;
        return request
            .args()
            .get(index)
            .cloned()
            .ok_or_else(|| AdapterError::missing_parameter(format!("args.{}", index)));
    }
    if let Some(key) = expression.strip_prefix("secrets.") {
        return request
            .secrets()
            .get(key)
            .map(str::to_string)
            .ok_or_else(|| AdapterError::missing_parameter(format!("secrets.{}", key)));
    }
    Err(AdapterError::type_mismatch(
        expression,
        "an 'args.N' or 'secrets.NAME' reference",
        expression,
    ))
}
