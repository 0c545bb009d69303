//! Quorum aggregation over provider responses.
//!
//! Successful payloads are reduced to scalar candidates by resolving each
//! provider's declared result path; the quorum policy then decides whether
//! the surviving candidates are enough to proceed.

use oraclet_types::{AdapterError, ProviderOutcome, ProviderResponse};
use oraclet_util::result_path;
use serde_json::Value;
use tracing::warn;

use crate::config::{FeedSpec, ReturnType};

/// Scalar candidate extracted from one successful provider payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Number(f64),
    Text(String),
}

/// Reduce responses to candidates, enforce quorum, and select the result.
///
/// A payload whose result path does not resolve to a usable scalar demotes
/// that provider to a failure: it is logged and excluded, exactly like an
/// upstream error.
pub fn aggregate(responses: &[ProviderResponse], feed: &FeedSpec) -> Result<Candidate, AdapterError> {
    let mut candidates = Vec::new();

    for response in responses {
        let Some(payload) = response.payload() else {
            continue;
        };
        let Some(provider) = feed.providers.iter().find(|provider| provider.name == response.provider) else {
            continue;
        };
        match extract_candidate(payload, &provider.result_path, feed.result_type) {
            Some(candidate) => candidates.push(candidate),
            None => warn!(
                provider = %response.provider,
                path = %provider.result_path,
                fields = ?result_path::top_level_fields(payload),
                "result path did not resolve to a usable scalar"
            ),
        }
    }

    if candidates.len() < feed.quorum {
        // A single-provider feed has no sibling to fall back on; surface
        // that provider's own failure instead of a bare quorum count.
        if feed.providers.len() == 1
            && let Some(response) = responses.first()
            && let ProviderOutcome::Failed(failure) = &response.outcome
        {
            return Err(AdapterError::upstream(response.provider.clone(), failure.status, failure.message.clone()));
        }
        return Err(AdapterError::QuorumNotMet {
            required: feed.quorum,
            got: candidates.len(),
        });
    }

    Ok(select_median(candidates))
}

fn extract_candidate(payload: &Value, path: &str, result_type: ReturnType) -> Option<Candidate> {
    match result_type {
        ReturnType::Uint256 | ReturnType::Int256 => result_path::resolve_number(payload, path).map(Candidate::Number),
        ReturnType::String => result_path::resolve_string(payload, path).map(|text| Candidate::Text(text.to_string())),
    }
}

/// Sort ascending and pick index `round(n/2)`, clamped to the last element.
///
/// The upper-of-two tie-break is inherited from the reference feed and is
/// intentionally not a textbook median: three candidates select the
/// largest, not the middle one. Callers must not pass an empty vector.
pub fn select_median(mut candidates: Vec<Candidate>) -> Candidate {
    candidates.sort_by(|a, b| match (a, b) {
        (Candidate::Number(x), Candidate::Number(y)) => x.total_cmp(y),
        (Candidate::Text(x), Candidate::Text(y)) => x.cmp(y),
        (Candidate::Number(_), Candidate::Text(_)) => std::cmp::Ordering::Less,
        (Candidate::Text(_), Candidate::Number(_)) => std::cmp::Ordering::Greater,
    });

    let count = candidates.len();
    let index = ((count as f64) / 2.0).round() as usize;
    candidates
        .into_iter()
        .nth(index.min(count - 1))
        .expect("candidate list verified non-empty")
}
