//! Request validation against the declared parameter schema.
//!
//! Validation is the first pipeline stage and is pure: no I/O, no clock,
//! no mutation of the schema. A raw JSON object either normalizes into an
//! immutable [`AdapterRequest`] or fails fast with an error naming the
//! offending field.

use std::collections::HashMap;

use oraclet_types::{AdapterError, AdapterRequest, ParamSpec, ParamType, ParameterSchema, SecretMap};
use serde_json::Value;
use tracing::debug;

/// Builds the inbound request schema: the declared shape every request
/// must satisfy before any upstream work happens.
pub fn inbound_schema() -> ParameterSchema {
    ParameterSchema::new()
        .declare(
            "source",
            ParamSpec {
                aliases: vec![],
                required: true,
                r#type: ParamType::String,
                description: Some("Name of the configured feed to serve".into()),
            },
        )
        .declare(
            "args",
            ParamSpec {
                aliases: vec![],
                required: false,
                r#type: ParamType::StringArray,
                description: Some("Positional string arguments interpolated into provider calls".into()),
            },
        )
        .declare(
            "secrets",
            ParamSpec {
                aliases: vec![],
                required: false,
                r#type: ParamType::StringMap,
                description: Some("Credentials referenced by provider templates; never logged".into()),
            },
        )
        .declare(
            "requestId",
            ParamSpec {
                aliases: vec!["id".into(), "jobRunId".into()],
                required: false,
                r#type: ParamType::String,
                description: Some("Correlation identifier relayed through logs".into()),
            },
        )
        .declare(
            "numAllowedQueries",
            ParamSpec {
                aliases: vec![],
                required: false,
                r#type: ParamType::Integer,
                description: Some("Per-request ceiling on outbound calls".into()),
            },
        )
        .declare(
            "maxResponseBytes",
            ParamSpec {
                aliases: vec![],
                required: false,
                r#type: ParamType::Integer,
                description: Some("Per-request ceiling on the encoded response size".into()),
            },
        )
}

/// Validates raw requests into immutable [`AdapterRequest`]s.
#[derive(Debug, Clone)]
pub struct Validator {
    schema: ParameterSchema,
    default_max_http_queries: usize,
    default_max_response_bytes: usize,
}

impl Validator {
    pub fn new(default_max_http_queries: usize, default_max_response_bytes: usize) -> Self {
        Self {
            schema: inbound_schema(),
            default_max_http_queries,
            default_max_response_bytes,
        }
    }

    /// Validate and normalize a raw request object.
    ///
    /// Aliased keys fold onto their canonical names; keys the schema does
    /// not declare are ignored. Unset limits default from the configured
    /// ceilings, and explicit limits above a ceiling clamp down to it;
    /// the ceilings are configuration, not per-request overridable upward.
    pub fn validate(&self, raw: &Value) -> Result<AdapterRequest, AdapterError> {
        let Value::Object(fields) = raw else {
            return Err(AdapterError::type_mismatch("request", "an object", json_type_name(raw)));
        };

        let mut canonical: HashMap<&str, &Value> = HashMap::new();
        for (key, value) in fields {
            if let Some(name) = self.schema.canonical_name(key) {
                canonical.entry(name).or_insert(value);
            }
        }

        for (name, spec) in self.schema.iter() {
            if spec.required && !canonical.contains_key(name.as_str()) {
                return Err(AdapterError::missing_parameter(name.clone()));
            }
        }

        let source = string_value("source", canonical["source"])?;
        let args = match canonical.get("args") {
            Some(value) => string_array("args", value)?,
            None => Vec::new(),
        };
        let secrets = match canonical.get("secrets") {
            Some(value) => string_map("secrets", value)?,
            None => SecretMap::new(),
        };
        let request_id = match canonical.get("requestId") {
            Some(value) => Some(string_value("requestId", value)?),
            None => None,
        };
        let num_allowed_queries =
            self.limit_or_default("numAllowedQueries", canonical.get("numAllowedQueries").copied(), self.default_max_http_queries)?;
        let max_response_bytes =
            self.limit_or_default("maxResponseBytes", canonical.get("maxResponseBytes").copied(), self.default_max_response_bytes)?;

        Ok(AdapterRequest::new(
            source,
            args,
            secrets,
            request_id,
            num_allowed_queries,
            max_response_bytes,
        ))
    }

    fn limit_or_default(&self, name: &str, value: Option<&Value>, ceiling: usize) -> Result<usize, AdapterError> {
        let Some(value) = value else {
            return Ok(ceiling);
        };
        let requested = positive_integer(name, value)?;
        if requested > ceiling {
            debug!(param = name, requested, ceiling, "clamping request limit to configured ceiling");
            return Ok(ceiling);
        }
        Ok(requested)
    }
}

fn string_value(name: &str, value: &Value) -> Result<String, AdapterError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => Err(AdapterError::type_mismatch(name, ParamType::String.expected_name(), json_type_name(other))),
    }
}

fn string_array(name: &str, value: &Value) -> Result<Vec<String>, AdapterError> {
    let Value::Array(items) = value else {
        return Err(AdapterError::type_mismatch(
            name,
            ParamType::StringArray.expected_name(),
            json_type_name(value),
        ));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            other => Err(AdapterError::type_mismatch(
                name,
                ParamType::StringArray.expected_name(),
                format!("an array containing {}", json_type_name(other)),
            )),
        })
        .collect()
}

fn string_map(name: &str, value: &Value) -> Result<SecretMap, AdapterError> {
    let Value::Object(map) = value else {
        return Err(AdapterError::type_mismatch(
            name,
            ParamType::StringMap.expected_name(),
            json_type_name(value),
        ));
    };
    map.iter()
        .map(|(key, item)| match item {
            Value::String(text) => Ok((key.clone(), text.clone())),
            other => Err(AdapterError::type_mismatch(
                name,
                ParamType::StringMap.expected_name(),
                format!("a map containing {}", json_type_name(other)),
            )),
        })
        .collect()
}

fn positive_integer(name: &str, value: &Value) -> Result<usize, AdapterError> {
    let Value::Number(number) = value else {
        return Err(AdapterError::type_mismatch(
            name,
            ParamType::Integer.expected_name(),
            json_type_name(value),
        ));
    };
    let Some(integer) = number.as_u64() else {
        return Err(AdapterError::type_mismatch(
            name,
            "a positive integer",
            number.to_string(),
        ));
    };
    if integer == 0 {
        return Err(AdapterError::type_mismatch(name, "a positive integer", "0"));
    }
    Ok(integer as usize)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
