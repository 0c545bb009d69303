//! Dotted/indexed result-path resolution over JSON payloads.
//!
//! A result path such as `quotes.USD.price` or `data[0].price` locates the
//! scalar of interest inside a provider payload. Both `.0.` and `[0]`
//! spellings address array elements.

use serde_json::Value;

/// Split a path into segments, treating `[N]` brackets as index segments.
pub fn parse_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(character) = chars.next() {
        match character {
            '.' => {
                if !current.is_empty() {
                    segments.push(current.clone());
                    current.clear();
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(current.clone());
                    current.clear();
                }
                let mut inner = String::new();
                while let Some(next_character) = chars.peek().copied() {
                    chars.next();
                    if next_character == ']' {
                        break;
                    }
                    inner.push(next_character);
                }
                if !inner.trim().is_empty() {
                    segments.push(inner.trim().to_string());
                }
            }
            _ => current.push(character),
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Resolve a dotted/indexed path against a JSON payload.
///
/// An empty path (or `"."`) designates the payload itself.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.trim().is_empty() || path == "." {
        return Some(value);
    }

    let mut current = value;
    for segment in parse_segments(path) {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a path to a finite numeric leaf.
pub fn resolve_number(value: &Value, path: &str) -> Option<f64> {
    match resolve(value, path)? {
        Value::Number(number) => number.as_f64().filter(|float| float.is_finite()),
        _ => None,
    }
}

/// Resolve a path to a string leaf.
pub fn resolve_string<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    match resolve(value, path)? {
        Value::String(text) => Some(text.as_str()),
        _ => None,
    }
}

/// Sorted top-level object field names, for diagnostics.
pub fn top_level_fields(value: &Value) -> Vec<String> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    let mut fields = map.keys().cloned().collect::<Vec<_>>();
    fields.sort();
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_object_paths() {
        let payload = json!({ "quotes": { "USD": { "price": 64123.55 } } });
        assert_eq!(resolve_number(&payload, "quotes.USD.price"), Some(64123.55));
    }

    #[test]
    fn resolves_array_indices_in_both_spellings() {
        let payload = json!({ "data": [{ "price": 10.5 }, { "price": 11.0 }] });
        assert_eq!(resolve_number(&payload, "data[1].price"), Some(11.0));
        assert_eq!(resolve_number(&payload, "data.1.price"), Some(11.0));
    }

    #[test]
    fn empty_path_designates_the_payload_itself() {
        let payload = json!(42);
        assert_eq!(resolve(&payload, ""), Some(&payload));
        assert_eq!(resolve(&payload, "."), Some(&payload));
    }

    #[test]
    fn missing_segments_resolve_to_none() {
        let payload = json!({ "quotes": { "USD": { "price": 1.0 } } });
        assert_eq!(resolve(&payload, "quotes.EUR.price"), None);
        assert_eq!(resolve_number(&payload, "quotes.USD"), None);
    }

    #[test]
    fn string_leaves_resolve_as_strings_only() {
        let payload = json!({ "country": { "name": "Chile" } });
        assert_eq!(resolve_string(&payload, "country.name"), Some("Chile"));
        assert_eq!(resolve_number(&payload, "country.name"), None);
    }

    #[test]
    fn top_level_fields_are_sorted() {
        let payload = json!({ "zeta": 1, "alpha": 2 });
        assert_eq!(top_level_fields(&payload), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
