use once_cell::sync::Lazy;
use regex::Regex;

pub mod result_path;

static REDACTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: ?)([\w\-\.=:/+]+)",
        r"(?i)(x-[\w-]*(key|token): ?)([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD))=([^\s&]+)",
        r"(?i)(api_?key=)([^\s&]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern should compile"))
    .collect()
});

/// Redacts values that look like credentials in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACTION_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::redact_sensitive;

    #[test]
    fn redacts_authorization_headers() {
        let out = redact_sensitive("request failed: Authorization: Bearer-abc123 rejected");
        assert!(!out.contains("abc123"), "got: {out}");
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn redacts_api_key_query_parameters() {
        let out = redact_sensitive("GET https://api.example.com/v1/price?apikey=deadbeef&convert=USD");
        assert!(!out.contains("deadbeef"), "got: {out}");
        assert!(out.contains("convert=USD"));
    }

    #[test]
    fn redacts_provider_key_headers() {
        let out = redact_sensitive("upstream said: X-CMC_PRO_API_KEY: 0123-4567 invalid");
        assert!(!out.contains("0123-4567"), "got: {out}");
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let text = "quorum not met: 1 of 2 required responses succeeded";
        assert_eq!(redact_sensitive(text), text);
    }
}
