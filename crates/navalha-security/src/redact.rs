// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PII and secret redaction for log output and error messages.
//!
//! Two complementary mechanisms:
//! 1. **Regex-based**: Catches phone numbers and known credential formats.
//! 2. **Exact-match**: Catches secret values loaded at runtime (auth tokens,
//!    API keys) regardless of shape.
//!
//! Phone numbers keep their last four digits so an operator can still
//! correlate log lines with a conversation.

use std::io::Write;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;

/// Phone-shaped values: transport-prefixed or bare E.164.
static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // whatsapp:+5511987654321 (optionally with formatting stripped already)
        Regex::new(r"whatsapp:\+?\d{8,15}").unwrap(),
        // Bare international numbers: +5511987654321
        Regex::new(r"\+\d{8,15}").unwrap(),
    ]
});

/// Known credential formats to redact fully.
static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Anthropic API keys: sk-ant-api03-...
        Regex::new(r"sk-ant-[a-zA-Z0-9_\-]{20,}").unwrap(),
        // Generic secret keys: sk-...
        Regex::new(r"sk-[a-zA-Z0-9]{20,}").unwrap(),
        // Bearer tokens in headers
        Regex::new(r"Bearer\s+[a-zA-Z0-9._\-]{10,}").unwrap(),
        // Twilio account SIDs
        Regex::new(r"AC[0-9a-fA-F]{32}").unwrap(),
    ]
});

/// The redaction placeholder for secrets.
const REDACTED: &str = "[REDACTED]";

/// Redact a single phone value, keeping the last four digits.
pub fn redact_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return REDACTED.to_string();
    }
    format!("[PHONE:…{}]", &digits[digits.len() - 4..])
}

/// Redact phones and secrets from a string.
///
/// `secret_values` are exact runtime secrets (auth tokens, API keys) that
/// must never appear in output whatever their shape.
pub fn redact(input: &str, secret_values: &[String]) -> String {
    let mut result = input.to_string();

    for pattern in PHONE_PATTERNS.iter() {
        result = pattern
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                redact_phone(&caps[0])
            })
            .to_string();
    }

    for pattern in SECRET_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).to_string();
    }

    // Apply exact-match values (longest first to avoid partial matches).
    let mut sorted_values: Vec<&String> = secret_values.iter().collect();
    sorted_values.sort_by_key(|v| std::cmp::Reverse(v.len()));
    for value in sorted_values {
        if !value.is_empty() {
            result = result.replace(value.as_str(), REDACTED);
        }
    }

    result
}

/// A writer wrapper that redacts phones and secrets from output.
///
/// Wraps any `Write` implementor, typically the tracing subscriber's
/// destination.
pub struct RedactingWriter<W> {
    inner: W,
    secret_values: Arc<RwLock<Vec<String>>>,
}

impl<W: Write> RedactingWriter<W> {
    /// Create a new redacting writer.
    pub fn new(inner: W, secret_values: Arc<RwLock<Vec<String>>>) -> Self {
        Self {
            inner,
            secret_values,
        }
    }
}

/// Add a runtime secret to a shared redaction list.
pub fn add_secret_value(secret_values: &Arc<RwLock<Vec<String>>>, value: String) {
    if let Ok(mut values) = secret_values.write()
        && !values.contains(&value)
    {
        values.push(value);
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let secrets = self
            .secret_values
            .read()
            .map(|v| v.clone())
            .unwrap_or_default();
        let redacted = redact(&input, &secrets);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_whatsapp_number_keeping_last_four() {
        let input = "inbound from whatsapp:+5511987654321 accepted";
        let result = redact(input, &[]);
        assert!(!result.contains("5511987654321"));
        assert!(result.contains("[PHONE:…4321]"));
    }

    #[test]
    fn redacts_bare_e164_number() {
        let input = "customer +5511987654321 rate-limited";
        let result = redact(input, &[]);
        assert!(!result.contains("+5511987654321"));
        assert!(result.contains("…4321"));
    }

    #[test]
    fn redacts_anthropic_api_key() {
        let input = "Using key sk-ant-REDACTED for request";
        let result = redact(input, &[]);
        assert!(result.contains(REDACTED));
        assert!(!result.contains("sk-ant-api03"));
    }

    #[test]
    fn redacts_account_sid() {
        let input = "send as AC0123456789abcdef0123456789abcdef failed";
        let result = redact(input, &[]);
        assert!(!result.contains("AC0123456789abcdef"));
    }

    #[test]
    fn redacts_exact_secret_values() {
        let secrets = vec!["my-auth-token-123".to_string()];
        let input = "signature check with my-auth-token-123 failed";
        let result = redact(input, &secrets);
        assert_eq!(result, "signature check with [REDACTED] failed");
    }

    #[test]
    fn passes_through_non_sensitive_text() {
        let input = "job 42 completed in 350ms";
        assert_eq!(redact(input, &[]), input);
    }

    #[test]
    fn redact_phone_short_values_fully() {
        assert_eq!(redact_phone("123"), REDACTED);
    }

    #[test]
    fn writer_redacts_in_stream() {
        let secrets = Arc::new(RwLock::new(vec!["tok-secret".to_string()]));
        let mut out = Vec::new();
        {
            let mut writer = RedactingWriter::new(&mut out, secrets);
            writer
                .write_all(b"auth tok-secret for whatsapp:+5511987654321")
                .unwrap();
        }
        let written = String::from_utf8(out).unwrap();
        assert!(!written.contains("tok-secret"));
        assert!(!written.contains("5511987654321"));
    }
}
