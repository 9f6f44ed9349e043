// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook request signatures.
//!
//! The transport signs each delivery with HMAC-SHA1 over the externally
//! visible URL followed by every form parameter's key and value
//! concatenated in key-sorted order, base64-encoded into the
//! `X-Twilio-Signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Compute the expected signature for a request.
///
/// `params` must be iterable in key-sorted order; a `BTreeMap` qualifies.
pub fn compute<'a>(
    auth_token: &str,
    url: &str,
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut canonical = String::from(url);
    for (key, value) in params {
        canonical.push_str(key);
        canonical.push_str(value);
    }

    // HMAC accepts keys of any length; new_from_slice cannot fail for SHA-1.
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA1 accepts any key length"));
    mac.update(canonical.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify a provided signature in constant time.
pub fn validate<'a>(
    auth_token: &str,
    url: &str,
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
    provided: &str,
) -> bool {
    let Ok(provided_raw) = BASE64.decode(provided) else {
        return false;
    };

    let mut canonical = String::from(url);
    for (key, value) in params {
        canonical.push_str(key);
        canonical.push_str(value);
    }

    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA1 accepts any key length"));
    mac.update(canonical.as_bytes());
    // verify_slice is the constant-time comparison.
    mac.verify_slice(&provided_raw).is_ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn sample_params() -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("Body", "Oi"),
            ("From", "whatsapp:+5511987654321"),
            ("MessageSid", "SM0123456789abcdef0123456789abcdef"),
            ("NumMedia", "0"),
            ("To", "whatsapp:+5511912345678"),
        ])
    }

    #[test]
    fn computed_signature_validates() {
        let url = "https://concierge.example/webhook";
        let sig = compute("secret-token", url, sample_params().iter().map(|(k, v)| (*k, *v)));
        assert!(validate(
            "secret-token",
            url,
            sample_params().iter().map(|(k, v)| (*k, *v)),
            &sig
        ));
    }

    #[test]
    fn wrong_token_fails() {
        let url = "https://concierge.example/webhook";
        let sig = compute("secret-token", url, sample_params().iter().map(|(k, v)| (*k, *v)));
        assert!(!validate(
            "other-token",
            url,
            sample_params().iter().map(|(k, v)| (*k, *v)),
            &sig
        ));
    }

    #[test]
    fn tampered_param_fails() {
        let url = "https://concierge.example/webhook";
        let sig = compute("secret-token", url, sample_params().iter().map(|(k, v)| (*k, *v)));

        let mut tampered = sample_params();
        tampered.insert("Body", "transferir R$1000");
        assert!(!validate(
            "secret-token",
            url,
            tampered.iter().map(|(k, v)| (*k, *v)),
            &sig
        ));
    }

    #[test]
    fn non_base64_signature_fails_cleanly() {
        assert!(!validate(
            "secret-token",
            "https://concierge.example/webhook",
            sample_params().iter().map(|(k, v)| (*k, *v)),
            "%%%not-base64%%%"
        ));
    }

    #[test]
    fn param_order_is_canonicalized_by_caller() {
        // Same params always produce the same canonical string because the
        // caller hands them over sorted; this pins the expected digest shape.
        let url = "https://concierge.example/webhook";
        let a = compute("t", url, sample_params().iter().map(|(k, v)| (*k, *v)));
        let b = compute("t", url, sample_params().iter().map(|(k, v)| (*k, *v)));
        assert_eq!(a, b);
    }
}
