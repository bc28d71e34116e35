// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook verification: the subscription handshake and payload signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Answers the `GET` subscription handshake.
///
/// Returns the challenge to echo when `hub.mode` is `subscribe` and
/// `hub.verify_token` matches the configured token. An unset or empty
/// configured token never matches.
pub fn subscription_challenge(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected: Option<&str>,
) -> Option<String> {
    let expected = expected.filter(|t| !t.is_empty())?;
    if mode != Some("subscribe") || token != Some(expected) {
        return None;
    }
    challenge.map(str::to_string)
}

/// Verifies an `X-Hub-Signature-256` header against the raw body.
///
/// The header has the form `sha256=<hex digest>`. An empty app secret
/// disables the check.
pub fn verify_signature(app_secret: &str, signature_header: Option<&str>, body: &[u8]) -> bool {
    if app_secret.is_empty() {
        return true;
    }
    let signature = signature_header.unwrap_or("").trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature).trim();
    if signature.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Computes the header value Meta would send for `body`.
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(body);
            format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
        }
        // HMAC accepts keys of any length.
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_echoes_challenge_on_match() {
        assert_eq!(
            subscription_challenge(Some("subscribe"), Some("tok"), Some("1158201444"), Some("tok")),
            Some("1158201444".to_string())
        );
    }

    #[test]
    fn handshake_rejects_wrong_token_or_mode() {
        assert_eq!(
            subscription_challenge(Some("subscribe"), Some("nope"), Some("c"), Some("tok")),
            None
        );
        assert_eq!(
            subscription_challenge(Some("unsubscribe"), Some("tok"), Some("c"), Some("tok")),
            None
        );
        assert_eq!(subscription_challenge(None, None, Some("c"), Some("tok")), None);
    }

    #[test]
    fn handshake_never_matches_unset_token() {
        assert_eq!(
            subscription_challenge(Some("subscribe"), Some(""), Some("c"), Some("")),
            None
        );
        assert_eq!(
            subscription_challenge(Some("subscribe"), Some("x"), Some("c"), None),
            None
        );
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign("app-secret", body);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature("app-secret", Some(&header), body));
    }

    #[test]
    fn tampered_body_or_wrong_secret_is_rejected() {
        let body = b"payload";
        let header = sign("app-secret", body);
        assert!(!verify_signature("app-secret", Some(&header), b"payload!"));
        assert!(!verify_signature("other", Some(&header), body));
    }

    #[test]
    fn missing_or_garbage_header_is_rejected() {
        assert!(!verify_signature("s", None, b"x"));
        assert!(!verify_signature("s", Some("sha256="), b"x"));
        assert!(!verify_signature("s", Some("sha256=zz"), b"x"));
    }

    #[test]
    fn empty_secret_skips_check() {
        assert!(verify_signature("", None, b"anything"));
    }
}
