//! WeChat callback signature verification.
//!
//! WeChat signs every callback URL with `signature = sha1(sort(token, timestamp, nonce))`.
//! Reference: https://developers.weixin.qq.com/doc/offiaccount/Basic_Information/Access_Overview.html

use sha1::{Digest, Sha1};
use tracing::warn;

/// Verify a WeChat callback signature.
///
/// WeChat appends three query parameters used for verification:
/// - timestamp: Unix epoch seconds chosen by the platform
/// - nonce: a random string
/// - signature: SHA-1 hex digest of the sorted token, timestamp and nonce
///
/// # Arguments
///
/// * `token` - The shared token configured in the WeChat console
/// * `signature` - The 'signature' query parameter
/// * `timestamp` - The 'timestamp' query parameter
/// * `nonce` - The 'nonce' query parameter
///
/// # Returns
///
/// `true` only if every field is present and the digest matches exactly.
pub fn verify_wechat_signature(token: &str, signature: &str, timestamp: &str, nonce: &str) -> bool {
    if token.is_empty() || signature.is_empty() || timestamp.is_empty() || nonce.is_empty() {
        warn!(
            has_token = !token.is_empty(),
            has_signature = !signature.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            has_nonce = !nonce.is_empty(),
            "wechat_signature_missing_fields"
        );
        return false;
    }

    let expected_signature = compute_signature(token, timestamp, nonce);

    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "wechat_signature_mismatch"
        );
    }

    valid
}

/// Compute the lowercase hex signature WeChat expects for a token, timestamp and nonce.
///
/// The three strings are sorted byte-wise and concatenated with no separator.
pub fn compute_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();

    let mut sha = Sha1::new();
    for part in parts {
        sha.update(part.as_bytes());
    }
    hex::encode(sha.finalize())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check if a usable WeChat token is configured.
pub fn is_token_configured(token: &Option<String>) -> bool {
    token
        .as_ref()
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_signature_known_vector() {
        // sorted: "123", "456", "abc" -> sha1("123456abc")
        assert_eq!(
            compute_signature("abc", "123", "456"),
            "a172ffc990129fe6f68b50f6037c54a1894ee3fd"
        );
    }

    #[test]
    fn test_compute_signature_is_order_independent() {
        // sorted: "1700000000", "nonce42", "token"
        let expected = "ae5f231eabeb11068a9cc21ea5770c067de58d33";
        assert_eq!(compute_signature("token", "1700000000", "nonce42"), expected);
        assert_eq!(compute_signature("token", "nonce42", "1700000000"), expected);
    }

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_wechat_signature("", "sig", "123", "456"));
        assert!(!verify_wechat_signature("abc", "", "123", "456"));
        assert!(!verify_wechat_signature("abc", "sig", "", "456"));
        assert!(!verify_wechat_signature("abc", "sig", "123", ""));
    }

    #[test]
    fn test_verify_signature_valid() {
        assert!(verify_wechat_signature(
            "abc",
            "a172ffc990129fe6f68b50f6037c54a1894ee3fd",
            "123",
            "456"
        ));
    }

    #[test]
    fn test_verify_signature_mismatch() {
        // Uppercase hex is not accepted
        assert!(!verify_wechat_signature(
            "abc",
            "A172FFC990129FE6F68B50F6037C54A1894EE3FD",
            "123",
            "456"
        ));
        assert!(!verify_wechat_signature(
            "abc",
            "a172ffc990129fe6f68b50f6037c54a1894ee3fe",
            "123",
            "456"
        ));
        assert!(!verify_wechat_signature("wrong", "a172ffc990129fe6f68b50f6037c54a1894ee3fd", "123", "456"));
        assert!(!verify_wechat_signature("abc", "a172ff", "123", "456"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_token_configured() {
        assert!(!is_token_configured(&None));
        assert!(!is_token_configured(&Some("".to_string())));
        assert!(!is_token_configured(&Some("   ".to_string())));
        assert!(is_token_configured(&Some("token123".to_string())));
    }
}
