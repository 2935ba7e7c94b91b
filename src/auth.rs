//! Webhook token authentication.
//!
//! GitLab sends the shared secret verbatim in `X-Gitlab-Token`. The check
//! compares it with the reference secret in constant time with respect to
//! the secret's content: every byte is inspected regardless of where the
//! first mismatch is.

use http::HeaderMap;

use crate::constants::TOKEN_HEADER;
use crate::secrets::SecretToken;

/// Constant-time byte comparison.
///
/// Returns `false` immediately on a length mismatch; for equal lengths the
/// running time does not depend on the position of the first differing
/// byte.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::auth::constant_time_eq;
///
/// assert!(constant_time_eq(b"token", b"token"));
/// assert!(!constant_time_eq(b"token", b"tokem"));
/// assert!(!constant_time_eq(b"token", b"token2"));
/// ```
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Reads the presented token. A missing or non-ASCII header reads as empty.
pub fn presented_token(headers: &HeaderMap) -> &str {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Checks the request's token header against the reference secret.
///
/// An empty reference secret never authenticates anything.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::auth::authenticate;
/// use ci_task_dispatcher::secrets::SecretToken;
/// use http::HeaderMap;
///
/// let secret = SecretToken::new("s3cr3t");
/// let mut headers = HeaderMap::new();
/// assert!(!authenticate(&headers, &secret));
///
/// headers.insert("x-gitlab-token", "s3cr3t".parse().unwrap());
/// assert!(authenticate(&headers, &secret));
/// ```
pub fn authenticate(headers: &HeaderMap, secret: &SecretToken) -> bool {
    if secret.is_empty() {
        return false;
    }
    constant_time_eq(presented_token(headers).as_bytes(), secret.expose().as_bytes())
}
