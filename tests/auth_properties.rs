//! Property tests for webhook token authentication.
//!
//! The constant-time comparison must agree with plain equality for every
//! pair of inputs, equal-length or not. Timing itself is not measurable
//! here; these properties pin down the behaviour.

use ci_task_dispatcher::auth::{authenticate, constant_time_eq};
use ci_task_dispatcher::secrets::SecretToken;
use http::{HeaderMap, HeaderValue};
use proptest::prelude::*;

/// Tokens GitLab accepts: visible ASCII, so they survive as header values.
fn token() -> impl Strategy<Value = String> {
    "[!-~]{1,64}"
}

fn headers_with(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-gitlab-token", HeaderValue::from_str(token).unwrap());
    headers
}

proptest! {
    #[test]
    fn constant_time_eq_matches_equality(a in proptest::collection::vec(any::<u8>(), 0..48),
                                         b in proptest::collection::vec(any::<u8>(), 0..48)) {
        prop_assert_eq!(constant_time_eq(&a, &b), a == b);
    }

    #[test]
    fn constant_time_eq_equal_length_inputs(a in proptest::collection::vec(any::<u8>(), 16),
                                            b in proptest::collection::vec(any::<u8>(), 16)) {
        prop_assert_eq!(constant_time_eq(&a, &b), a == b);
    }
}

proptest! {
    #[test]
    fn exact_token_authenticates(secret in token()) {
        prop_assert!(authenticate(&headers_with(&secret), &SecretToken::new(secret.clone())));
    }

    #[test]
    fn single_character_change_is_rejected(secret in token(), index in any::<prop::sample::Index>()) {
        let i = index.index(secret.len());
        let mut bytes = secret.clone().into_bytes();
        // Stay within visible ASCII while guaranteeing a different byte.
        bytes[i] = if bytes[i] == b'~' { b'!' } else { bytes[i] + 1 };
        let presented = String::from_utf8(bytes).unwrap();

        prop_assert!(!authenticate(&headers_with(&presented), &SecretToken::new(secret)));
    }

    #[test]
    fn prefixes_and_extensions_are_rejected(secret in token(), extra in token()) {
        let longer = format!("{secret}{extra}");
        let shorter = &secret[..secret.len() - 1];
        let reference = SecretToken::new(secret.clone());

        prop_assert!(!authenticate(&headers_with(&longer), &reference));
        prop_assert!(!authenticate(&headers_with(shorter), &reference));
    }

    #[test]
    fn missing_header_is_rejected(secret in token()) {
        prop_assert!(!authenticate(&HeaderMap::new(), &SecretToken::new(secret)));
    }
}
