//! Sensitive-header redaction for log output.
//!
//! Credentials and session tokens must never appear in plaintext logs.
//! [`filter`] produces a display copy of a request's headers with sensitive
//! values masked; the originals are untouched.

use std::collections::BTreeMap;

use http::header::HeaderMap;

/// Replacement string used for all masked values.
pub const REDACTED: &str = "[REDACTED]";

/// Header names that are always masked, matched case-insensitively.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Returns a redacted display copy of `headers`.
///
/// Sensitive values become [`REDACTED`]; multi-valued headers join into one
/// comma-delimited string; values that are not valid UTF-8 render as the
/// empty string. Pure function — re-filtering already-filtered output is a
/// no-op.
pub fn filter(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        let key = name.as_str().to_owned();
        let value = if SENSITIVE_HEADERS.contains(&key.as_str()) {
            REDACTED.to_owned()
        } else {
            headers
                .get_all(name)
                .iter()
                .map(|v| v.to_str().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.insert(key, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::try_from(*name).unwrap(),
                HeaderValue::try_from(*value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn masks_sensitive_headers() {
        let filtered = filter(&headers(&[
            ("Authorization", "Bearer secret-token"),
            ("Cookie", "session=abc"),
            ("Set-Cookie", "session=abc; HttpOnly"),
            ("content-type", "application/json"),
        ]));
        assert_eq!(filtered["authorization"], REDACTED);
        assert_eq!(filtered["cookie"], REDACTED);
        assert_eq!(filtered["set-cookie"], REDACTED);
        assert_eq!(filtered["content-type"], "application/json");
    }

    #[test]
    fn preserves_other_values_unchanged() {
        let filtered = filter(&headers(&[("accept", "text/html"), ("x-custom", "42")]));
        assert_eq!(filtered["accept"], "text/html");
        assert_eq!(filtered["x-custom"], "42");
    }

    #[test]
    fn joins_multi_valued_headers() {
        let filtered = filter(&headers(&[
            ("accept-encoding", "gzip"),
            ("accept-encoding", "br"),
        ]));
        assert_eq!(filtered["accept-encoding"], "gzip, br");
    }

    #[test]
    fn non_utf8_values_become_empty() {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static("x-opaque"),
            HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );
        let filtered = filter(&map);
        assert_eq!(filtered["x-opaque"], "");
    }

    #[test]
    fn refiltering_is_a_noop() {
        let first = filter(&headers(&[
            ("authorization", "Bearer secret"),
            ("accept", "*/*"),
        ]));
        let rebuilt = headers(
            &first
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect::<Vec<_>>(),
        );
        let second = filter(&rebuilt);
        assert_eq!(first, second);
    }
}
