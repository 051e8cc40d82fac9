//! Cross-origin resource sharing policy evaluator.
//!
//! The evaluator is written against a single exchange object
//! ([`PolicyExchange`]) with chainable mutators — not against this crate's
//! middleware chain. It reads request headers, decorates the in-flight
//! response, and either hands control onward through a `next` callback or
//! declares the exchange fully handled (preflight). The
//! [`CorsAdapter`](crate::middleware::cors::CorsAdapter) owns the
//! translation between the two models; the evaluator itself stays host
//! agnostic.

use http::{Method, StatusCode};
use thiserror::Error;

/// Policy parameters. Immutable after construction; build once at startup.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins. `"*"` anywhere in the list means any origin.
    pub allowed_origins: Vec<String>,
    /// Methods advertised on preflight.
    pub allowed_methods: Vec<Method>,
    /// Request headers advertised on preflight.
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to cross-origin callers.
    pub exposed_headers: Vec<String>,
    /// Whether credentialed requests are allowed.
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds.
    pub max_age_seconds: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_owned()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::PATCH,
            ],
            allowed_headers: [
                "Origin",
                "X-Requested-With",
                "Content-Type",
                "Accept",
                "Authorization",
                "Range",
            ]
            .map(str::to_owned)
            .to_vec(),
            exposed_headers: [
                "Content-Length",
                "Content-Range",
                "Content-Type",
                "Accept-Ranges",
            ]
            .map(str::to_owned)
            .to_vec(),
            allow_credentials: true,
            max_age_seconds: 86_400,
        }
    }
}

/// A failure raised by policy evaluation.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The request's origin is not in the allowed set.
    #[error("origin not allowed: {0}")]
    OriginDenied(String),
}

impl PolicyError {
    /// The client-facing status this failure encodes.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OriginDenied(_) => StatusCode::FORBIDDEN,
        }
    }
}

/// The minimal surface the evaluator needs from its host.
///
/// One exchange per request. Header reads are case-insensitive; the mutators
/// forward onto the real in-flight response (setting the same header twice
/// replaces, never duplicates) and return `&mut Self` so calls chain the way
/// the evaluator expects. [`finish`](PolicyExchange::finish) marks the
/// exchange fully handled — the host must then emit the recorded status and
/// skip its own downstream work.
pub trait PolicyExchange {
    fn request_header(&self, name: &str) -> Option<String>;
    fn method(&self) -> Method;
    fn url(&self) -> String;
    fn set_status(&mut self, status: StatusCode) -> &mut Self;
    fn set_header(&mut self, name: &str, value: &str) -> &mut Self;
    fn finish(&mut self);
}

/// The CORS policy evaluator.
///
/// Header value strings are precomputed from the config; evaluation
/// allocates only when echoing an explicit origin.
pub struct CorsPolicy {
    config: CorsConfig,
    methods_value: String,
    headers_value: String,
    exposed_value: String,
    max_age_value: String,
}

impl CorsPolicy {
    pub fn new(config: CorsConfig) -> Self {
        let methods_value = config
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let headers_value = config.allowed_headers.join(",");
        let exposed_value = config.exposed_headers.join(",");
        let max_age_value = config.max_age_seconds.to_string();
        Self { config, methods_value, headers_value, exposed_value, max_age_value }
    }

    /// The default policy restricted to `origins`.
    pub fn with_origins(origins: Vec<String>) -> Self {
        Self::new(CorsConfig { allowed_origins: origins, ..CorsConfig::default() })
    }

    /// Evaluates one exchange.
    ///
    /// - No `Origin` header: not a cross-origin request; `next` runs and no
    ///   policy headers are set.
    /// - Disallowed origin: [`PolicyError::OriginDenied`] — the allow-origin
    ///   header is never set for origins outside the policy.
    /// - Allowed origin: policy headers are set on the exchange. Preflight
    ///   (`OPTIONS`) is answered in place — status 204, exchange marked
    ///   handled, `next` **not** called. Any other method continues through
    ///   `next`.
    pub fn evaluate<E: PolicyExchange>(
        &self,
        exchange: &mut E,
        next: &mut dyn FnMut(),
    ) -> Result<(), PolicyError> {
        let origin = match exchange.request_header("origin") {
            Some(origin) => origin,
            None => {
                next();
                return Ok(());
            }
        };

        let resolved = self
            .resolve_origin(&origin)
            .ok_or(PolicyError::OriginDenied(origin))?;
        if resolved != "*" {
            // Caches must not serve one origin's response to another.
            exchange.set_header("vary", "Origin");
        }
        exchange.set_header("access-control-allow-origin", &resolved);
        if self.config.allow_credentials {
            exchange.set_header("access-control-allow-credentials", "true");
        }
        if !self.exposed_value.is_empty() {
            exchange.set_header("access-control-expose-headers", &self.exposed_value);
        }

        if exchange.method() == Method::OPTIONS {
            exchange
                .set_header("access-control-allow-methods", &self.methods_value)
                .set_header("access-control-allow-headers", &self.headers_value)
                .set_header("access-control-max-age", &self.max_age_value)
                .set_status(StatusCode::NO_CONTENT)
                .finish();
            return Ok(());
        }

        next();
        Ok(())
    }

    /// The allow-origin value for `origin`, or `None` if disallowed.
    fn resolve_origin(&self, origin: &str) -> Option<String> {
        if self.config.allowed_origins.iter().any(|o| o == "*") {
            return Some("*".to_owned());
        }
        if self.config.allowed_origins.iter().any(|o| o == origin) {
            return Some(origin.to_owned());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// In-memory exchange standing in for a host shim.
    struct FakeExchange {
        method: Method,
        request_headers: BTreeMap<String, String>,
        response_headers: BTreeMap<String, String>,
        status: Option<StatusCode>,
        handled: bool,
    }

    impl FakeExchange {
        fn new(method: Method, origin: Option<&str>) -> Self {
            let mut request_headers = BTreeMap::new();
            if let Some(origin) = origin {
                request_headers.insert("origin".to_owned(), origin.to_owned());
            }
            Self {
                method,
                request_headers,
                response_headers: BTreeMap::new(),
                status: None,
                handled: false,
            }
        }
    }

    impl PolicyExchange for FakeExchange {
        fn request_header(&self, name: &str) -> Option<String> {
            self.request_headers.get(&name.to_ascii_lowercase()).cloned()
        }

        fn method(&self) -> Method {
            self.method.clone()
        }

        fn url(&self) -> String {
            "/".to_owned()
        }

        fn set_status(&mut self, status: StatusCode) -> &mut Self {
            self.status = Some(status);
            self
        }

        fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
            self.response_headers.insert(name.to_owned(), value.to_owned());
            self
        }

        fn finish(&mut self) {
            self.handled = true;
        }
    }

    fn run(policy: &CorsPolicy, exchange: &mut FakeExchange) -> (Result<(), PolicyError>, bool) {
        let mut continued = false;
        let mut next = || continued = true;
        let result = policy.evaluate(exchange, &mut next);
        (result, continued)
    }

    #[test]
    fn non_cors_request_passes_through_untouched() {
        let policy = CorsPolicy::new(CorsConfig::default());
        let mut ex = FakeExchange::new(Method::GET, None);
        let (result, continued) = run(&policy, &mut ex);
        assert!(result.is_ok());
        assert!(continued);
        assert!(ex.response_headers.is_empty());
        assert!(!ex.handled);
    }

    #[test]
    fn wildcard_config_allows_any_origin() {
        let policy = CorsPolicy::new(CorsConfig::default());
        let mut ex = FakeExchange::new(Method::GET, Some("https://evil.example"));
        let (result, continued) = run(&policy, &mut ex);
        assert!(result.is_ok());
        assert!(continued);
        assert_eq!(ex.response_headers["access-control-allow-origin"], "*");
        assert!(!ex.response_headers.contains_key("vary"));
    }

    #[test]
    fn explicit_origin_is_echoed_with_vary() {
        let policy = CorsPolicy::with_origins(vec!["https://app.example".to_owned()]);
        let mut ex = FakeExchange::new(Method::GET, Some("https://app.example"));
        let (result, continued) = run(&policy, &mut ex);
        assert!(result.is_ok());
        assert!(continued);
        assert_eq!(
            ex.response_headers["access-control-allow-origin"],
            "https://app.example"
        );
        assert_eq!(ex.response_headers["vary"], "Origin");
    }

    #[test]
    fn disallowed_origin_is_denied_without_headers() {
        let policy = CorsPolicy::with_origins(vec!["https://app.example".to_owned()]);
        let mut ex = FakeExchange::new(Method::GET, Some("https://evil.example"));
        let (result, continued) = run(&policy, &mut ex);
        let err = result.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(!continued);
        assert!(!ex.response_headers.contains_key("access-control-allow-origin"));
    }

    #[test]
    fn preflight_is_answered_in_place() {
        let policy = CorsPolicy::new(CorsConfig::default());
        let mut ex = FakeExchange::new(Method::OPTIONS, Some("https://app.example"));
        let (result, continued) = run(&policy, &mut ex);
        assert!(result.is_ok());
        assert!(!continued);
        assert!(ex.handled);
        assert_eq!(ex.status, Some(StatusCode::NO_CONTENT));
        assert_eq!(
            ex.response_headers["access-control-allow-methods"],
            "GET,POST,PUT,DELETE,OPTIONS,PATCH"
        );
        assert_eq!(
            ex.response_headers["access-control-allow-headers"],
            "Origin,X-Requested-With,Content-Type,Accept,Authorization,Range"
        );
        assert_eq!(ex.response_headers["access-control-max-age"], "86400");
        assert_eq!(ex.response_headers["access-control-allow-credentials"], "true");
    }

    #[test]
    fn credentials_header_follows_config() {
        let policy = CorsPolicy::new(CorsConfig {
            allow_credentials: false,
            ..CorsConfig::default()
        });
        let mut ex = FakeExchange::new(Method::GET, Some("https://app.example"));
        let (result, _) = run(&policy, &mut ex);
        assert!(result.is_ok());
        assert!(
            !ex.response_headers
                .contains_key("access-control-allow-credentials")
        );
    }

    #[test]
    fn exposed_headers_are_advertised() {
        let policy = CorsPolicy::new(CorsConfig::default());
        let mut ex = FakeExchange::new(Method::GET, Some("https://app.example"));
        let (result, _) = run(&policy, &mut ex);
        assert!(result.is_ok());
        assert_eq!(
            ex.response_headers["access-control-expose-headers"],
            "Content-Length,Content-Range,Content-Type,Accept-Ranges"
        );
    }
}
