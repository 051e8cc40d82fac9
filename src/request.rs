//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::HeaderMap;
use http::{Method, Uri};
use http_body_util::BodyExt;

use crate::response::ResponseHead;

/// An incoming HTTP request.
///
/// The body is collected up front, so handlers see plain bytes. Each request
/// also carries its [`ResponseHead`] — the in-flight outbound state that
/// middleware decorates before any [`Response`](crate::Response) exists.
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
    head: ResponseHead,
}

impl Request {
    /// Collects a hyper request into an owned `Request`. Fails only if the
    /// transport dies while the body is being read.
    pub(crate) async fn from_hyper(
        req: hyper::Request<hyper::body::Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr: Some(remote_addr),
            head: ResponseHead::default(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup. Values that are not valid UTF-8
    /// return `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The caller's network address, best effort: the first entry of a
    /// proxy-supplied `x-forwarded-for`, else the transport peer address,
    /// else `"unknown"`.
    pub fn remote_address(&self) -> String {
        if let Some(forwarded) = self.header("x-forwarded-for")
            && let Some(first) = forwarded.split(',').next().map(str::trim).filter(|s| !s.is_empty())
        {
            return first.to_owned();
        }
        match self.remote_addr {
            Some(addr) => addr.to_string(),
            None => "unknown".to_owned(),
        }
    }

    /// The in-flight outbound state for this request.
    pub fn response_head(&self) -> &ResponseHead {
        &self.head
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Test constructor: build a request without a transport.
    #[cfg(test)]
    pub(crate) fn test(method: Method, uri: &str, headers: &[(&str, &str)]) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                http::header::HeaderName::try_from(*name).expect("valid test header name"),
                http::header::HeaderValue::try_from(*value).expect("valid test header value"),
            );
        }
        Self {
            method,
            uri: uri.parse().expect("valid test uri"),
            headers: map,
            body: Bytes::new(),
            params: HashMap::new(),
            remote_addr: None,
            head: ResponseHead::default(),
        }
    }
}
