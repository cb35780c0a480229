//! Transport trait and the request/response types it carries
//!
//! Defines the `send` seam shared by every pipeline stage: the terminal HTTP
//! transport, the retry policy, and any middleware layered around them.

use crate::error::{Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// HTTP request specification
///
/// The body is held as [`Bytes`], so cloning a request for another attempt
/// shares the same buffer and every attempt sends identical bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method (GET, PUT, etc.)
    pub method: Method,

    /// Request URL
    pub url: Url,

    /// Request headers
    pub headers: HashMap<String, String>,

    /// Request body (optional)
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a new HTTP request from a URL string
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `url` cannot be parsed
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// Add a header to the request
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether the method only reads (GET or HEAD) and may be served by a replica
    pub fn is_read_only(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Copy this request with its host replaced by `host`.
    ///
    /// `host` may carry a port (`host:port`); without one the original port is
    /// kept. Scheme, path, query and body are unchanged and `self` is not
    /// modified.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `host` is not a valid authority
    pub fn with_host(&self, host: &str) -> Result<Self> {
        let authority = Url::parse(&format!("{}://{}", self.url.scheme(), host))?;
        let invalid = || TransportError::InvalidUrl(format!("invalid host: {}", host));

        let mut url = self.url.clone();
        url.set_host(authority.host_str()).map_err(|_| invalid())?;
        if let Some(port) = authority.port() {
            url.set_port(Some(port)).map_err(|_| invalid())?;
        }

        let mut copy = self.clone();
        copy.url = url;
        Ok(copy)
    }

    /// Host and port the request targets, e.g. `example.net:8080`
    pub fn authority(&self) -> String {
        match (self.url.host_str(), self.url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        }
    }
}

/// HTTP response
///
/// Represents an HTTP response received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Create a response with only a status code
    pub fn from_status(status: u16) -> Self {
        Self::new(status, HashMap::new(), Bytes::new())
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response is an error (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Get the response body as a string
    pub fn text(&self) -> std::result::Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse response body as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the response body cannot be parsed as valid JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// A stage in the request pipeline.
///
/// Implementations either perform the HTTP exchange themselves or forward to
/// a downstream transport. The outcome is a response with any status, or a
/// [`TransportError`] when no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and receive its outcome
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_request() -> HttpRequest {
        HttpRequest::parse(
            Method::GET,
            "https://account.blob.example.net/container/blob.txt?snapshot=1",
        )
        .unwrap()
    }

    #[test]
    fn test_read_only_methods() {
        let mut request = blob_request();
        assert!(request.is_read_only());

        request.method = Method::HEAD;
        assert!(request.is_read_only());

        for method in [Method::PUT, Method::POST, Method::DELETE, Method::PATCH] {
            request.method = method;
            assert!(!request.is_read_only());
        }
    }

    #[test]
    fn test_with_host_swaps_only_host() {
        let original = blob_request()
            .with_header("x-ms-version", "2019-02-02")
            .with_body(b"payload".to_vec());
        let swapped = original
            .with_host("account-secondary.blob.example.net")
            .unwrap();

        assert_eq!(
            swapped.url.as_str(),
            "https://account-secondary.blob.example.net/container/blob.txt?snapshot=1"
        );
        assert_eq!(swapped.headers, original.headers);
        assert_eq!(swapped.body, original.body);
        assert_eq!(original.url.host_str(), Some("account.blob.example.net"));
    }

    #[test]
    fn test_with_host_and_port() {
        let request = HttpRequest::parse(Method::GET, "http://127.0.0.1:10000/c/b").unwrap();
        let swapped = request.with_host("127.0.0.1:10001").unwrap();
        assert_eq!(swapped.url.as_str(), "http://127.0.0.1:10001/c/b");
        assert_eq!(swapped.authority(), "127.0.0.1:10001");
    }

    #[test]
    fn test_with_host_keeps_port_when_absent() {
        let request = HttpRequest::parse(Method::GET, "http://localhost:10000/c/b").unwrap();
        let swapped = request.with_host("replica").unwrap();
        assert_eq!(swapped.url.as_str(), "http://replica:10000/c/b");
    }

    #[test]
    fn test_with_host_invalid() {
        let request = blob_request();
        let err = request.with_host("bad host/with space").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[test]
    fn test_parse_invalid_url() {
        let err = HttpRequest::parse(Method::GET, "::not-a-url").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[test]
    fn test_response_helpers() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let response = HttpResponse::new(200, headers, r#"{"name":"blob"}"#);

        assert!(response.is_success());
        assert!(!response.is_error());
        assert_eq!(response.get_header("content-type"), Some("application/json"));

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["name"], "blob");

        assert!(HttpResponse::from_status(503).is_error());
    }
}
