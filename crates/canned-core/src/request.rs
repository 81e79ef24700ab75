//! HTTP Request types

use crate::{Error, Result};
use smallvec::SmallVec;

/// Request method as far as dispatch cares: POST or anything else
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Post,
    /// Any other token, kept verbatim for logging
    Other(String),
}

impl Method {
    /// Parse a method token. Methods are case-sensitive, so `post` is not POST.
    pub fn parse(s: &str) -> Self {
        match s {
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Post => "POST",
            Method::Other(token) => token,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming HTTP request, fully buffered
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Request headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 16]>,
    /// Request body
    pub body: bytes::Bytes,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared body length.
    ///
    /// Fails when the header is absent or not an unsigned integer.
    pub fn content_length(&self) -> Result<usize> {
        let value = self
            .header("content-length")
            .ok_or(Error::MissingContentLength)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidContentLength(value.to_string()))
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    /// POST to `/` with `body` and a matching Content-Length header
    pub fn post_json(body: impl Into<bytes::Bytes>) -> Self {
        let body = body.into();
        Self::new(Method::Post, "/")
            .header("content-length", body.len().to_string())
            .body(body)
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("POST"), Method::Post);
        assert_eq!(Method::parse("post"), Method::Other("post".to_string()));
        assert_eq!(Method::parse("GET").to_string(), "GET");
    }

    #[test]
    fn test_request_header() {
        let req = RequestBuilder::new(Method::parse("GET"), "/")
            .header("Content-Type", "application/json")
            .build();

        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_content_length() {
        let req = RequestBuilder::post_json(r#"{"id":"ping"}"#).build();
        assert_eq!(req.content_length().unwrap(), 13);

        let missing = RequestBuilder::new(Method::Post, "/").build();
        assert!(matches!(missing.content_length(), Err(Error::MissingContentLength)));

        let invalid = RequestBuilder::new(Method::Post, "/")
            .header("Content-Length", "ten")
            .build();
        assert!(matches!(invalid.content_length(), Err(Error::InvalidContentLength(v)) if v == "ten"));
    }
}
