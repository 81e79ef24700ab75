//! HTTP Response types
//!
//! Every response leaves the server as `text/plain` with an explicit
//! `content-length` equal to the body's byte length.

use bytes::Bytes;
use smallvec::SmallVec;

/// Body sent for every rejected request
pub const INVALID_REQUEST_BODY: &str = "invalid request";

/// Body sent for methods other than POST
pub const UNSUPPORTED_METHOD_BODY: &str = "unsupported method";

/// Content type of every response
pub const TEXT_PLAIN: &str = "text/plain";

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// Build a status code, rejecting values outside the three-digit range
    pub fn from_u16(code: u16) -> Option<Self> {
        (100..1000).contains(&code).then_some(StatusCode(code))
    }

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether a response with this status may carry a body.
    ///
    /// Informational (1xx), 204 and 304 responses are sent without one.
    pub fn allows_body(&self) -> bool {
        !matches!(self.0, 100..=199 | 204 | 304)
    }
}

/// HTTP Response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 4]>,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create an empty response
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: SmallVec::new(),
            body: Bytes::new(),
        }
    }

    /// Create a plain text response with content-type and content-length set
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        ResponseBuilder::new(status)
            .header("content-type", TEXT_PLAIN)
            .header("content-length", body.len().to_string())
            .body(body)
            .build()
    }

    /// The uniform 400 response for any rejected request
    pub fn invalid_request() -> Self {
        Self::text(StatusCode::BAD_REQUEST, INVALID_REQUEST_BODY)
    }

    /// 501 response for methods the server does not handle
    pub fn unsupported_method() -> Self {
        Self::text(StatusCode::NOT_IMPLEMENTED, UNSUPPORTED_METHOD_BODY)
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get body as string (if UTF-8)
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(|s| s.to_string())
    }
}

/// Builder for constructing responses
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Create a new builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = body.into();
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        assert_eq!(StatusCode::from_u16(99), None);
        assert_eq!(StatusCode::from_u16(1000), None);
        assert_eq!(StatusCode::from_u16(299).map(|s| s.as_u16()), Some(299));
    }

    #[test]
    fn test_allows_body() {
        for code in [100, 102, 199, 204, 304] {
            assert!(!StatusCode::from_u16(code).unwrap().allows_body(), "{code}");
        }
        for code in [200, 205, 299, 303, 418, 999] {
            assert!(StatusCode::from_u16(code).unwrap().allows_body(), "{code}");
        }
    }

    #[test]
    fn test_text_response_headers() {
        let res = Response::text(StatusCode::OK, "héllo");
        assert_eq!(res.header("content-type"), Some("text/plain"));
        // byte length, not character count
        assert_eq!(res.header("Content-Length"), Some("6"));
    }

    #[test]
    fn test_invalid_request() {
        let res = Response::invalid_request();
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body_string().as_deref(), Some("invalid request"));
        assert_eq!(res.header("content-length"), Some("15"));
    }
}
