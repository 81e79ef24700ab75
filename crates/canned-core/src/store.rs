//! Immutable identifier → canned response mapping
//!
//! The store is parsed once from a JSON document of the form
//!
//! ```json
//! { "ping": { "status": 200, "body": "pong" } }
//! ```
//!
//! and never mutated afterwards, so concurrent lookups need no locking.
//! Statuses that HTTP/1.1 sends without a body (1xx, 204, 304) are refused
//! at load time, since the configured body could never be replayed.
//! Duplicate identifiers in the document resolve to the last occurrence.

use crate::{Error, Response, Result, StatusCode};
use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

/// Entry shape as it appears in the configuration document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    status: u16,
    body: String,
}

/// A status/body pair replayed verbatim for a matching identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    status: StatusCode,
    body: Bytes,
}

impl CannedResponse {
    /// Create a canned response.
    ///
    /// Returns `None` for statuses outside 100-999 and for statuses that
    /// cannot carry a body on the wire (1xx, 204, 304).
    pub fn new(status: u16, body: impl Into<Bytes>) -> Option<Self> {
        let status = StatusCode::from_u16(status).filter(StatusCode::allows_body)?;
        Some(Self {
            status,
            body: body.into(),
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Render as a text/plain response
    pub fn to_response(&self) -> Response {
        Response::text(self.status, self.body.clone())
    }
}

/// Identifier → canned response mapping, read-only after construction
#[derive(Debug, Clone, Default)]
pub struct ConfigurationStore {
    entries: HashMap<String, CannedResponse>,
}

impl ConfigurationStore {
    /// Parse a store from a reader (stdin at startup)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: HashMap<String, RawEntry> =
            serde_json::from_reader(reader).map_err(Error::Config)?;
        Self::from_raw(raw)
    }

    /// Parse a store from bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: HashMap<String, RawEntry> =
            serde_json::from_slice(bytes).map_err(Error::Config)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: HashMap<String, RawEntry>) -> Result<Self> {
        let entries = raw
            .into_iter()
            .map(|(id, entry)| match CannedResponse::new(entry.status, entry.body) {
                Some(canned) => Ok((id, canned)),
                None => Err(Error::InvalidStatus { id, status: entry.status }),
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { entries })
    }

    /// Look up the canned response for an identifier
    #[inline]
    pub fn resolve(&self, id: &str) -> Option<&CannedResponse> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured identifiers, sorted
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl FromStr for ConfigurationStore {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_resolve() {
        let store: ConfigurationStore = r#"{
            "ping": {"status": 200, "body": "pong"},
            "teapot": {"status": 418, "body": ""}
        }"#
        .parse()
        .unwrap();

        assert_eq!(store.len(), 2);
        let ping = store.resolve("ping").unwrap();
        assert_eq!(ping.status().as_u16(), 200);
        assert_eq!(ping.body().as_ref(), b"pong");
        assert_eq!(store.resolve("teapot").unwrap().status().as_u16(), 418);
        assert!(store.resolve("missing").is_none());
        assert_eq!(store.identifiers(), vec!["ping", "teapot"]);
    }

    #[test]
    fn test_empty_document() {
        let store: ConfigurationStore = "{}".parse().unwrap();
        assert!(store.is_empty());
        assert!(store.resolve("").is_none());
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let store: ConfigurationStore = r#"{
            "a": {"status": 200, "body": "first"},
            "a": {"status": 201, "body": "second"}
        }"#
        .parse()
        .unwrap();

        let a = store.resolve("a").unwrap();
        assert_eq!(a.status().as_u16(), 201);
        assert_eq!(a.body().as_ref(), b"second");
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        for doc in [
            "",
            "not json",
            "[]",
            r#"{"a": "pong"}"#,
            r#"{"a": {"status": 200}}"#,
            r#"{"a": {"body": "pong"}}"#,
            r#"{"a": {"status": "200", "body": "pong"}}"#,
            r#"{"a": {"status": 200, "body": 5}}"#,
            r#"{"a": {"status": -1, "body": "x"}}"#,
            r#"{"a": {"status": 200, "body": "x", "headers": {}}}"#,
        ] {
            let err = doc.parse::<ConfigurationStore>().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{doc}: {err}");
        }
    }

    #[test]
    fn test_out_of_range_status_is_rejected() {
        let err = r#"{"a": {"status": 42, "body": "x"}}"#
            .parse::<ConfigurationStore>()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { ref id, status: 42 } if id == "a"));
    }

    #[test]
    fn test_bodiless_statuses_are_rejected() {
        for status in [100, 102, 204, 304] {
            let doc = format!(r#"{{"a": {{"status": {status}, "body": "abc"}}}}"#);
            let err = doc.parse::<ConfigurationStore>().unwrap_err();
            assert!(
                matches!(err, Error::InvalidStatus { status: s, .. } if s == status),
                "{status}: {err}"
            );
        }
    }

    #[test]
    fn test_from_reader() {
        let input = std::io::Cursor::new(br#"{"k": {"status": 503, "body": "down"}}"#.to_vec());
        let store = ConfigurationStore::from_reader(input).unwrap();
        let res = store.resolve("k").unwrap().to_response();
        assert_eq!(res.status.as_u16(), 503);
        assert_eq!(res.header("content-length"), Some("4"));
    }
}
