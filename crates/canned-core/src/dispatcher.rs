//! Request dispatcher
//!
//! Turns one buffered request into exactly one response. Each step that can
//! fail returns a distinct [`Error`] so the cause can be logged and tested,
//! but every failure is answered with the same `400 invalid request`.

use crate::{CannedResponse, ConfigurationStore, Error, Method, Request, Response, Result};
use serde_json::Value;

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Resolves requests against a preloaded [`ConfigurationStore`]
#[derive(Debug)]
pub struct Dispatcher {
    store: ConfigurationStore,
    max_body_size: usize,
}

impl Dispatcher {
    pub fn new(store: ConfigurationStore) -> Self {
        Self {
            store,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Set the largest accepted Content-Length
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn body_limit(&self) -> usize {
        self.max_body_size
    }

    /// Produce the response for a request
    pub fn dispatch(&self, req: &Request) -> Response {
        if req.method != Method::Post {
            tracing::debug!(method = %req.method, path = %req.path, "unsupported method");
            return Response::unsupported_method();
        }

        match self.resolve(req) {
            Ok(canned) => canned.to_response(),
            Err(err) => {
                tracing::debug!(path = %req.path, error = %err, "rejecting request");
                Response::invalid_request()
            }
        }
    }

    /// Find the canned response a POST request selects
    pub fn resolve(&self, req: &Request) -> Result<&CannedResponse> {
        let declared = req.content_length()?;
        if declared > self.max_body_size {
            return Err(Error::BodyTooLarge {
                size: declared,
                limit: self.max_body_size,
            });
        }
        if req.body.len() != declared {
            return Err(Error::BodyLengthMismatch {
                declared,
                actual: req.body.len(),
            });
        }

        let id = extract_id(&req.body)?;
        self.store
            .resolve(&id)
            .ok_or(Error::UnknownId(id))
    }
}

/// Pull the string `id` field out of a JSON document
///
/// Non-string ids never match: configuration keys are always strings.
pub fn extract_id(body: &[u8]) -> Result<String> {
    let doc: Value = serde_json::from_slice(body).map_err(Error::MalformedBody)?;
    match doc.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        _ => Err(Error::MissingId),
    }
}
