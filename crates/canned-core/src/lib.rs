//! canned-core: stub HTTP server core
//!
//! Replays canned responses selected by the `id` field of a POSTed JSON body.
//!
//! ## Pieces
//! - [`ConfigurationStore`] - identifier → [`CannedResponse`], parsed once, read-only
//! - [`Dispatcher`] - one request in, one response out
//! - [`Server`] - hyper listener feeding the dispatcher
//!
//! ## Example
//! ```
//! use canned_core::{ConfigurationStore, Dispatcher, RequestBuilder};
//!
//! let store: ConfigurationStore = r#"{"ping": {"status": 200, "body": "pong"}}"#.parse().unwrap();
//! let dispatcher = Dispatcher::new(store);
//!
//! let res = dispatcher.dispatch(&RequestBuilder::post_json(r#"{"id": "ping"}"#).build());
//! assert_eq!(res.status.as_u16(), 200);
//! assert_eq!(res.body_string().as_deref(), Some("pong"));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod error;
pub mod request;
pub mod response;
pub mod server;
pub mod store;

// Re-exports
pub use dispatcher::{extract_id, Dispatcher};
pub use error::{Error, Result};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use server::{
    create_optimized_socket, from_hyper_request, to_hyper_response, ConnectionTracker, Server,
    ServerConfig,
};
pub use store::{CannedResponse, ConfigurationStore};
