//! Blocking client core for the WildFyre HTTP+JSON API.
//!
//! # Overview
//! Builds requests against a configured server, sends them, and turns the
//! answer into a JSON value or a typed failure.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wildfyre_core::{ApiClient, ApiConfig, Environment, SharedToken};
//!
//! let tokens = Arc::new(SharedToken::new("secret"));
//! let client = ApiClient::new(ApiConfig::new(Environment::Production), tokens);
//! let me = client.get("/users/")?.authenticated().get_json()?;
//! # Ok::<(), wildfyre_core::ApiError>(())
//! ```
//!
//! # Design
//! - `ApiClient` carries configuration, transport and token provider; each
//!   `Request` it creates is an owned builder consumed by one dispatch.
//! - Request bodies are an explicit `Body` variant (empty, JSON, multipart).
//! - The network sits behind the `Transport` trait; `UreqTransport` is the
//!   default. Everything up to the transport is plain data.
//! - Failures split into `ApiError::CantConnect` (server never reached) and
//!   `ApiError::Transfer` (server reached, exchange failed).

pub mod body;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod request;
pub mod token;
pub mod transport;

pub use body::{Body, Boundary, EncodedBody, FilePart};
pub use client::ApiClient;
pub use config::{ApiConfig, Environment, MultipartFields};
pub use decode::decode_json;
pub use error::{ApiError, BoxError, ConfigError, TransferIssue};
pub use http::{Headers, HttpMethod, RawResponse, WireRequest};
pub use request::{Exchange, Request};
pub use token::{NoToken, SharedToken, TokenProvider};
pub use transport::{Transport, UreqTransport};
