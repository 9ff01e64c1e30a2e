//! Entry point for talking to the API.
//!
//! # Design
//! `ApiClient` holds what every request needs and nothing per-request: the
//! configuration, the transport and the token provider. Cloning it is cheap
//! and clones share the transport and provider, so one client can be handed
//! to many threads. Each call to `request` starts an independent `Request`.

use std::fmt;
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::request::Request;
use crate::token::TokenProvider;
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// A client that talks HTTP through `ureq`.
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_transport(config, Arc::new(UreqTransport::new()), tokens)
    }

    pub fn with_transport(
        config: ApiConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            transport,
            tokens,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub(crate) fn tokens(&self) -> Arc<dyn TokenProvider> {
        Arc::clone(&self.tokens)
    }

    /// Starts a request to `address`, a path relative to the environment's
    /// base URL.
    pub fn request(&self, method: HttpMethod, address: &str) -> Result<Request, ApiError> {
        Request::new(self, method, address)
    }

    pub fn get(&self, address: &str) -> Result<Request, ApiError> {
        self.request(HttpMethod::Get, address)
    }

    pub fn post(&self, address: &str) -> Result<Request, ApiError> {
        self.request(HttpMethod::Post, address)
    }

    pub fn put(&self, address: &str) -> Result<Request, ApiError> {
        self.request(HttpMethod::Put, address)
    }

    pub fn patch(&self, address: &str) -> Result<Request, ApiError> {
        self.request(HttpMethod::Patch, address)
    }

    pub fn delete(&self, address: &str) -> Result<Request, ApiError> {
        self.request(HttpMethod::Delete, address)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
