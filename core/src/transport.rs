//! The seam between request assembly and the network.
//!
//! # Design
//! `Transport::execute` performs one blocking exchange on the calling thread.
//! `Err` means the server was never reached; any answer from the server,
//! whatever its status, is `Ok` and left for the caller to classify.
//! Timeouts, proxies and TLS settings belong to the transport, not to the
//! request, so callers configure them on the `ureq::Agent` they hand in.

use ureq::http;

use crate::error::BoxError;
use crate::http::{HttpMethod, RawResponse, WireRequest};

pub trait Transport: Send + Sync {
    fn execute(&self, request: WireRequest) -> Result<RawResponse, BoxError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// An agent that returns 4xx/5xx responses as data rather than `Err`, so
    /// the server's error payload stays readable.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Uses a caller-configured agent. It must not treat HTTP statuses as
    /// errors, or rejected requests will surface as connection failures.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: WireRequest) -> Result<RawResponse, BoxError> {
        let mut builder = http::Request::builder()
            .method(wire_method(request.method))
            .uri(request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = match request.body {
            Some(bytes) => self.agent.run(builder.body(bytes)?)?,
            None => self.agent.run(builder.body(())?)?,
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.into_body().into_reader();

        Ok(RawResponse {
            status,
            headers,
            body: Box::new(body),
        })
    }
}

fn wire_method(method: HttpMethod) -> http::Method {
    match method {
        HttpMethod::Get => http::Method::GET,
        HttpMethod::Post => http::Method::POST,
        HttpMethod::Put => http::Method::PUT,
        HttpMethod::Patch => http::Method::PATCH,
        HttpMethod::Delete => http::Method::DELETE,
    }
}
