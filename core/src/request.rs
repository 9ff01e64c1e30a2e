//! Building, sending and classifying a single API request.
//!
//! # Design
//! A `Request` is an owned builder: every configuration method takes `self`
//! and hands it back, and `send` consumes it, so one request is dispatched at
//! most once and two requests never share a header map.
//!
//! Dispatch is a single blocking exchange on the calling thread:
//! 1. `assemble` turns the builder into a `WireRequest`, framing the body
//!    according to its `Body` variant and setting `Content-Type` to match.
//! 2. Headers that cannot be written are refused with
//!    `ApiError::InvalidHeader`; nothing is sent.
//! 3. The `Transport` executes it. Failing to reach the server at all is
//!    `ApiError::CantConnect`.
//! 4. `Exchange::into_body` classifies the answer: a 2xx status yields the
//!    response stream, anything else drains the error stream into
//!    `TransferIssue::Rejected`.

use std::fmt;
use std::io::Read;
use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::body::{Body, Boundary, FilePart};
use crate::client::ApiClient;
use crate::config::MultipartFields;
use crate::decode::decode_json;
use crate::error::{ApiError, TransferIssue};
use crate::http::{Headers, HttpMethod, RawResponse, WireRequest};
use crate::token::TokenProvider;
use crate::transport::Transport;

pub struct Request {
    method: HttpMethod,
    url: Url,
    headers: Headers,
    body: Body,
    fields: MultipartFields,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
}

impl Request {
    /// Resolves `address` against the client's base URL and sets the `From`
    /// and `Host` headers.
    pub(crate) fn new(client: &ApiClient, method: HttpMethod, address: &str) -> Result<Self, ApiError> {
        let config = client.config();
        let (url, host) = resolve(&config.environment.base_url(), address)?;

        let mut headers = Headers::new();
        headers.insert("From", config.client_name.as_str());
        headers.insert("Host", host);

        Ok(Self {
            method,
            url,
            headers,
            body: Body::Empty,
            fields: config.multipart_fields.clone(),
            transport: client.transport(),
            tokens: client.tokens(),
        })
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Sets `Authorization: token <token>`. The token's shape is not checked;
    /// a wrong token is rejected by the server. One that cannot be written as
    /// a header value fails `send` with `ApiError::InvalidHeader`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.headers
            .insert("Authorization", format!("token {}", token.into()));
        self
    }

    /// Authenticates with the provider's token as it is right now.
    ///
    /// With no token available the request goes out unauthenticated.
    pub fn authenticated(self) -> Self {
        match self.tokens.token() {
            Some(token) => self.with_token(token),
            None => {
                warn!(url = %self.url, "no token available, request is not authenticated");
                self
            }
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = mem::take(&mut self.body).with_json(value);
        self
    }

    pub fn file(mut self, file: FilePart) -> Self {
        self.body = mem::take(&mut self.body).with_file(file);
        self
    }

    /// The request exactly as it will be written, with a fresh multipart
    /// boundary.
    pub fn assemble(self) -> WireRequest {
        self.assemble_with(&Boundary::generate())
    }

    pub fn assemble_with(self, boundary: &Boundary) -> WireRequest {
        let Request {
            method,
            url,
            mut headers,
            body,
            fields,
            ..
        } = self;

        let body = body.encode(&fields, boundary).map(|encoded| {
            headers.insert("Content-Type", encoded.content_type);
            encoded.bytes
        });

        WireRequest {
            method,
            url: url.into(),
            headers,
            body,
        }
    }

    /// Dispatches the request and returns the server's answer unclassified.
    pub fn send(self) -> Result<Exchange, ApiError> {
        let transport = Arc::clone(&self.transport);
        let body_kind = self.body.kind();
        let wire = self.assemble();
        let target = wire.url.clone();
        if let Some(name) = wire.headers.first_invalid() {
            return Err(ApiError::InvalidHeader {
                name: name.to_string(),
            });
        }

        debug!(method = %wire.method, url = %target, body = body_kind, "dispatching request");
        let raw = transport
            .execute(wire)
            .map_err(|source| ApiError::cant_connect(target.as_str(), source))?;
        debug!(status = raw.status, url = %target, "response received");

        Ok(Exchange::from(raw))
    }

    /// Asks for JSON, dispatches, and decodes the successful response.
    pub fn get_json(self) -> Result<Value, ApiError> {
        self.header("Accept", "application/json").send()?.json()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body.kind())
            .finish_non_exhaustive()
    }
}

/// A response the server sent back, before its status has been judged.
pub struct Exchange {
    status: u16,
    headers: Vec<(String, String)>,
    body: Box<dyn Read>,
}

impl Exchange {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The response stream on success. Otherwise the error stream is drained,
    /// whatever could be read of it is kept, and the request counts as
    /// rejected.
    pub fn into_body(self) -> Result<Box<dyn Read>, ApiError> {
        if self.is_success() {
            return Ok(self.body);
        }

        let status = self.status;
        let mut stream = self.body;
        let mut error_body = Vec::new();
        if let Err(err) = stream.read_to_end(&mut error_body) {
            debug!(status, error = %err, "error stream ended early");
        }
        warn!(status, "server rejected the request");
        Err(TransferIssue::Rejected { status, error_body }.into())
    }

    pub fn json(self) -> Result<Value, ApiError> {
        let body = self.into_body()?;
        Ok(decode_json(body)?)
    }
}

impl From<RawResponse> for Exchange {
    fn from(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
        }
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The target URL and the `Host` header value for it.
fn resolve(base: &str, address: &str) -> Result<(Url, String), ApiError> {
    let target = join_url(base, address);
    let url = Url::parse(&target).map_err(|e| ApiError::cant_connect(target.as_str(), e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::cant_connect(target, "unsupported URL scheme"));
    }
    let host = host_header(&url)
        .ok_or_else(|| ApiError::cant_connect(target.as_str(), "URL has no host"))?;
    Ok((url, host))
}

fn join_url(base: &str, address: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), address.trim_start_matches('/'))
}

/// `host[:port]`, with the port only when it is not the scheme's default.
fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
