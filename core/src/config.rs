//! Client configuration.
//!
//! # Design
//! Which server a client talks to is decided once, by the `Environment` in the
//! `ApiConfig` handed to `ApiClient`. There is no process-wide switch and no
//! per-request override, so tests can run clients against both bases side by
//! side.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const PRODUCTION_BASE_URL: &str = "https://api.wildfyre.net";
pub const DEFAULT_TEST_PORT: u16 = 8000;

/// Selects the base URL every request address is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    /// A server on the loopback interface.
    Testing { port: u16 },
}

impl Environment {
    pub fn testing() -> Self {
        Environment::Testing {
            port: DEFAULT_TEST_PORT,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        match self {
            Environment::Production => PRODUCTION_BASE_URL.to_string(),
            Environment::Testing { port } => format!("http://127.0.0.1:{port}"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "testing" => Ok(Environment::testing()),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

/// Form field names of the two parts of a multipart body.
///
/// The defaults are placeholders: the names the server expects have not been
/// confirmed, so they are configurable rather than baked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartFields {
    pub json: String,
    pub file: String,
}

impl Default for MultipartFields {
    fn default() -> Self {
        Self {
            json: "json".to_string(),
            file: "file".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub environment: Environment,
    /// Sent in the `From` header of every request.
    pub client_name: String,
    #[serde(default)]
    pub multipart_fields: MultipartFields,
}

impl ApiConfig {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            client_name: default_client_name(),
            multipart_fields: MultipartFields::default(),
        }
    }

    /// Reads `WILDFYRE_ENV` and `WILDFYRE_TEST_PORT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("WILDFYRE_ENV").ok().as_deref(),
            std::env::var("WILDFYRE_TEST_PORT").ok().as_deref(),
        )
    }

    fn from_vars(env: Option<&str>, port: Option<&str>) -> Result<Self, ConfigError> {
        let mut environment = match env {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };
        if let (Environment::Testing { port: slot }, Some(value)) = (&mut environment, port) {
            *slot = value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort {
                    value: value.to_string(),
                    source,
                })?;
        }
        Ok(Self::new(environment))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

fn default_client_name() -> String {
    concat!("wildfyre-rs/", env!("CARGO_PKG_VERSION")).to_string()
}
