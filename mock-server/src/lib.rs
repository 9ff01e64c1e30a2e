//! Local stand-in for the WildFyre API, used by integration tests.
//!
//! Routes:
//! - `GET /users/`: the logged-in user; needs `Authorization: token <TOKEN>`.
//! - `ANY /echo/`: describes the request it received (method, headers, body).
//! - `GET /html/`: a 200 response whose body is an HTML page, not JSON.
//! - anything else: 404 with an empty body.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

/// The only token `/users/` accepts.
pub const TOKEN: &str = "mock-token";

pub const HTML_PAGE: &str = "<html>error</html>";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user: u64,
    pub name: String,
    pub bio: String,
}

/// What `/echo/` saw. Header names are lowercase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/users/", get(me))
        .route("/echo/", any(echo))
        .route("/html/", get(html))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn me(headers: HeaderMap) -> Response {
    let expected = format!("token {TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        tracing::debug!("rejecting request without a valid token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid token."})),
        )
            .into_response();
    }
    Json(User {
        user: 1,
        name: "alice".to_string(),
        bio: "Hello".to_string(),
    })
    .into_response()
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(Echo {
        method: method.as_str().to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn html() -> Html<&'static str> {
    Html(HTML_PAGE)
}
