//! End-to-end exchanges against the live mock server.
//!
//! # Design
//! Starts the mock server on a random loopback port and points a client at it
//! through `Environment::Testing`, so every request goes over real HTTP via
//! `UreqTransport`.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use wildfyre_core::{
    ApiClient, ApiConfig, ApiError, Environment, FilePart, HttpMethod, NoToken, SharedToken,
    TransferIssue,
};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr, tokens: Arc<SharedToken>) -> ApiClient {
    ApiClient::new(
        ApiConfig::new(Environment::Testing { port: addr.port() }),
        tokens,
    )
}

#[test]
fn authenticated_user_lookup() {
    let addr = start_server();
    let tokens = Arc::new(SharedToken::new(mock_server::TOKEN));
    let client = client(addr, tokens.clone());

    let me = client.get("/users/").unwrap().authenticated().get_json().unwrap();
    assert_eq!(me, json!({"user": 1, "name": "alice", "bio": "Hello"}));

    // Once the token is gone the server rejects the request with its error payload.
    tokens.clear();
    let err = client.get("/users/").unwrap().authenticated().get_json().unwrap_err();
    let issue = err.transfer_issue().expect("transfer issue");
    assert_eq!(issue.status(), Some(401));
    assert_eq!(issue.error_json().unwrap()["detail"], "Invalid token.");
}

#[test]
fn wrong_token_is_rejected() {
    let addr = start_server();
    let client = client(addr, Arc::new(SharedToken::default()));

    let err = client
        .get("/users/")
        .unwrap()
        .with_token("not-the-token")
        .get_json()
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Transfer(TransferIssue::Rejected { status: 401, .. })
    ));
}

#[test]
fn default_headers_reach_the_server() {
    let addr = start_server();
    let client = client(addr, Arc::new(SharedToken::new("abc")));

    let echo = client.get("/echo/").unwrap().authenticated().get_json().unwrap();
    assert_eq!(echo["method"], "GET");
    assert!(echo["headers"]["from"].as_str().unwrap().starts_with("wildfyre-rs/"));
    assert_eq!(echo["headers"]["host"], format!("127.0.0.1:{}", addr.port()));
    assert_eq!(echo["headers"]["authorization"], "token abc");
    assert_eq!(echo["headers"]["accept"], "application/json");
    assert!(echo["headers"]["accept-encoding"].is_null(), "{echo}");
    assert_eq!(echo["body"], "");
}

#[test]
fn json_body_on_the_wire() {
    let addr = start_server();
    let client = client(addr, Arc::new(SharedToken::default()));

    for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch] {
        let echo = client
            .request(method, "/echo/")
            .unwrap()
            .json(json!({"text": "hello"}))
            .get_json()
            .unwrap();
        assert_eq!(echo["method"], method.as_str());
        assert_eq!(echo["headers"]["content-type"], "application/json");
        assert_eq!(echo["body"], r#"{"text":"hello"}"#);
    }
}

#[test]
fn multipart_body_on_the_wire() {
    let addr = start_server();
    let client = client(addr, Arc::new(SharedToken::default()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "file contents").unwrap();

    let echo = client
        .post("/echo/")
        .unwrap()
        .json(json!({"title": "upload"}))
        .file(FilePart::open(&path).unwrap())
        .get_json()
        .unwrap();

    let content_type = echo["headers"]["content-type"].as_str().unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");
    let body = echo["body"].as_str().unwrap();
    assert!(body.starts_with(&format!("--{boundary}\r\n")));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    assert!(body.contains("Content-Type: application/json; charset=UTF-8\r\n\r\n{\"title\":\"upload\"}\r\n"));
    assert!(body.contains("filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n"));
    assert!(body.contains("\r\n\r\nfile contents\r\n"));
}

#[test]
fn html_response_is_a_transfer_issue() {
    let addr = start_server();
    let client = client(addr, Arc::new(SharedToken::default()));

    let err = client.get("/html/").unwrap().get_json().unwrap_err();
    let message = err.to_string();
    assert!(message.contains(mock_server::HTML_PAGE), "{message}");
    assert!(message.contains("18"), "{message}");
}

#[test]
fn unknown_route_rejected_with_empty_error_stream() {
    let addr = start_server();
    let client = client(addr, Arc::new(SharedToken::default()));

    let err = client.delete("/nothing/").unwrap().get_json().unwrap_err();
    let issue = err.transfer_issue().unwrap();
    assert_eq!(issue.status(), Some(404));
    assert!(issue.error_body().unwrap().is_empty());
}

#[test]
fn closed_port_cannot_connect() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ApiClient::new(
        ApiConfig::new(Environment::Testing { port }),
        Arc::new(NoToken),
    );

    let err = client.get("/users/").unwrap().get_json().unwrap_err();
    assert!(err.is_cant_connect(), "{err:?}");
}
