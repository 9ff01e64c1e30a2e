//! Turns a response stream into a JSON value.

use std::io::Read;

use serde_json::Value;

use crate::error::TransferIssue;

/// Reads `reader` to the end and parses it as UTF-8 JSON.
///
/// When the content is not JSON (typically an HTML error page) the failure
/// carries everything received, and its length, so the caller can see what
/// the server actually sent.
pub fn decode_json<R: Read>(mut reader: R) -> Result<Value, TransferIssue> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(TransferIssue::Io)?;

    serde_json::from_slice(&bytes).map_err(|source| {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let length = text.chars().count();
        tracing::debug!(length, "response is not JSON");
        TransferIssue::NotJson {
            text,
            length,
            source,
        }
    })
}
