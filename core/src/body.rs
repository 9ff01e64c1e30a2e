//! Request bodies and their wire framing.
//!
//! # Design
//! `Body` says explicitly which framing a request gets. Attaching JSON or a
//! file moves it from one variant to the next, so there is never a question of
//! which optional fields happen to be set:
//!
//! - `Empty`: no body is sent.
//! - `Json`: the serialized value, `Content-Type: application/json`.
//! - `Multipart`: a file, optionally preceded by a JSON part, framed as
//!   `multipart/form-data` with a per-request boundary.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use uuid::Uuid;

use crate::config::MultipartFields;

const CRLF: &[u8] = b"\r\n";

/// A file attached to a request, read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    filename: String,
    bytes: Vec<u8>,
}

impl FilePart {
    /// Reads the whole file. The part is named after the file's last path
    /// component.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { filename, bytes })
    }

    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content type guessed from the filename extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart { json: Option<Value>, file: FilePart },
}

/// Body bytes together with the `Content-Type` that describes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Body {
    /// Sets the JSON payload, replacing any previous one. A file already
    /// attached stays attached.
    pub fn with_json(self, value: Value) -> Self {
        match self {
            Body::Empty | Body::Json(_) => Body::Json(value),
            Body::Multipart { file, .. } => Body::Multipart {
                json: Some(value),
                file,
            },
        }
    }

    /// Attaches a file, replacing any previous one. A JSON payload already set
    /// becomes the first part of the multipart body.
    pub fn with_file(self, file: FilePart) -> Self {
        match self {
            Body::Empty => Body::Multipart { json: None, file },
            Body::Json(value) => Body::Multipart {
                json: Some(value),
                file,
            },
            Body::Multipart { json, .. } => Body::Multipart { json, file },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Body::Empty => "empty",
            Body::Json(_) => "json",
            Body::Multipart { .. } => "multipart",
        }
    }

    /// Frames the body for the wire. `None` for `Empty`.
    pub fn encode(&self, fields: &MultipartFields, boundary: &Boundary) -> Option<EncodedBody> {
        match self {
            Body::Empty => None,
            Body::Json(value) => Some(EncodedBody {
                content_type: "application/json".to_string(),
                bytes: value.to_string().into_bytes(),
            }),
            Body::Multipart { json, file } => Some(EncodedBody {
                content_type: format!("multipart/form-data; boundary={}", boundary.as_str()),
                bytes: encode_multipart(json.as_ref(), file, fields, boundary),
            }),
        }
    }
}

fn encode_multipart(
    json: Option<&Value>,
    file: &FilePart,
    fields: &MultipartFields,
    boundary: &Boundary,
) -> Vec<u8> {
    let delimiter = format!("--{}", boundary.as_str());
    let mut out = Vec::with_capacity(file.bytes.len() + 512);

    if let Some(value) = json {
        push_line(&mut out, &delimiter);
        push_line(
            &mut out,
            &format!("Content-Disposition: form-data; name=\"{}\"", fields.json),
        );
        push_line(&mut out, "Content-Type: application/json; charset=UTF-8");
        out.extend_from_slice(CRLF);
        push_line(&mut out, &value.to_string());
    }

    push_line(&mut out, &delimiter);
    push_line(
        &mut out,
        &format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            fields.file,
            quote_filename(&file.filename)
        ),
    );
    push_line(&mut out, &format!("Content-Type: {}", file.content_type()));
    push_line(&mut out, "Content-Transfer-Encoding: binary");
    out.extend_from_slice(CRLF);
    out.extend_from_slice(&file.bytes);
    out.extend_from_slice(CRLF);

    push_line(&mut out, &format!("{delimiter}--"));
    out
}

/// Percent-encodes the characters that would end the quoted string or the
/// header line.
fn quote_filename(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' => quoted.push_str("%22"),
            '\\' => quoted.push_str("%5C"),
            '\r' => quoted.push_str("%0D"),
            '\n' => quoted.push_str("%0A"),
            c => quoted.push(c),
        }
    }
    quoted
}

fn push_line(out: &mut Vec<u8>, line: &str) {
    out.extend_from_slice(line.as_bytes());
    out.extend_from_slice(CRLF);
}

/// Multipart boundary token, unique per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// Milliseconds since the epoch followed by random hex, so two requests
    /// built in the same millisecond still differ.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let nonce = Uuid::new_v4().simple().to_string();
        Boundary(format!("----WildFyreBoundary{millis}{}", &nonce[..12]))
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Boundary(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields() -> MultipartFields {
        MultipartFields::default()
    }

    #[test]
    fn empty_body_encodes_to_nothing() {
        assert!(Body::Empty.encode(&fields(), &Boundary::fixed("b")).is_none());
    }

    #[test]
    fn json_body_is_plain_serialization() {
        let body = Body::Empty.with_json(json!({"text": "hi", "n": 2}));
        let encoded = body.encode(&fields(), &Boundary::fixed("b")).unwrap();
        assert_eq!(encoded.content_type, "application/json");
        let parsed: Value = serde_json::from_slice(&encoded.bytes).unwrap();
        assert_eq!(parsed, json!({"text": "hi", "n": 2}));
        assert!(!String::from_utf8(encoded.bytes).unwrap().contains("--b"));
    }

    #[test]
    fn attaching_transitions_variants() {
        let file = FilePart::from_bytes("a.txt", b"x".to_vec());

        let body = Body::Empty.with_file(file.clone());
        assert_eq!(body, Body::Multipart { json: None, file: file.clone() });

        let body = body.with_json(json!(1));
        assert_eq!(body, Body::Multipart { json: Some(json!(1)), file: file.clone() });

        let body = Body::Empty.with_json(json!(1)).with_json(json!(2)).with_file(file.clone());
        assert_eq!(body, Body::Multipart { json: Some(json!(2)), file });
        assert_eq!(body.kind(), "multipart");
    }

    #[test]
    fn multipart_with_json_and_file() {
        let body = Body::Empty
            .with_json(json!({"text": "hi"}))
            .with_file(FilePart::from_bytes("pic.png", b"PNGDATA".to_vec()));
        let encoded = body.encode(&fields(), &Boundary::fixed("XYZ")).unwrap();

        assert_eq!(encoded.content_type, "multipart/form-data; boundary=XYZ");
        let expected = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"json\"\r\n",
            "Content-Type: application/json; charset=UTF-8\r\n",
            "\r\n",
            "{\"text\":\"hi\"}\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"pic.png\"\r\n",
            "Content-Type: image/png\r\n",
            "Content-Transfer-Encoding: binary\r\n",
            "\r\n",
            "PNGDATA\r\n",
            "--XYZ--\r\n",
        );
        assert_eq!(String::from_utf8(encoded.bytes).unwrap(), expected);
    }

    #[test]
    fn multipart_file_only_starts_and_ends_with_boundary() {
        let body = Body::Empty.with_file(FilePart::from_bytes("notes", vec![0, 159, 146, 150]));
        let encoded = body.encode(&fields(), &Boundary::fixed("B")).unwrap();
        let bytes = encoded.bytes;

        assert!(bytes.starts_with(b"--B\r\n"));
        assert!(bytes.ends_with(b"\r\n--B--\r\n"));
        assert!(!bytes.windows(4).any(|w| w == b"json"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Content-Type: application/octet-stream\r\n"));
        assert!(bytes.windows(8).any(|w| w == b"\r\n\r\n\x00\x9f\x92\x96"));
    }

    #[test]
    fn custom_field_names_are_used() {
        let fields = MultipartFields {
            json: "post".to_string(),
            file: "image".to_string(),
        };
        let body = Body::Json(json!({})).with_file(FilePart::from_bytes("a.jpg", b"j".to_vec()));
        let text = String::from_utf8(body.encode(&fields, &Boundary::fixed("q")).unwrap().bytes)
            .unwrap();
        assert!(text.contains("name=\"post\"\r\n"));
        assert!(text.contains("name=\"image\"; filename=\"a.jpg\"\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
    }

    #[test]
    fn filename_cannot_break_the_framing() {
        let body = Body::Empty.with_file(FilePart::from_bytes(
            "a.txt\r\n\r\nINJECTED\r\n--B--\r\n\\\"",
            b"data".to_vec(),
        ));
        let text = String::from_utf8(body.encode(&fields(), &Boundary::fixed("B")).unwrap().bytes)
            .unwrap();

        assert_eq!(text.matches("\r\n--B--").count(), 1);
        assert!(text.ends_with("\r\n--B--\r\n"));
        assert!(text.contains(
            "filename=\"a.txt%0D%0A%0D%0AINJECTED%0D%0A--B--%0D%0A%5C%22\"\r\n"
        ));
        assert!(!text.contains("\r\nINJECTED"));
    }

    #[test]
    fn generated_boundaries_differ() {
        let a = Boundary::generate();
        let b = Boundary::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("----WildFyreBoundary"));
    }

    #[test]
    fn open_reads_file_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let part = FilePart::open(&path).unwrap();
        assert_eq!(part.filename(), "avatar.gif");
        assert_eq!(part.bytes(), b"GIF89a");
        assert_eq!(part.content_type(), "image/gif");
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FilePart::open(dir.path().join("nope.png")).is_err());
    }
}
