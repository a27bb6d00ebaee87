//! Builder for `multipart/form-data` request bodies.

/// One file part destined for a multipart body.
#[derive(Debug, Clone)]
pub struct PartSpec {
    /// Filename carried in the `Content-Disposition` header.
    pub filename: String,
    /// MIME type carried in the `Content-Type` header.
    pub content_type: String,
    /// Raw part payload.
    pub data: Vec<u8>,
}

impl PartSpec {
    /// Convenience constructor.
    #[must_use]
    pub fn new(filename: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }
}

/// Assemble a `multipart/form-data` body from the given parts.
#[must_use]
pub fn build_body(boundary: &str, parts: &[PartSpec]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\n",
                part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n", part.content_type).as_bytes());
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// The `Content-Type` header value matching [`build_body`].
#[must_use]
pub fn content_type_header(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}
