//! On-disk record format
//!
//! A record is stored as its content type, a newline, then the raw payload.
//! The first newline always terminates the content type; the payload may
//! contain anything.

use hyper::body::Bytes;

const SEPARATOR: u8 = b'\n';

/// A stored payload together with its declared content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content_type: String,
    pub payload: Bytes,
}

impl Record {
    pub fn new(content_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }

    /// Length of the serialized form
    pub fn encoded_len(&self) -> usize {
        self.content_type.len() + 1 + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.encoded_len());
        blob.extend_from_slice(self.content_type.as_bytes());
        blob.push(SEPARATOR);
        blob.extend_from_slice(&self.payload);
        blob
    }

    /// Split a stored blob at its first newline.
    ///
    /// A blob without any newline is treated as a bare content type.
    pub fn decode(blob: Bytes) -> Self {
        match blob.iter().position(|&b| b == SEPARATOR) {
            Some(idx) => Self {
                content_type: String::from_utf8_lossy(&blob[..idx]).into_owned(),
                payload: blob.slice(idx + 1..),
            },
            None => Self {
                content_type: String::from_utf8_lossy(&blob).into_owned(),
                payload: Bytes::new(),
            },
        }
    }
}
