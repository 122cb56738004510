//! S3-compatible object storage without an SDK
//!
//! Requests are signed with the legacy `AWS access:signature` scheme and
//! sent over blocking HTTPS. Only GET and PUT of single objects are
//! supported.
//!
//! # Layers
//!
//! | Layer | Role |
//! |-------|------|
//! | [`Signer`] | HMAC-SHA1 signature and `Authorization` value |
//! | [`RequestBuilder`] | canonical string, headers, URL |
//! | [`S3Client`] | transport, streaming, status classification |

pub mod client;
pub mod config;
pub mod request;
pub mod signer;

pub use client::S3Client;
pub use config::{Credentials, StoreConfig, DEFAULT_REGION};
pub use request::{RequestBuilder, SignedRequest};
pub use signer::Signer;

use crate::error::{WadError, WadResult};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Longest slice of an error body kept for diagnostics
const ERROR_BODY_EXCERPT: usize = 512;

/// Request body for an upload
pub enum Body {
    /// Fully in memory
    Buffer(Vec<u8>),
    /// Read while sending; `known_length` becomes Content-Length when set
    Stream {
        reader: Box<dyn Read + Send>,
        known_length: Option<u64>,
    },
}

impl Body {
    /// Stream a file, using its size as the content length
    pub fn file(path: &Path) -> WadResult<Self> {
        let file = File::open(path)
            .map_err(|e| WadError::io(format!("opening {}", path.display()), e))?;
        let length = file
            .metadata()
            .map_err(|e| WadError::io(format!("reading metadata of {}", path.display()), e))?
            .len();

        Ok(Self::Stream {
            reader: Box::new(file),
            known_length: Some(length),
        })
    }

    /// Length to announce in Content-Length, when it is known up front
    pub fn known_length(&self) -> Option<u64> {
        match self {
            Self::Buffer(bytes) => Some(bytes.len() as u64),
            Self::Stream { known_length, .. } => *known_length,
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(bytes)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Self::Stream { known_length, .. } => {
                write!(f, "Stream(known_length: {:?})", known_length)
            }
        }
    }
}

/// What the store answered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Empty when the body was streamed to a sink
    pub body: Vec<u8>,
}

impl ObjectResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Turn a non-2xx response into [`WadError::HttpStatus`]
    pub fn error_for_status(self) -> WadResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let excerpt: String = String::from_utf8_lossy(&self.body)
            .chars()
            .take(ERROR_BODY_EXCERPT)
            .collect();

        Err(WadError::HttpStatus {
            status: self.status,
            body: excerpt.trim().to_string(),
        })
    }
}

/// Object storage operations the artifact cache depends on
pub trait ObjectStore {
    /// Fetch an object into memory
    fn get(&self, key: &str) -> WadResult<ObjectResponse>;

    /// Fetch an object, writing a successful body straight into `sink`
    fn get_to(&self, key: &str, sink: &mut dyn std::io::Write) -> WadResult<ObjectResponse>;

    /// Store an object
    fn put(&self, key: &str, body: Body, content_type: Option<&str>) -> WadResult<ObjectResponse>;
}
