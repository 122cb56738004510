//! Canonical request construction
//!
//! The server recomputes the canonical string from the request it receives
//! and compares signatures, so the line order and the empty Content-MD5
//! line below have to match byte for byte.

use crate::error::WadResult;
use crate::store::config::StoreConfig;
use crate::store::signer::Signer;
use chrono::{DateTime, Utc};

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("wad/", env!("CARGO_PKG_VERSION"));

/// A request ready to hand to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Uppercased HTTP verb
    pub method: String,
    /// Full request URL
    pub url: String,
    /// Canonical resource the signature covers (`/bucket/key`)
    pub resource: String,
    /// Headers in the order they are sent
    pub headers: Vec<(String, String)>,
}

impl SignedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Format a timestamp the way the `Date` header expects it
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds signed requests for one store configuration
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    config: StoreConfig,
    signer: Signer,
}

impl RequestBuilder {
    pub fn new(config: StoreConfig) -> Self {
        let signer = Signer::new(&config.credentials);
        Self { config, signer }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// `/{bucket}` followed by the key with exactly one leading slash
    pub fn canonical_path(&self, object_key: &str) -> WadResult<String> {
        let bucket = self.config.require_bucket()?;
        Ok(format!("/{}{}", bucket, absolute_path(object_key)))
    }

    /// The newline-joined string the signature is computed over
    pub fn canonical_string(
        verb: &str,
        content_type: Option<&str>,
        timestamp: &str,
        path: &str,
    ) -> String {
        [
            verb.to_uppercase().as_str(),
            "",
            content_type.unwrap_or(""),
            timestamp,
            path,
        ]
        .join("\n")
    }

    /// Authorization, Date, User-Agent and optionally Content-Type.
    ///
    /// Content-Length is left to the caller, who knows the body.
    pub fn build_headers(
        &self,
        timestamp: &str,
        message: &str,
        content_type: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut headers = vec![
            (
                "Authorization".to_string(),
                self.signer.authorization_header(message.as_bytes()),
            ),
            ("Date".to_string(), timestamp.to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];

        if let Some(content_type) = content_type {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        headers
    }

    /// URL for an object, honouring bucket-in-hostname addressing
    pub fn url(&self, object_key: &str) -> WadResult<String> {
        let resource = self.canonical_path(object_key)?;
        let path = if self.config.bucket_in_hostname && self.config.endpoint.is_none() {
            absolute_path(object_key)
        } else {
            resource
        };
        Ok(format!("{}{}", self.config.base_url(), path))
    }

    /// Build a fully signed request stamped with `now`
    pub fn signed(
        &self,
        verb: &str,
        object_key: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> WadResult<SignedRequest> {
        let resource = self.canonical_path(object_key)?;
        let timestamp = http_date(now);
        let message = Self::canonical_string(verb, content_type, &timestamp, &resource);

        Ok(SignedRequest {
            method: verb.to_uppercase(),
            url: self.url(object_key)?,
            headers: self.build_headers(&timestamp, &message, content_type),
            resource,
        })
    }
}

fn absolute_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
