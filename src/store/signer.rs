//! Request signing for the S3 `AWS access:signature` scheme
//!
//! The signature is an HMAC-SHA1 of the canonical string under the secret
//! key, base64 encoded.

use crate::store::config::Credentials;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Signs canonical strings for one set of credentials
#[derive(Debug, Clone)]
pub struct Signer {
    credentials: Credentials,
}

impl Signer {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            credentials: credentials.clone(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.credentials.access_key_id
    }

    /// Base64 HMAC-SHA1 of `message` under the secret key
    pub fn sign(&self, message: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(self.credentials.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(message);
        STANDARD
            .encode(mac.finalize().into_bytes())
            .trim()
            .to_string()
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self, message: &[u8]) -> String {
        format!("AWS {}:{}", self.credentials.access_key_id, self.sign(message))
    }
}
