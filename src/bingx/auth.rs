//! Request signing for the BingX API

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{Result, TradingError};
use crate::config::types::ApiCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-BX-APIKEY";

/// Hex-encoded HMAC-SHA256 of `payload` keyed with `secret`
pub fn sign_payload(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TradingError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signs query strings with an account's credentials
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: ApiCredentials,
}

impl RequestSigner {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self { credentials }
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Signed query string for `params` at the current time
    pub fn signed_query(&self, params: &[(String, String)]) -> Result<String> {
        self.signed_query_at(params, chrono::Utc::now().timestamp_millis())
    }

    /// Signed query string for `params` at `timestamp_ms`
    ///
    /// Parameters keep their order; `timestamp` is appended last and the
    /// signature covers the whole encoded string.
    pub fn signed_query_at(&self, params: &[(String, String)], timestamp_ms: i64) -> Result<String> {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("timestamp", &timestamp_ms.to_string());
        let query = serializer.finish();

        let signature = sign_payload(&self.credentials.secret_key, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }
}
