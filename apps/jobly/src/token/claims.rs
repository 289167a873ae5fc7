//! Token payload decoding. The signature is never checked client-side;
//! the backend is the only party that verifies tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::AuthDecodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    /// Issued-at, seconds since epoch.
    pub iat: Option<i64>,
}

/// Decodes the payload segment of a `header.payload.signature` token.
pub fn decode(token: &str) -> Result<Claims, AuthDecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(AuthDecodeError::Segments(segments.len()));
    }
    // Some issuers keep the `=` padding; the URL-safe alphabet is otherwise the same.
    let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Builds an unsigned token carrying `username`, for tests.
#[cfg(test)]
pub fn encode_unsigned(username: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({"username": username, "isAdmin": false, "iat": 1_700_000_000})
            .to_string(),
    );
    format!("{header}.{payload}.signature")
}
