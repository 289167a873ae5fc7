use thiserror::Error;

/// A token that could not be decoded into claims.
#[derive(Debug, Error)]
pub enum AuthDecodeError {
    #[error("Token must have 3 dot-separated segments, found {0}")]
    Segments(usize),

    #[error("Token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token payload is not valid claims JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Any failed call to the Jobly backend.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("API error (status {status}): {}", .messages.join("; "))]
    Api { status: u16, messages: Vec<String> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),
}

impl RequestError {
    /// Messages suitable for showing next to a form.
    /// Backend errors keep their own list; transport errors become a single entry.
    pub fn messages(&self) -> Vec<String> {
        match self {
            RequestError::Api { messages, .. } => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Failures surfaced by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not decode token: {0}")]
    AuthDecode(#[from] AuthDecodeError),

    #[error("Could not fetch profile: {0}")]
    ProfileFetch(RequestError),

    #[error("No user is logged in")]
    NotAuthenticated,

    #[error("Could not apply to job: {0}")]
    Apply(RequestError),
}

/// Local token storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not replace storage file: {0}")]
    Persist(#[from] tempfile::PersistError),
}
