use hyper::StatusCode;

/// Failure of a call to the upstream data API.
///
/// The HTTP layer does not distinguish between variants; every one of them
/// is reported as a 500 carrying the `Display` text.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
