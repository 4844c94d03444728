use hyper::StatusCode;

use crate::client::ClientError;

/// Failure of a single API request
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Any upstream failure; the message is returned to the caller verbatim
    #[error(transparent)]
    Upstream(#[from] ClientError),

    /// Request body did not match the expected shape
    #[error("{0}")]
    Validation(String),

    #[error("request body too large")]
    PayloadTooLarge,

    /// Request body could not be read from the connection
    #[error("failed to read request body: {0}")]
    BadBody(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}
