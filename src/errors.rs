use thiserror::Error;

use crate::response::AlertResponse;

/// Result type alias for VictorOps operations
pub type Result<T> = std::result::Result<T, VictorOpsError>;

/// Errors that can occur when configuring the client or sending alerts
#[derive(Debug, Error)]
pub enum VictorOpsError {
    /// A required setting was absent or empty
    #[error("Missing required setting: {0}")]
    MissingSettings(&'static str),

    /// A payload was built without an alert verb
    #[error("Alert payload is missing a message type")]
    MissingMessageType,

    /// Delivering the alert failed, at the network level or by the service
    /// answering with `result: failure`
    #[error("Error posting to VictorOps: {0}")]
    PostFailure(#[from] PostFailure),

    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),
}

impl VictorOpsError {
    /// The transport failure, if this is a [`VictorOpsError::PostFailure`]
    pub fn post_failure(&self) -> Option<&PostFailure> {
        match self {
            Self::PostFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Cause of a failed POST to the REST endpoint
///
/// All of these surface to callers as [`VictorOpsError::PostFailure`]; the
/// variants only exist so the cause stays inspectable.
#[derive(Debug, Error)]
pub enum PostFailure {
    /// `{api_url}/{routing_key}` is not a valid URL
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// Connection, TLS or timeout failure
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// The response body could not be read
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// Non-2xx HTTP status
    #[error("HTTP {status} - {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The body was empty, not JSON, or not a JSON object
    #[error("response is not a JSON object: {0}")]
    Decode(#[source] serde_json::Error),

    /// The service decoded the alert and answered `result: failure`
    #[error("response contains a failure message: {0}")]
    Rejected(AlertResponse),
}

impl PostFailure {
    /// Check if the failure is likely transient
    ///
    /// Returns `true` for:
    /// - Connection errors
    /// - Timeout errors
    /// - Server errors (5xx status codes)
    ///
    /// The client never retries on its own; this is for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(reqwest_middleware::Error::Reqwest(err)) => {
                err.is_connect() || err.is_timeout()
            }
            Self::Body(err) => err.is_timeout(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The decoded failure response, when the service rejected the alert
    pub fn response(&self) -> Option<&AlertResponse> {
        match self {
            Self::Rejected(response) => Some(response),
            _ => None,
        }
    }
}
