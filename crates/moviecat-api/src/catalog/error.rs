//! Error taxonomy for catalog operations.

use reqwest::StatusCode;

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors returned by the catalog client.
///
/// The type is `Clone` so that one failed token acquisition can be
/// delivered to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum CatalogError {
    /// The token endpoint was unreachable or answered with a non-2xx status.
    #[error("failed to fetch auth token ({}): {body}", status_label(.status))]
    AuthFailure {
        /// HTTP status, if a response was received.
        status: Option<StatusCode>,
        /// Response body or transport error text.
        body: String,
    },

    /// A response body matched none of the accepted shapes.
    #[error("invalid response shape: {0}")]
    InvalidResponseShape(String),

    /// A catalog request failed after the 401 recovery was spent.
    #[error("request failed ({}): {body}", status_label(.status))]
    RequestFailure {
        /// Final HTTP status, if a response was received.
        status: Option<StatusCode>,
        /// Response body, transport error text, or decode error text.
        body: String,
    },

    /// A required argument was missing or empty. No request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The client could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl CatalogError {
    /// Returns the HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::AuthFailure { status, .. } | Self::RequestFailure { status, .. } => *status,
            Self::InvalidResponseShape(_) | Self::InvalidArgument(_) | Self::Setup(_) => None,
        }
    }
}

/// Renders an optional status for error messages.
#[allow(clippy::ref_option)]
fn status_label(status: &Option<StatusCode>) -> String {
    status.map_or_else(|| String::from("no response"), |s| format!("HTTP {}", s.as_u16()))
}
