use thiserror::Error;

/// Failures of the catalog and language model clients, and of configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    // Deezer answers some failures with 200 and an `error` object in the body
    #[error("Deezer API error: {0}")]
    CatalogApi(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Whether the failure is transient: timeouts, connection errors, 429 and 5xx.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                matches!(e.status(), Some(status) if status.as_u16() == 429 || status.is_server_error())
            }
            Error::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ConfigurationError(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        let url = "http://localhost".to_string();
        assert!(Error::UnexpectedStatus { status: 500, url: url.clone() }.is_retryable());
        assert!(Error::UnexpectedStatus { status: 503, url: url.clone() }.is_retryable());
        assert!(Error::UnexpectedStatus { status: 429, url: url.clone() }.is_retryable());
        assert!(!Error::UnexpectedStatus { status: 400, url: url.clone() }.is_retryable());
        assert!(!Error::UnexpectedStatus { status: 403, url }.is_retryable());
    }

    #[test]
    fn logical_errors_are_not_retryable() {
        assert!(!Error::Validation("Mood is required".into()).is_retryable());
        assert!(!Error::LanguageModel("quota".into()).is_retryable());
        assert!(!Error::CatalogApi("no data".into()).is_retryable());
    }

    #[test]
    fn bind_failure_is_a_configuration_error() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::AddrInUse));
        assert!(matches!(err, Error::ConfigurationError(_)));
    }
}
