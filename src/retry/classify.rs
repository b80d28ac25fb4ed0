use crate::FetchError;
use reqwest::StatusCode;

/// Whether a failure is worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection resets, timeouts, 5xx, throttling
    Retryable,
    /// Other 4xx, malformed input, decode errors
    Permanent,
}

/// Errors that know whether retrying them can help
pub trait Classify {
    fn classify(&self) -> ErrorClass;

    fn is_retryable(&self) -> bool {
        self.classify() == ErrorClass::Retryable
    }
}

impl Classify for FetchError {
    fn classify(&self) -> ErrorClass {
        match self {
            Self::TransientNetwork { .. } | Self::Throttled { .. } | Self::ServerError { .. } => {
                ErrorClass::Retryable
            }
            Self::PermanentFetch { .. } | Self::Decode { .. } => ErrorClass::Permanent,
        }
    }
}

/// Maps a non-success HTTP status to a fetch error
///
/// | Status | Error | Class |
/// |--------|-------|-------|
/// | 429 | `Throttled` | retryable |
/// | 408 | `TransientNetwork` | retryable |
/// | 5xx | `ServerError` | retryable |
/// | other | `PermanentFetch` | permanent |
pub fn error_for_status(url: &str, status: StatusCode) -> FetchError {
    let url = url.to_string();
    let code = status.as_u16();

    if status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::Throttled { url, status: code }
    } else if status == StatusCode::REQUEST_TIMEOUT {
        FetchError::TransientNetwork {
            url,
            reason: format!("HTTP {}", code),
        }
    } else if status.is_server_error() {
        FetchError::ServerError { url, status: code }
    } else {
        FetchError::PermanentFetch {
            url,
            status: Some(code),
            reason: format!("HTTP {}", code),
        }
    }
}

/// Maps a reqwest transport error to a fetch error
pub fn error_for_transport(url: &str, error: &reqwest::Error) -> FetchError {
    let url = url.to_string();

    if error.is_builder() || error.is_redirect() {
        return FetchError::PermanentFetch {
            url,
            status: None,
            reason: error.to_string(),
        };
    }

    if error.is_decode() {
        return FetchError::Decode {
            url,
            reason: error.to_string(),
        };
    }

    if let Some(status) = error.status() {
        return error_for_status(&url, status);
    }

    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    };

    FetchError::TransientNetwork { url, reason }
}
