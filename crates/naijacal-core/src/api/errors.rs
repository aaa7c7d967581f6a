use std::fmt;

use serde_json::Value;

/// Categories of backend errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 401/403: credentials or token rejected
    Unauthorized,
    /// Any other non-2xx status
    HttpStatus,
    /// No response (connection refused, DNS, reset)
    Transport,
    /// Request exceeded the configured timeout
    Timeout,
    /// 2xx response whose body did not match the expected shape
    Decode,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Decode => write!(f, "decode"),
        }
    }
}

/// Structured error from the backend with kind and details.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Message taken from the response body (`error`, then `detail`), if any
    pub message: Option<String>,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: None,
            details: Some(details.into()),
        }
    }

    /// Creates an HTTP status error, extracting the body's message when present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = if status == 401 || status == 403 {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::HttpStatus
        };
        Self {
            kind,
            status: Some(status),
            message: body_message(body),
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn transport(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, details)
    }

    pub fn timeout(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, details)
    }

    pub fn decode(details: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, details)
    }

    /// True when the request never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Transport | ApiErrorKind::Timeout)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.message.as_deref(), self.details.as_deref()) {
            (Some(status), Some(msg), _) => write!(f, "HTTP {status}: {msg}"),
            (Some(status), None, _) => write!(f, "HTTP {status}"),
            (None, _, Some(details)) => write!(f, "{}: {details}", self.kind),
            (None, _, None) => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ApiError {}

/// Pulls a human-readable message out of an error body.
///
/// The backend uses `error` for its own failures and `detail` for framework
/// (authentication) failures; `error` wins when both are present.
pub fn body_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["error", "detail"].into_iter().find_map(|key| {
        json.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Classifies a reqwest error into an `ApiError`.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::timeout(format!("Request timed out: {e}"))
    } else if e.is_decode() {
        ApiError::decode(format!("Invalid response body: {e}"))
    } else {
        ApiError::transport(format!("Network error: {e}"))
    }
}
