//! Error types shared by the session boundary and the runtime.

use thiserror::Error;

use crate::codes::ResultCode;

/// A specialized `Result` type for keeper operations.
pub type KeeperResult<T> = std::result::Result<T, KeeperError>;

/// Represents errors raised by session clients and the runtime built on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeeperError {
    /// The coordination service answered with a non-OK result code.
    #[error("{code}{}", path.as_deref().map(|p| format!(" for {p}")).unwrap_or_default())]
    Remote {
        /// The result code
        code: ResultCode,
        /// The path the failed call targeted, when known
        path: Option<String>,
    },

    /// The service reported a code this client does not know.
    #[error("Unknown result code: {0}")]
    UnknownResultCode(i32),

    /// A lifecycle method was called out of order.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// A background callback failed.
    #[error("Callback failed: {0}")]
    Callback(String),

    /// A listener panicked while being notified.
    #[error("Listener panicked: {0}")]
    ListenerPanicked(String),

    /// The client was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeeperError {
    /// Create a remote error for a result code without path context.
    #[must_use]
    pub fn remote(code: ResultCode) -> Self {
        Self::Remote { code, path: None }
    }

    /// Create a remote error for a result code on a given path.
    #[must_use]
    pub fn remote_at(code: ResultCode, path: impl Into<String>) -> Self {
        Self::Remote {
            code,
            path: Some(path.into()),
        }
    }

    /// Translate a raw result code into the matching domain error.
    ///
    /// Codes this client does not know become [`KeeperError::UnknownResultCode`].
    #[must_use]
    pub fn from_result_code(code: i32, path: Option<&str>) -> Self {
        match ResultCode::from_i32(code) {
            Some(code) => Self::Remote {
                code,
                path: path.map(str::to_owned),
            },
            None => Self::UnknownResultCode(code),
        }
    }

    /// Create an illegal-state (usage) error
    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Create a callback error
    #[must_use]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The service result code carried by this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<ResultCode> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the failed call is worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code().is_some_and(ResultCode::is_retryable)
    }

    /// Whether this error signals that the session itself is gone.
    #[must_use]
    pub fn is_session_loss(&self) -> bool {
        matches!(
            self.code(),
            Some(ResultCode::ConnectionLoss | ResultCode::SessionExpired)
        )
    }

    /// Whether this is a lifecycle usage error.
    #[must_use]
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState(_))
    }
}

impl From<ResultCode> for KeeperError {
    fn from(code: ResultCode) -> Self {
        Self::remote(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result_code_known() {
        let err = KeeperError::from_result_code(-101, Some("/a"));
        assert_eq!(err, KeeperError::remote_at(ResultCode::NoNode, "/a"));
        assert_eq!(err.to_string(), "no node (-101) for /a");
    }

    #[test]
    fn test_from_result_code_unknown() {
        let err = KeeperError::from_result_code(-4242, None);
        assert_eq!(err, KeeperError::UnknownResultCode(-4242));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classification() {
        assert!(KeeperError::remote(ResultCode::ConnectionLoss).is_retryable());
        assert!(KeeperError::remote(ResultCode::ConnectionLoss).is_session_loss());
        assert!(KeeperError::remote(ResultCode::SessionExpired).is_session_loss());
        assert!(!KeeperError::remote(ResultCode::OperationTimeout).is_session_loss());
        assert!(!KeeperError::callback("boom").is_retryable());
        assert!(KeeperError::illegal_state("twice").is_illegal_state());
    }
}
