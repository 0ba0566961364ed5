//! Coordination-service result codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric result codes reported by the coordination service.
///
/// The discriminants are the values carried on the wire and in
/// background event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResultCode {
    /// Everything is OK
    Ok = 0,
    /// System and server-side errors (never returned directly, used as a range marker)
    SystemError = -1,
    /// A runtime inconsistency was found
    RuntimeInconsistency = -2,
    /// A data inconsistency was found
    DataInconsistency = -3,
    /// Connection to the server has been lost
    ConnectionLoss = -4,
    /// Error while marshalling or unmarshalling data
    MarshallingError = -5,
    /// Operation is unimplemented
    Unimplemented = -6,
    /// Operation timeout
    OperationTimeout = -7,
    /// Invalid arguments
    BadArguments = -8,
    /// API errors (range marker)
    ApiError = -100,
    /// Node does not exist
    NoNode = -101,
    /// Not authenticated
    NoAuth = -102,
    /// Version conflict
    BadVersion = -103,
    /// Ephemeral nodes may not have children
    NoChildrenForEphemerals = -108,
    /// The node already exists
    NodeExists = -110,
    /// The node has children
    NotEmpty = -111,
    /// The session has been expired by the server
    SessionExpired = -112,
    /// Invalid callback specified
    InvalidCallback = -113,
    /// Invalid ACL specified
    InvalidAcl = -114,
    /// Client authentication failed
    AuthFailed = -115,
    /// Session moved to another server, so operation is ignored
    SessionMoved = -118,
}

impl ResultCode {
    /// Look up a code by its numeric value.
    #[must_use]
    pub fn from_i32(code: i32) -> Option<Self> {
        let code = match code {
            0 => Self::Ok,
            -1 => Self::SystemError,
            -2 => Self::RuntimeInconsistency,
            -3 => Self::DataInconsistency,
            -4 => Self::ConnectionLoss,
            -5 => Self::MarshallingError,
            -6 => Self::Unimplemented,
            -7 => Self::OperationTimeout,
            -8 => Self::BadArguments,
            -100 => Self::ApiError,
            -101 => Self::NoNode,
            -102 => Self::NoAuth,
            -103 => Self::BadVersion,
            -108 => Self::NoChildrenForEphemerals,
            -110 => Self::NodeExists,
            -111 => Self::NotEmpty,
            -112 => Self::SessionExpired,
            -113 => Self::InvalidCallback,
            -114 => Self::InvalidAcl,
            -115 => Self::AuthFailed,
            -118 => Self::SessionMoved,
            _ => return None,
        };
        Some(code)
    }

    /// The numeric value of this code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether an operation that failed with this code is worth retrying.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::ConnectionLoss
                | Self::OperationTimeout
                | Self::SessionMoved
                | Self::SessionExpired
        )
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::SystemError => "system error",
            Self::RuntimeInconsistency => "runtime inconsistency",
            Self::DataInconsistency => "data inconsistency",
            Self::ConnectionLoss => "connection loss",
            Self::MarshallingError => "marshalling error",
            Self::Unimplemented => "unimplemented",
            Self::OperationTimeout => "operation timeout",
            Self::BadArguments => "bad arguments",
            Self::ApiError => "api error",
            Self::NoNode => "no node",
            Self::NoAuth => "not authenticated",
            Self::BadVersion => "bad version",
            Self::NoChildrenForEphemerals => "no children for ephemerals",
            Self::NodeExists => "node exists",
            Self::NotEmpty => "directory not empty",
            Self::SessionExpired => "session expired",
            Self::InvalidCallback => "invalid callback",
            Self::InvalidAcl => "invalid ACL",
            Self::AuthFailed => "authentication failed",
            Self::SessionMoved => "session moved",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

/// Whether a raw result code describes a transient condition worth retrying.
///
/// Unknown codes are never retryable.
#[must_use]
pub fn is_retryable_code(code: i32) -> bool {
    ResultCode::from_i32(code).is_some_and(ResultCode::is_retryable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup_matches_discriminant() {
        for code in [
            ResultCode::Ok,
            ResultCode::ConnectionLoss,
            ResultCode::NoNode,
            ResultCode::SessionExpired,
            ResultCode::SessionMoved,
        ] {
            assert_eq!(ResultCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(ResultCode::from_i32(-9999), None);
    }

    #[test]
    fn test_retryable_codes() {
        assert!(is_retryable_code(-4));
        assert!(is_retryable_code(-7));
        assert!(is_retryable_code(-112));
        assert!(is_retryable_code(-118));

        assert!(!is_retryable_code(0));
        assert!(!is_retryable_code(-101));
        assert!(!is_retryable_code(-110));
        assert!(!is_retryable_code(12345));
    }

    #[test]
    fn test_display_includes_value() {
        assert_eq!(ResultCode::NoNode.to_string(), "no node (-101)");
    }
}
