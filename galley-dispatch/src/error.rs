//! Error types for the dispatch subsystem

use thiserror::Error;

use crate::stations::StationStoreError;

/// Bridge transport error
///
/// `Unreachable` and `Rejected` are kept apart so callers can tell
/// "the agent is not there" from "the agent refused the job".
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Bridge agent not reachable, or the link dropped
    #[error("Bridge unreachable: {0}")]
    Unreachable(String),

    /// Bridge reachable, but it refused the request (unknown printer, device offline)
    #[error("Rejected by bridge: {0}")]
    Rejected(String),

    /// No reply within the request timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Operation attempted on a closed link
    #[error("Connection closed")]
    Closed,

    /// Malformed frame or unexpected reply
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Dispatch error returned to callers of the facade
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Bridge agent not present
    #[error("Print bridge is not installed or not running")]
    BridgeUnavailable,

    /// Connection attempt exceeded the connect timeout
    #[error("Timed out connecting to the print bridge")]
    ConnectionTimeout,

    /// Link dropped while a job was in flight
    #[error("Connection to the print bridge closed: {0}")]
    ConnectionClosed(String),

    /// The bridge refused the job
    #[error("Printer '{printer}' rejected the job: {reason}")]
    SubmissionRejected { printer: String, reason: String },

    /// The bridge took the job but did not answer in time; it may or may not print
    #[error("Printer '{printer}' did not confirm the job: {reason}")]
    SubmissionTimeout { printer: String, reason: String },

    /// Station exists but has no printer assigned
    #[error("No printer assigned to station '{station}'")]
    ConfigurationMissing { station: String },

    /// Print attempted without an active connection
    #[error("Not connected to the print bridge")]
    NotConnected,

    /// Target names a station that does not exist
    #[error("Unknown station: {0}")]
    UnknownStation(String),

    /// Target names neither a printer nor a station
    #[error("Print target has neither a printer nor a station")]
    InvalidTarget,

    /// Station configuration could not be persisted or read
    #[error("Station storage error: {0}")]
    Storage(String),
}

impl DispatchError {
    /// Stable machine-readable code for UI mapping
    pub fn code(&self) -> &'static str {
        match self {
            Self::BridgeUnavailable => "BRIDGE_UNAVAILABLE",
            Self::ConnectionTimeout => "CONNECTION_TIMEOUT",
            Self::ConnectionClosed(_) => "CONNECTION_CLOSED",
            Self::SubmissionRejected { .. } => "SUBMISSION_REJECTED",
            Self::SubmissionTimeout { .. } => "SUBMISSION_TIMEOUT",
            Self::ConfigurationMissing { .. } => "CONFIGURATION_MISSING",
            Self::NotConnected => "NOT_CONNECTED",
            Self::UnknownStation(_) => "UNKNOWN_STATION",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Map a transport failure during submission to a caller-facing error
    pub(crate) fn from_submission(printer: &str, err: TransportError) -> Self {
        match err {
            TransportError::Rejected(reason) => Self::SubmissionRejected {
                printer: printer.to_string(),
                reason,
            },
            TransportError::Protocol(reason) => Self::SubmissionRejected {
                printer: printer.to_string(),
                reason,
            },
            TransportError::Timeout(reason) => Self::SubmissionTimeout {
                printer: printer.to_string(),
                reason,
            },
            TransportError::Unreachable(reason) => Self::ConnectionClosed(reason),
            TransportError::Closed => Self::ConnectionClosed("closed during submission".into()),
        }
    }
}

impl From<StationStoreError> for DispatchError {
    fn from(err: StationStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_maps_to_submission_rejected() {
        let err = DispatchError::from_submission("EPSON", TransportError::Rejected("offline".into()));
        assert!(matches!(
            err,
            DispatchError::SubmissionRejected { ref printer, ref reason }
                if printer == "EPSON" && reason == "offline"
        ));
        assert_eq!(err.code(), "SUBMISSION_REJECTED");
    }

    #[test]
    fn test_drop_maps_to_connection_closed() {
        let err = DispatchError::from_submission("EPSON", TransportError::Closed);
        assert!(matches!(err, DispatchError::ConnectionClosed(_)));

        let err =
            DispatchError::from_submission("EPSON", TransportError::Unreachable("reset".into()));
        assert_eq!(err.code(), "CONNECTION_CLOSED");
    }

    #[test]
    fn test_timeout_is_not_a_closed_connection() {
        let err =
            DispatchError::from_submission("EPSON", TransportError::Timeout("print timed out".into()));
        assert!(matches!(
            err,
            DispatchError::SubmissionTimeout { ref printer, .. } if printer == "EPSON"
        ));
        assert_eq!(err.code(), "SUBMISSION_TIMEOUT");
    }
}
