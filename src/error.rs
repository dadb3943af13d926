//! Error types for the contract workflow.
//!
//! Transport, status and body failures are collapsed per operation into one
//! user-facing notice, while `FailureReason` keeps the cause available to callers.

use crate::model::OperationKind;
use reqwest::StatusCode;

/// Failure talking to one of the remote services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("{endpoint} returned a malformed body: {source}")]
    MalformedBody {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ServiceError {
    pub fn transport(endpoint: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { endpoint, source }
    }
}

/// Coarse reason code attached to every failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Transport,
    HttpStatus(u16),
    MalformedResponse,
    Busy,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Failed to analyze contract. Please try again.")]
    Analyze(#[source] ServiceError),

    #[error("Failed to get answer. Please try again.")]
    Ask(#[source] ServiceError),

    #[error("Failed to send document for signing")]
    Sign(#[source] ServiceError),

    #[error("{0} already in progress")]
    Busy(OperationKind),

    #[error("could not read {path}: {source}")]
    ReadDocument {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    pub fn reason(&self) -> FailureReason {
        match self {
            WorkflowError::Analyze(e) | WorkflowError::Ask(e) | WorkflowError::Sign(e) => {
                match e {
                    ServiceError::Transport { .. } => FailureReason::Transport,
                    ServiceError::Status { status, .. } => {
                        FailureReason::HttpStatus(status.as_u16())
                    }
                    ServiceError::MalformedBody { .. } => FailureReason::MalformedResponse,
                }
            }
            WorkflowError::Busy(_) => FailureReason::Busy,
            WorkflowError::ReadDocument { .. } => FailureReason::Io,
        }
    }

    /// Operation this failure belongs to, if it came from a remote call or guard.
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            WorkflowError::Analyze(_) => Some(OperationKind::Analysis),
            WorkflowError::Ask(_) => Some(OperationKind::Question),
            WorkflowError::Sign(_) => Some(OperationKind::Signing),
            WorkflowError::Busy(kind) => Some(*kind),
            WorkflowError::ReadDocument { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_failures_keep_the_code() {
        let err = WorkflowError::Sign(ServiceError::Status {
            endpoint: "envelopes",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        });
        assert_eq!(err.reason(), FailureReason::HttpStatus(500));
        assert_eq!(err.kind(), Some(OperationKind::Signing));
        assert_eq!(err.to_string(), "Failed to send document for signing");
    }

    #[test]
    fn busy_names_the_operation() {
        let err = WorkflowError::Busy(OperationKind::Analysis);
        assert_eq!(err.to_string(), "analysis already in progress");
        assert_eq!(err.reason(), FailureReason::Busy);
    }
}
