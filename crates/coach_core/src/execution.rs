use std::fmt;

use serde::Serialize;

/// Correlates an execution response with the request that produced it.
///
/// `session` changes whenever a session is reset or navigates away, so a
/// response carrying an older value is stale by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunTicket {
    pub session: u64,
    pub run: u64,
}

impl fmt::Display for RunTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.session, self.run)
    }
}

/// Body of a request to the code execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRequest {
    pub language: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExecutionError {
    pub kind: ExecutionFailure,
    pub message: String,
}

impl ExecutionError {
    pub fn new(kind: ExecutionFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionFailure {
    Network,
    Timeout,
    ServiceRejected { status: u16 },
    ResponseTooLarge { max_bytes: u64 },
    InvalidResponse,
    Cancelled,
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionFailure::Network => write!(f, "network error"),
            ExecutionFailure::Timeout => write!(f, "timeout"),
            ExecutionFailure::ServiceRejected { status } => {
                write!(f, "execution service rejected the request ({status})")
            }
            ExecutionFailure::ResponseTooLarge { max_bytes } => {
                write!(f, "response too large (max {max_bytes})")
            }
            ExecutionFailure::InvalidResponse => write!(f, "invalid response"),
            ExecutionFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}
