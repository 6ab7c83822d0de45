use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which part of a transfer a timeout hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Connecting, sending the request and waiting for response headers.
    Headers,
    /// Waiting for the next body chunk.
    Read,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Headers => f.write_str("waiting for headers"),
            TransferPhase::Read => f.write_str("read"),
        }
    }
}

/// Why one transfer of one candidate failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("exceeded size ceiling: {read} bytes received, limit is {max}")]
    TooLarge { read: u64, max: u64 },
    #[error("declared Content-Length {declared} exceeds size ceiling {max}")]
    DeclaredTooLarge { declared: u64, max: u64 },
    #[error("not an image: content type {0:?}")]
    NotAnImage(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: TransferPhase, after: Duration },
    #[error("connection failed: {0}")]
    Connection(String),
    /// DNS, TLS and other failures that another attempt will not change.
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("could not allocate body buffer: {0}")]
    Allocation(String),
    #[error("redirect failed: {0}")]
    Redirect(String),
    #[error("unsupported locator: {0}")]
    Unsupported(String),
    #[error("gave up after {attempts} attempts, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TransferError>,
    },
}

impl TransferError {
    /// Failures worth another attempt at the same candidate.
    ///
    /// Timeouts are deliberately absent: they are charged to the candidate.
    pub fn is_transient(&self) -> bool {
        match self {
            TransferError::Connection(_) => true,
            TransferError::Status(code) => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

/// A candidate turned away on the strength of its probe headers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeRejection {
    #[error("probe declared {declared} bytes, over the size ceiling of {max}")]
    TooLarge { declared: u64, max: u64 },
    #[error("probe declared content type {0:?}, not an image")]
    NotAnImage(String),
}

/// Reason recorded against one candidate in the failure trail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateFailure {
    #[error(transparent)]
    Rejected(#[from] ProbeRejection),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Every candidate failed. Attempts are kept in the order they were tried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("all {} candidate URLs failed: {}", .attempts.len(), describe_attempts(.attempts))]
pub struct AllCandidatesExhausted {
    pub attempts: Vec<(String, CandidateFailure)>,
}

fn describe_attempts(attempts: &[(String, CandidateFailure)]) -> String {
    attempts
        .iter()
        .enumerate()
        .map(|(i, (locator, reason))| format!("[{}] {locator}: {reason}", i + 1))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The shared HTTP client could not be constructed.
#[derive(Error, Debug)]
#[error("failed to build HTTP client: {0}")]
pub struct PoolError(#[from] pub reqwest::Error);

/// Flatten an error and its sources into one line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(TransferError::Connection("reset".into()).is_transient());
        assert!(!TransferError::Unreachable("dns error".into()).is_transient());
        assert!(!TransferError::Allocation("capacity overflow".into()).is_transient());
        assert!(TransferError::Status(503).is_transient());
        assert!(TransferError::Status(429).is_transient());
        assert!(!TransferError::Status(404).is_transient());
        assert!(!TransferError::NotAnImage("text/html".into()).is_transient());
        assert!(
            !TransferError::Timeout {
                phase: TransferPhase::Read,
                after: Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(!TransferError::TooLarge { read: 2, max: 1 }.is_transient());
    }

    #[test]
    fn exhausted_lists_every_attempt_in_order() {
        let err = AllCandidatesExhausted {
            attempts: vec![
                ("http://a.test/x?q=1".into(), TransferError::Status(404).into()),
                (
                    "https://a.test/x?q=1".into(),
                    ProbeRejection::NotAnImage("text/html".into()).into(),
                ),
                ("http://a.test/x".into(), TransferError::Status(410).into()),
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("all 3 candidate URLs failed"), "{msg}");
        let first = msg.find("[1] http://a.test/x?q=1: HTTP status 404").unwrap();
        let second = msg.find("[2] https://a.test/x?q=1: probe declared").unwrap();
        let third = msg.find("[3] http://a.test/x: HTTP status 410").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let outer = crate::imaging::BackendError::Io(inner);
        let text = error_chain(&outer);
        assert!(text.contains("peer reset"), "{text}");
    }
}
