//! Retrieving image bytes from untrusted remote servers.
//!
//! | Piece | Job |
//! |---|---|
//! | [`candidates`] | Expand one URL into the ordered fallback list |
//! | [`probe`] | Best-effort `HEAD` to reject oversized or non-image candidates early |
//! | [`stream`] | Bounded streaming `GET` with a hard byte ceiling |
//! | [`retry`] | Exponential backoff for transient failures, per candidate |
//! | [`orchestrator`] | Walk the candidates, stop at the first success |
//! | [`client`] | The shared [`HttpPool`] and the [`Transport`] seam |
//!
//! No path through this module keeps more than `max_bytes` of remote data for
//! one transfer.

pub mod candidates;
pub mod client;
mod error;
pub mod orchestrator;
pub mod probe;
pub mod retry;
pub mod stream;

use crate::config::FetchConfig;
use std::time::Duration;

pub use candidates::{CandidateSet, Locator};
pub use client::{HttpPool, Transport};
pub use error::{
    AllCandidatesExhausted, CandidateFailure, PoolError, ProbeRejection, TransferError,
    TransferPhase,
};
pub use orchestrator::{FetchedImage, fetch_first, fetch_image};
pub use probe::ProbeResult;
pub use retry::{RetryPolicy, retry_delay};

/// Per-transfer bounds, derived from [`FetchConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferLimits {
    pub max_bytes: u64,
    pub connect_timeout: Duration,
    /// Longest wait for any single body chunk.
    pub read_timeout: Duration,
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

impl TransferLimits {
    /// Time allowed from sending a request to receiving its headers.
    pub fn header_budget(&self) -> Duration {
        self.connect_timeout.saturating_add(self.read_timeout)
    }
}

impl From<&FetchConfig> for TransferLimits {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            chunk_size: config.chunk_size,
            retry: RetryPolicy::from(config),
        }
    }
}

/// `image/*`, compared case-insensitively.
pub(crate) fn is_image_content_type(content_type: &str) -> bool {
    const PREFIX: &str = "image/";
    let trimmed = content_type.trim_start();
    trimmed.len() >= PREFIX.len()
        && trimmed.as_bytes()[..PREFIX.len()].eq_ignore_ascii_case(PREFIX.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_content_types() {
        assert!(is_image_content_type("image/png"));
        assert!(is_image_content_type("IMAGE/JPEG; q=1"));
        assert!(is_image_content_type("  image/webp"));
        assert!(!is_image_content_type("text/html"));
        assert!(!is_image_content_type("application/image"));
        assert!(!is_image_content_type("image"));
        assert!(!is_image_content_type(""));
    }

    #[test]
    fn limits_from_config() {
        let limits = TransferLimits::from(&FetchConfig::default());
        assert_eq!(limits.max_bytes, 50 * 1024 * 1024);
        assert_eq!(limits.chunk_size, 64 * 1024);
        assert_eq!(limits.header_budget(), Duration::from_secs(20));
        assert_eq!(limits.retry.max_retries, 3);
    }
}
