//! Candidate fallback.
//!
//! Candidates are tried strictly one after another. Each one walks a small
//! state machine:
//!
//! ```text
//! Pending ─▶ Probing ─▶ Fetching ─▶ Succeeded
//!    │          │           │
//!    └──────────┴───────────┴─────▶ Failed ─▶ next candidate
//! ```
//!
//! `Probing` is skipped when probing is disabled, and an unavailable probe
//! falls through to `Fetching`. The first `Succeeded` ends the run; if every
//! candidate reaches `Failed`, the reasons are returned together.

use super::candidates::CandidateSet;
use super::client::Transport;
use super::error::{AllCandidatesExhausted, CandidateFailure};
use super::TransferLimits;
use crate::request::FetchRequest;

/// Bytes of the first candidate that delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub locator: String,
    pub bytes: Vec<u8>,
}

impl FetchedImage {
    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug)]
enum CandidateState {
    Pending,
    Probing,
    Fetching,
    Succeeded(Vec<u8>),
    Failed(CandidateFailure),
}

impl CandidateState {
    fn name(&self) -> &'static str {
        match self {
            CandidateState::Pending => "pending",
            CandidateState::Probing => "probing",
            CandidateState::Fetching => "fetching",
            CandidateState::Succeeded(_) => "succeeded",
            CandidateState::Failed(_) => "failed",
        }
    }
}

/// Fetch the image for `request`, falling back through its candidates.
pub async fn fetch_image(
    transport: &impl Transport,
    request: &FetchRequest,
    probe: bool,
) -> Result<FetchedImage, AllCandidatesExhausted> {
    let candidates = CandidateSet::generate(&request.locator);
    fetch_first(transport, &candidates, &request.limits, probe).await
}

/// Try `candidates` in order and return the first success.
pub async fn fetch_first(
    transport: &impl Transport,
    candidates: &CandidateSet,
    limits: &TransferLimits,
    probe: bool,
) -> Result<FetchedImage, AllCandidatesExhausted> {
    let mut attempts = Vec::with_capacity(candidates.len());
    for locator in candidates.iter() {
        match run_candidate(transport, locator, limits, probe).await {
            Ok(bytes) => {
                return Ok(FetchedImage {
                    locator: locator.to_string(),
                    bytes,
                });
            }
            Err(reason) => {
                tracing::warn!(locator, %reason, "candidate failed");
                attempts.push((locator.to_string(), reason));
            }
        }
    }
    Err(AllCandidatesExhausted { attempts })
}

async fn run_candidate(
    transport: &impl Transport,
    locator: &str,
    limits: &TransferLimits,
    probe: bool,
) -> Result<Vec<u8>, CandidateFailure> {
    let mut state = CandidateState::Pending;
    loop {
        state = match state {
            CandidateState::Pending if probe => CandidateState::Probing,
            CandidateState::Pending => CandidateState::Fetching,
            CandidateState::Probing => match transport.probe(locator, limits).await {
                Some(result) => match result.screen(limits.max_bytes) {
                    Ok(()) => CandidateState::Fetching,
                    Err(rejection) => CandidateState::Failed(rejection.into()),
                },
                None => CandidateState::Fetching,
            },
            CandidateState::Fetching => match transport.fetch(locator, limits).await {
                Ok(bytes) => CandidateState::Succeeded(bytes),
                Err(err) => CandidateState::Failed(err.into()),
            },
            CandidateState::Succeeded(bytes) => return Ok(bytes),
            CandidateState::Failed(reason) => return Err(reason),
        };
        tracing::debug!(locator, state = state.name(), "candidate transition");
    }
}
