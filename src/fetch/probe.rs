//! Best-effort metadata probe.
//!
//! A `HEAD` request per candidate, used only to turn away transfers that are
//! obviously too big or obviously not images. The probe never fails the
//! pipeline: transport errors, timeouts and non-success statuses all collapse
//! into `None` and the full transfer goes ahead.

use super::error::ProbeRejection;
use super::{TransferLimits, is_image_content_type};
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};

/// What the remote claimed in its probe headers. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub declared_length: Option<u64>,
    pub declared_content_type: Option<String>,
}

impl ProbeResult {
    /// Unparseable header values are treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let declared_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let declared_content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            declared_length,
            declared_content_type,
        }
    }

    /// Decide whether the candidate is worth a full transfer.
    pub fn screen(&self, max_bytes: u64) -> Result<(), ProbeRejection> {
        match self.declared_length {
            Some(declared) if declared > max_bytes => {
                return Err(ProbeRejection::TooLarge {
                    declared,
                    max: max_bytes,
                });
            }
            _ => {}
        }
        match &self.declared_content_type {
            Some(content_type) if !is_image_content_type(content_type) => {
                Err(ProbeRejection::NotAnImage(content_type.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Issue the probe. `None` means "probe unavailable".
pub async fn probe(client: &Client, locator: &str, limits: &TransferLimits) -> Option<ProbeResult> {
    let budget = limits.header_budget();
    let response = match tokio::time::timeout(budget, client.head(locator).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::debug!(locator, error = %e, "probe unavailable");
            return None;
        }
        Err(_) => {
            tracing::debug!(locator, ?budget, "probe timed out");
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::debug!(locator, status = response.status().as_u16(), "probe not answered");
        return None;
    }
    Some(ProbeResult::from_headers(response.headers()))
}
