//! The process-wide connection pool and the transport seam.
//!
//! [`HttpPool`] is built once at startup from [`FetchConfig`] and handed to
//! every pipeline by reference. It is never mutated after construction and is
//! safe to share across tasks; cloning it is cheap and shares the pool.
//!
//! [`Transport`] is what the orchestrator talks to. Production uses
//! [`HttpPool`]; orchestration tests script their own.

use super::TransferLimits;
use super::error::{PoolError, TransferError};
use super::probe::{ProbeResult, probe};
use super::stream::fetch_bounded;
use crate::config::FetchConfig;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::future::Future;

pub trait Transport: Sync {
    /// Metadata probe. `None` means no usable answer.
    fn probe(
        &self,
        locator: &str,
        limits: &TransferLimits,
    ) -> impl Future<Output = Option<ProbeResult>> + Send;

    /// Full transfer of one candidate, including its retries.
    fn fetch(
        &self,
        locator: &str,
        limits: &TransferLimits,
    ) -> impl Future<Output = Result<Vec<u8>, TransferError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpPool {
    client: Client,
}

impl HttpPool {
    /// Build the shared client.
    ///
    /// Bodies are never transparently decompressed, so the byte ceiling
    /// counts bytes as they arrive on the wire.
    pub fn new(config: &FetchConfig) -> Result<Self, PoolError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout())
            .redirect(Policy::limited(config.max_redirects))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpPool {
    fn probe(
        &self,
        locator: &str,
        limits: &TransferLimits,
    ) -> impl Future<Output = Option<ProbeResult>> + Send {
        probe(&self.client, locator, limits)
    }

    fn fetch(
        &self,
        locator: &str,
        limits: &TransferLimits,
    ) -> impl Future<Output = Result<Vec<u8>, TransferError>> + Send {
        fetch_bounded(&self.client, locator, limits)
    }
}
