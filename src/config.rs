//! Service configuration module.
//!
//! Handles loading, validating, and merging the service `config.toml`. Stock
//! defaults are serialized to a TOML table, the user file is merged on top of
//! it key by key, and the result is deserialized and validated. Every
//! operational constant lives here; nothing in the fetch or render path
//! hardcodes a limit.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [fetch]
//! max_bytes = 52428800        # Byte ceiling for one transfer attempt (50 MiB)
//! connect_timeout_ms = 10000  # TCP/TLS connect budget
//! read_timeout_ms = 10000     # Budget for response headers and for each body read
//! chunk_size = 65536          # Accounting granularity while streaming
//! max_retries = 3             # Extra attempts per candidate on transient failures
//! backoff_base_ms = 250       # First retry delay
//! backoff_factor = 2.0        # Delay multiplier per retry
//! max_backoff_ms = 10000      # Upper bound on a single delay
//! probe = true                # Send a HEAD probe before each transfer
//! max_redirects = 10
//! pool_max_idle_per_host = 8
//! # user_agent = "imagevault/<version>"
//!
//! [render]
//! default_resize_factor = 7
//! default_max_pixels = 40000000
//! max_decode_alloc = 1073741824  # Decoder allocation limit in bytes
//!
//! [server]
//! bind = "0.0.0.0"
//! port = 8000                 # Overridden by $PORT, then by --port
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
///
/// All fields have defaults; a user file only needs the keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Transport limits and retry policy.
    pub fetch: FetchConfig,
    /// Resize defaults and decoder limits.
    pub render: RenderConfig,
    /// HTTP listener settings.
    pub server: ServerConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fetch = &self.fetch;
        if fetch.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_bytes must be positive".into(),
            ));
        }
        if fetch.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "fetch.chunk_size must be positive".into(),
            ));
        }
        if fetch.chunk_size as u64 > fetch.max_bytes {
            return Err(ConfigError::Validation(
                "fetch.chunk_size must not exceed fetch.max_bytes".into(),
            ));
        }
        if fetch.connect_timeout_ms == 0 || fetch.read_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "fetch timeouts must be positive".into(),
            ));
        }
        if !fetch.backoff_factor.is_finite() || fetch.backoff_factor < 1.0 {
            return Err(ConfigError::Validation(
                "fetch.backoff_factor must be a finite number >= 1.0".into(),
            ));
        }
        if fetch.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "fetch.user_agent must not be empty".into(),
            ));
        }
        if self.render.default_resize_factor == 0 {
            return Err(ConfigError::Validation(
                "render.default_resize_factor must be at least 1".into(),
            ));
        }
        if self.render.default_max_pixels == 0 {
            return Err(ConfigError::Validation(
                "render.default_max_pixels must be at least 1".into(),
            ));
        }
        if self.render.max_decode_alloc == 0 {
            return Err(ConfigError::Validation(
                "render.max_decode_alloc must be positive".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Transport limits and retry policy for remote fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Hard ceiling on bytes retained from one transfer attempt.
    pub max_bytes: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Granularity of byte accounting while streaming a body.
    pub chunk_size: usize,
    /// Extra attempts for one candidate after a transient failure.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_factor: f64,
    pub max_backoff_ms: u64,
    /// Issue a metadata probe (HEAD) before each full transfer.
    pub probe: bool,
    pub max_redirects: usize,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            chunk_size: 64 * 1024,
            max_retries: 3,
            backoff_base_ms: 250,
            backoff_factor: 2.0,
            max_backoff_ms: 10_000,
            probe: true,
            max_redirects: 10,
            pool_max_idle_per_host: 8,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn default_user_agent() -> String {
    format!("imagevault/{}", env!("CARGO_PKG_VERSION"))
}

/// Resize defaults applied when a request omits or garbles its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub default_resize_factor: u32,
    pub default_max_pixels: u64,
    /// Upper bound on what the codec may allocate while decoding one image.
    pub max_decode_alloc: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_resize_factor: 7,
            default_max_pixels: 40_000_000,
            max_decode_alloc: 1024 * 1024 * 1024,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Apply a `PORT`-style override. `None` leaves the configured port alone.
    pub fn override_port(&mut self, raw: Option<&str>) -> Result<(), ConfigError> {
        let Some(raw) = raw else {
            return Ok(());
        };
        let port: u16 = raw.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("PORT must be a port number, got {raw:?}"))
        })?;
        if port == 0 {
            return Err(ConfigError::Validation("PORT must be non-zero".into()));
        }
        self.port = port;
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the service config.
///
/// With no path the stock defaults are used. A given path must exist; its
/// values are merged over the defaults and the result is validated.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imagevault configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Remote fetching
# ---------------------------------------------------------------------------
[fetch]
# Hard ceiling on bytes read from a remote server in one transfer attempt.
# A transfer that goes over is aborted, whatever Content-Length claimed.
max_bytes = 52428800

# Connect budget, and the budget for response headers / each body read.
connect_timeout_ms = 10000
read_timeout_ms = 10000

# Bytes are accounted against max_bytes in pieces of this size.
chunk_size = 65536

# Transient failures (connection errors, 5xx, 429) are retried per candidate.
# Delay before retry n (0-based) is backoff_base_ms * backoff_factor^n,
# capped at max_backoff_ms.
max_retries = 3
backoff_base_ms = 250
backoff_factor = 2.0
max_backoff_ms = 10000

# Send a HEAD request first so oversized or non-image resources are rejected
# before the transfer starts. Probe failures are never fatal.
probe = true

max_redirects = 10
pool_max_idle_per_host = 8

# Defaults to "imagevault/<version>".
# user_agent = "imagevault"

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Integer downscale applied to each dimension when a request omits one.
default_resize_factor = 7

# Pixel budget (width * height) applied when a request omits one.
default_max_pixels = 40000000

# Most the image decoder may allocate for a single image, in bytes.
max_decode_alloc = 1073741824

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
bind = "0.0.0.0"
# The PORT environment variable overrides this; --port overrides both.
port = 8000
"##
}
