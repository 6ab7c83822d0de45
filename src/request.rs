//! Request parsing and validation.
//!
//! Everything here runs before any network I/O. A request that fails here is
//! answered as a client error straight away.
//!
//! Numeric options are forgiving: a missing, non-positive, or non-numeric
//! `resize_factor` / `max_pixels` falls back to the configured default.
//! Integer-valued strings (`"5"`) and integral floats (`5.0`) are accepted.
//! The locator is strict: it must parse as an absolute URI with a host.

use crate::config::{FetchConfig, RenderConfig};
use crate::fetch::{Locator, TransferLimits};
use crate::imaging::{PixelBudget, ResizeFactor, ResizeParams};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing 'url' field in request body")]
    MissingLocator,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Malformed URL {locator:?}: {reason}")]
    MalformedLocator { locator: String, reason: String },
}

/// A render request as received, with options already coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub url: String,
    pub resize: ResizeParams,
}

impl RenderRequest {
    /// Parse a JSON request body.
    pub fn from_json_slice(body: &[u8], defaults: &RenderConfig) -> Result<Self, InputError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| InputError::InvalidBody(e.to_string()))?;
        Self::from_value(&value, defaults)
    }

    /// Build from an already parsed JSON value.
    pub fn from_value(value: &Value, defaults: &RenderConfig) -> Result<Self, InputError> {
        let Value::Object(fields) = value else {
            return Err(InputError::InvalidBody("expected a JSON object".into()));
        };
        let url = fields
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(InputError::MissingLocator)?;

        let factor = coerce_positive(fields.get("resize_factor"))
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.default_resize_factor);
        let max_pixels =
            coerce_positive(fields.get("max_pixels")).unwrap_or(defaults.default_max_pixels);

        Ok(Self {
            url: url.to_string(),
            resize: ResizeParams {
                factor: ResizeFactor::new(factor),
                max_pixels: PixelBudget::new(max_pixels),
            },
        })
    }
}

/// Interpret an optional JSON value as a positive integer.
fn coerce_positive(value: Option<&Value>) -> Option<u64> {
    let n = match value? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 1.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}

/// One pipeline run: where to fetch from, how much to accept, how to shrink.
///
/// Immutable once built. The locator has already been validated.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub locator: Locator,
    pub limits: TransferLimits,
    pub resize: ResizeParams,
}

impl FetchRequest {
    pub fn new(
        locator: &str,
        limits: TransferLimits,
        resize: ResizeParams,
    ) -> Result<Self, InputError> {
        Ok(Self {
            locator: Locator::parse(locator)?,
            limits,
            resize,
        })
    }

    /// Validate a parsed render request against the fetch config.
    pub fn from_render(request: &RenderRequest, fetch: &FetchConfig) -> Result<Self, InputError> {
        Self::new(&request.url, TransferLimits::from(fetch), request.resize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> RenderConfig {
        RenderConfig::default()
    }

    #[test]
    fn parses_full_body() {
        let body = br#"{"url": "https://example.com/a.png", "resize_factor": 3, "max_pixels": 5000}"#;
        let req = RenderRequest::from_json_slice(body, &defaults()).unwrap();
        assert_eq!(req.url, "https://example.com/a.png");
        assert_eq!(req.resize.factor.value(), 3);
        assert_eq!(req.resize.max_pixels.value(), 5000);
    }

    #[test]
    fn missing_options_use_defaults() {
        let req = RenderRequest::from_value(&json!({"url": "http://x.test/a.jpg"}), &defaults())
            .unwrap();
        assert_eq!(req.resize.factor.value(), 7);
        assert_eq!(req.resize.max_pixels.value(), 40_000_000);
    }

    #[test]
    fn non_positive_options_use_defaults() {
        let req = RenderRequest::from_value(
            &json!({"url": "http://x.test/a.jpg", "resize_factor": 0, "max_pixels": -4}),
            &defaults(),
        )
        .unwrap();
        assert_eq!(req.resize.factor.value(), 7);
        assert_eq!(req.resize.max_pixels.value(), 40_000_000);
    }

    #[test]
    fn non_numeric_options_use_defaults() {
        let req = RenderRequest::from_value(
            &json!({"url": "http://x.test/a.jpg", "resize_factor": "big", "max_pixels": [1]}),
            &defaults(),
        )
        .unwrap();
        assert_eq!(req.resize.factor.value(), 7);
        assert_eq!(req.resize.max_pixels.value(), 40_000_000);
    }

    #[test]
    fn numeric_strings_and_integral_floats_accepted() {
        let req = RenderRequest::from_value(
            &json!({"url": "http://x.test/a.jpg", "resize_factor": " 2 ", "max_pixels": 1000.0}),
            &defaults(),
        )
        .unwrap();
        assert_eq!(req.resize.factor.value(), 2);
        assert_eq!(req.resize.max_pixels.value(), 1000);
    }

    #[test]
    fn fractional_float_uses_default() {
        let req = RenderRequest::from_value(
            &json!({"url": "http://x.test/a.jpg", "resize_factor": 2.5}),
            &defaults(),
        )
        .unwrap();
        assert_eq!(req.resize.factor.value(), 7);
    }

    #[test]
    fn missing_url_rejected() {
        let result = RenderRequest::from_value(&json!({"max_pixels": 10}), &defaults());
        assert_eq!(result, Err(InputError::MissingLocator));

        let result = RenderRequest::from_value(&json!({"url": "   "}), &defaults());
        assert_eq!(result, Err(InputError::MissingLocator));
    }

    #[test]
    fn invalid_json_rejected() {
        let result = RenderRequest::from_json_slice(b"{not json", &defaults());
        assert!(matches!(result, Err(InputError::InvalidBody(_))));
    }

    #[test]
    fn non_object_rejected() {
        let result = RenderRequest::from_value(&json!(["http://x.test"]), &defaults());
        assert!(matches!(result, Err(InputError::InvalidBody(_))));
    }

    #[test]
    fn fetch_request_validates_locator() {
        let req = RenderRequest::from_value(&json!({"url": "not a url"}), &defaults()).unwrap();
        let result = FetchRequest::from_render(&req, &FetchConfig::default());
        assert!(matches!(
            result,
            Err(InputError::MalformedLocator { .. })
        ));
    }

    #[test]
    fn fetch_request_carries_limits() {
        let req = RenderRequest::from_value(&json!({"url": "https://example.com/a.png"}), &defaults())
            .unwrap();
        let fetch = FetchConfig {
            max_bytes: 4096,
            ..FetchConfig::default()
        };
        let request = FetchRequest::from_render(&req, &fetch).unwrap();
        assert_eq!(request.limits.max_bytes, 4096);
        assert_eq!(request.locator.as_str(), "https://example.com/a.png");
    }
}
