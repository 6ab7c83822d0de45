//! High-level image operations.
//!
//! These functions combine calculations with backend execution: decode the
//! fetched bytes, plan the two resize stages, and run only the stages the plan
//! says are needed.

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::calculations::{ResizePlan, plan_resize};
use super::params::ResizeParams;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// A decoded image reduced to fit its request, plus how it got there.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: DecodedImage,
    pub plan: ResizePlan,
}

impl NormalizedImage {
    pub fn original_size(&self) -> (u32, u32) {
        self.plan.original
    }
}

/// Decode `bytes` and apply the factor reduction and pixel-budget clamp.
///
/// With a factor of 1 and a source already within budget the decoded pixels
/// are returned as-is; the backend's resize is never called.
pub fn normalize_image(
    backend: &impl ImageBackend,
    bytes: &[u8],
    params: &ResizeParams,
) -> Result<NormalizedImage> {
    let (decoded, plan) = decode_and_plan(backend, bytes, params)?;
    let image = apply_plan(backend, decoded, &plan)?;
    Ok(NormalizedImage { image, plan })
}

/// Decode `bytes` and work out the resize plan without running it.
///
/// Callers that report decode and resize failures differently use this
/// together with [`apply_plan`].
pub fn decode_and_plan(
    backend: &impl ImageBackend,
    bytes: &[u8],
    params: &ResizeParams,
) -> Result<(DecodedImage, ResizePlan)> {
    let decoded = backend.decode(bytes)?;
    let plan = plan_resize(
        (decoded.width(), decoded.height()),
        params.factor.value(),
        params.max_pixels.value(),
    );
    Ok((decoded, plan))
}

/// Run the resize stages of `plan` on an already decoded image.
pub fn apply_plan(
    backend: &impl ImageBackend,
    image: DecodedImage,
    plan: &ResizePlan,
) -> Result<DecodedImage> {
    let mut image = image;
    if let Some((w, h)) = plan.stage1_resize() {
        image = backend.resize(image, w, h)?;
    }
    if let Some((w, h)) = plan.stage2_resize() {
        image = backend.resize(image, w, h)?;
    }
    Ok(image)
}
