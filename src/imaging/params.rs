//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between request handling (which decides the targets) and the
//! [`operations`](super::operations) module (which plans and runs resizes on a
//! [`backend`](super::backend)).
//!
//! ## Types
//!
//! - [`ResizeFactor`]: Integer downscale per dimension (≥ 1). Clamped on construction.
//! - [`PixelBudget`]: Maximum `width * height` of the output (≥ 1). Clamped on construction.
//! - [`ResizeParams`]: Both of the above, as carried by one render request.

/// Integer factor each dimension is divided by in the first resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeFactor(u32);

impl ResizeFactor {
    pub fn new(value: u32) -> Self {
        Self(value.max(1))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for ResizeFactor {
    fn default() -> Self {
        Self(7)
    }
}

/// Upper bound on total output pixels, enforced after the factor reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBudget(u64);

impl PixelBudget {
    pub fn new(value: u64) -> Self {
        Self(value.max(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl Default for PixelBudget {
    fn default() -> Self {
        Self(40_000_000)
    }
}

/// Resize targets for one render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeParams {
    pub factor: ResizeFactor,
    pub max_pixels: PixelBudget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_factor_clamps_to_one() {
        assert_eq!(ResizeFactor::new(0).value(), 1);
        assert_eq!(ResizeFactor::new(3).value(), 3);
    }

    #[test]
    fn pixel_budget_clamps_to_one() {
        assert_eq!(PixelBudget::new(0).value(), 1);
        assert_eq!(PixelBudget::new(1_000).value(), 1_000);
    }

    #[test]
    fn defaults_match_service_defaults() {
        let params = ResizeParams::default();
        assert_eq!(params.factor.value(), 7);
        assert_eq!(params.max_pixels.value(), 40_000_000);
    }
}
