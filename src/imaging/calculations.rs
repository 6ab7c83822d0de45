//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions after dividing each side by an integer factor.
///
/// Integer division, never below 1 pixel.
///
/// # Examples
/// ```
/// # use imagevault::imaging::calculate_factor_dimensions;
/// assert_eq!(calculate_factor_dimensions((3000, 2000), 7), (428, 285));
/// assert_eq!(calculate_factor_dimensions((5, 3), 10), (1, 1));
/// ```
pub fn calculate_factor_dimensions(original: (u32, u32), factor: u32) -> (u32, u32) {
    let (w, h) = original;
    let factor = factor.max(1);
    ((w / factor).max(1), (h / factor).max(1))
}

/// Shrink `size` proportionally until `width * height <= max_pixels`.
///
/// Sizes already within budget are returned unchanged. Otherwise each side is
/// multiplied by `sqrt(max_pixels / (width * height))` and floored, never
/// below 1. If the 1-pixel floor or float rounding leaves the product over
/// budget, the longer side is cut to fit.
///
/// # Examples
/// ```
/// # use imagevault::imaging::calculate_budget_dimensions;
/// assert_eq!(calculate_budget_dimensions((9000, 6000), 1_000_000), (1224, 816));
/// assert_eq!(calculate_budget_dimensions((428, 285), 40_000_000), (428, 285));
/// ```
pub fn calculate_budget_dimensions(size: (u32, u32), max_pixels: u64) -> (u32, u32) {
    let (w, h) = size;
    let max_pixels = max_pixels.max(1);
    let total = w as u64 * h as u64;
    if total <= max_pixels {
        return size;
    }

    let scale = (max_pixels as f64 / total as f64).sqrt();
    let mut out_w = ((w as f64 * scale).floor() as u32).max(1).min(w.max(1));
    let mut out_h = ((h as f64 * scale).floor() as u32).max(1).min(h.max(1));

    if out_w as u64 * out_h as u64 > max_pixels {
        if out_w >= out_h {
            out_w = fit_side(max_pixels, out_h);
        } else {
            out_h = fit_side(max_pixels, out_w);
        }
    }
    // Only reachable when the first cut bottomed out at 1.
    if out_w as u64 * out_h as u64 > max_pixels {
        if out_w >= out_h {
            out_w = fit_side(max_pixels, out_h);
        } else {
            out_h = fit_side(max_pixels, out_w);
        }
    }

    (out_w, out_h)
}

fn fit_side(max_pixels: u64, other: u32) -> u32 {
    (max_pixels / other.max(1) as u64).clamp(1, u32::MAX as u64) as u32
}

/// The two-stage resize derived from a source size and a request.
///
/// Stage 1 applies the requested integer factor; stage 2 enforces the pixel
/// budget on the stage 1 result. Either stage may be a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub original: (u32, u32),
    pub stage1: (u32, u32),
    pub final_size: (u32, u32),
}

impl ResizePlan {
    /// Target of the factor reduction, if it changes the size.
    pub fn stage1_resize(&self) -> Option<(u32, u32)> {
        (self.stage1 != self.original).then_some(self.stage1)
    }

    /// Target of the budget clamp, if the stage 1 size is over budget.
    pub fn stage2_resize(&self) -> Option<(u32, u32)> {
        (self.final_size != self.stage1).then_some(self.final_size)
    }

    /// True when the source is returned untouched.
    pub fn is_noop(&self) -> bool {
        self.final_size == self.original && self.stage1 == self.original
    }
}

/// Plan both resize stages for an image of `original` size.
pub fn plan_resize(original: (u32, u32), factor: u32, max_pixels: u64) -> ResizePlan {
    let stage1 = calculate_factor_dimensions(original, factor);
    let final_size = calculate_budget_dimensions(stage1, max_pixels);
    ResizePlan {
        original,
        stage1,
        final_size,
    }
}
