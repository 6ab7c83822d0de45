//! Image processing: pure Rust, no system codecs.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader`, full-buffer fallback |
//! | **Normalize** | `into_rgb8` (alpha dropped) |
//! | **Resize** | Lanczos3 via `image::imageops::resize` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for the two-stage resize plan (unit testable)
//! - **Parameters**: Resize factor and pixel budget
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Decode, plan, and resize in one call

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, Dimensions, ImageBackend};
pub use calculations::{
    ResizePlan, calculate_budget_dimensions, calculate_factor_dimensions, plan_resize,
};
pub use operations::{NormalizedImage, apply_plan, decode_and_plan, normalize_image};
pub use params::{PixelBudget, ResizeFactor, ResizeParams};
pub use rust_backend::{RESIZE_FILTER, RustBackend};
