//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode PNG | `png::Decoder`, one row at a time |
//! | Decode (JPEG, GIF, TIFF, WebP, BMP) | `image::ImageReader` with allocation [`Limits`] |
//! | Normalize | `DynamicImage::into_rgb8` (alpha dropped, not composited) |
//! | Resize | `image::imageops::resize` with [`RESIZE_FILTER`] |
//!
//! ## Decode strategy
//!
//! Bytes come from untrusted servers and may be cut short. The first attempt
//! is incremental: a PNG is decoded row by row and, when the data runs out,
//! the rows that arrived are kept and the rest are left black. Other formats
//! go through a format-sniffing reader. If that fails, one full-buffer decode
//! runs on a repaired copy (a truncated JPEG gets its end-of-image marker
//! back). Only when both fail is the payload rejected.
//!
//! Truncation is therefore tolerated for non-interlaced PNG and for JPEG.
//! GIF, TIFF, WebP, BMP and interlaced PNG must arrive whole. Embedded color
//! profiles are ignored.

use super::backend::{BackendError, DecodedImage, ImageBackend};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits, RgbImage};
use std::borrow::Cow;
use std::io::Cursor;

/// Resampling filter for both resize stages. Output pixels depend on it.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Default decoder allocation limit (1 GiB).
pub const DEFAULT_MAX_DECODE_ALLOC: u64 = 1024 * 1024 * 1024;

const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone)]
pub struct RustBackend {
    max_decode_alloc: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_max_decode_alloc(DEFAULT_MAX_DECODE_ALLOC)
    }

    /// Cap what the codec may allocate for one image.
    pub fn with_max_decode_alloc(max_decode_alloc: u64) -> Self {
        Self { max_decode_alloc }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_decode_alloc);
        limits
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// First decode attempt: row by row for PNG, a sniffing reader otherwise.
fn decode_incremental(
    bytes: &[u8],
    limits: Limits,
    max_alloc: u64,
) -> Result<DynamicImage, BackendError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => decode_png_rows(bytes, max_alloc).map(DynamicImage::ImageRgb8),
        _ => {
            let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
            reader.limits(limits);
            reader.decode().map_err(|e| BackendError::Decode(e.to_string()))
        }
    }
}

/// Decode a non-interlaced PNG straight to RGB8, one row at a time.
///
/// A payload that ends early keeps every complete row; missing rows stay
/// black. At least one row must decode.
fn decode_png_rows(bytes: &[u8], max_alloc: u64) -> Result<RgbImage, BackendError> {
    let png_err = |e: png::DecodingError| BackendError::Decode(e.to_string());
    let limits = png::Limits {
        bytes: usize::try_from(max_alloc).unwrap_or(usize::MAX),
    };
    let mut decoder = png::Decoder::new_with_limits(Cursor::new(bytes), limits);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(png_err)?;

    let (width, height) = (reader.info().width, reader.info().height);
    if reader.info().interlaced {
        return Err(BackendError::Decode("interlaced PNG".into()));
    }
    if width == 0 || height == 0 {
        return Err(BackendError::Decode(format!("empty {width}x{height} PNG")));
    }
    let (color, _) = reader.output_color_type();
    if color == png::ColorType::Indexed {
        return Err(BackendError::Decode("palette was not expanded".into()));
    }
    let channels = color.samples();

    let size = u64::from(width) * u64::from(height) * 3;
    if size > max_alloc {
        return Err(BackendError::Decode(format!(
            "{width}x{height} image needs {size} bytes, limit is {max_alloc}"
        )));
    }
    let size = usize::try_from(size)
        .map_err(|_| BackendError::Decode(format!("{width}x{height} image too large")))?;
    let mut pixels = vec![0u8; size];

    let mut rows = 0u32;
    let mut cut_short = None;
    for out in pixels.chunks_exact_mut(width as usize * 3) {
        match reader.next_row() {
            Ok(Some(row)) => {
                for (dst, src) in out.chunks_exact_mut(3).zip(row.data().chunks_exact(channels)) {
                    if channels >= 3 {
                        dst.copy_from_slice(&src[..3]);
                    } else {
                        dst.fill(src[0]);
                    }
                }
                rows += 1;
            }
            Ok(None) => break,
            Err(e) => {
                cut_short = Some(e);
                break;
            }
        }
    }

    match cut_short {
        Some(e) if rows == 0 => return Err(png_err(e)),
        Some(e) => tracing::debug!(rows, height, error = %e, "PNG ended early, keeping decoded rows"),
        None if rows == 0 => return Err(BackendError::Decode("PNG has no image rows".into())),
        None => {}
    }
    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| BackendError::Decode(format!("invalid {width}x{height} pixel buffer")))
}

/// Decode the whole buffer with an explicitly detected format, after repair.
fn decode_full_buffer(bytes: &[u8], limits: Limits) -> Result<DynamicImage, BackendError> {
    let format = image::guess_format(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
    let repaired = repair_truncated(bytes, format);
    let mut reader = ImageReader::with_format(Cursor::new(repaired.as_ref()), format);
    reader.limits(limits);
    reader.decode().map_err(|e| BackendError::Decode(e.to_string()))
}

/// Patch up truncations the codec can otherwise read past.
///
/// JPEG is the only format handled: a payload cut before its end-of-image
/// marker gets one appended so the decoder keeps whatever scans arrived.
fn repair_truncated(bytes: &[u8], format: ImageFormat) -> Cow<'_, [u8]> {
    if format == ImageFormat::Jpeg && !bytes.ends_with(&JPEG_EOI) {
        let mut owned = Vec::with_capacity(bytes.len() + JPEG_EOI.len());
        owned.extend_from_slice(bytes);
        owned.extend_from_slice(&JPEG_EOI);
        Cow::Owned(owned)
    } else {
        Cow::Borrowed(bytes)
    }
}

/// Convert any decoded layout into canonical RGB8.
fn normalize(img: DynamicImage) -> Result<DecodedImage, BackendError> {
    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    DecodedImage::from_raw(width, height, rgb.into_raw())
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        if bytes.is_empty() {
            return Err(BackendError::Decode("empty payload".into()));
        }
        let img = match decode_incremental(bytes, self.limits(), self.max_decode_alloc) {
            Ok(img) => img,
            Err(first) => {
                tracing::debug!(error = %first, "incremental decode failed, trying full-buffer decode");
                decode_full_buffer(bytes, self.limits()).map_err(|second| {
                    BackendError::Decode(format!("{first}; full-buffer fallback: {second}"))
                })?
            }
        };
        normalize(img)
    }

    fn resize(
        &self,
        image: DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, BackendError> {
        let (src_w, src_h) = (image.width(), image.height());
        let rgb = RgbImage::from_raw(src_w, src_h, image.into_pixels()).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("invalid {src_w}x{src_h} pixel buffer"))
        })?;
        let resized = image::imageops::resize(&rgb, width.max(1), height.max(1), RESIZE_FILTER);
        let (out_w, out_h) = resized.dimensions();
        DecodedImage::from_raw(out_w, out_h, resized.into_raw())
    }
}
