//! Raw pixel output.
//!
//! The wire form of a rendered image is positional: `width * height * 3`
//! bytes, row-major, channel order R, G, B, no header and no compression.
//! Width and height travel next to the buffer, never inside it.

use crate::imaging::DecodedImage;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("raw buffer is {actual} bytes, expected {expected} for {width}x{height} RGB")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: u64,
        actual: u64,
    },
}

/// A rendered image ready for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawImage {
    /// Standard base64 of [`data`](Self::data), for text-only transports.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Serialize decoded pixels into the raw wire form.
///
/// The canonical pixel layout already is the wire layout, so this moves the
/// buffer without copying. The length is still checked: a mismatch here means
/// a backend broke its contract.
pub fn encode_raw(image: DecodedImage) -> Result<RawImage, EncodeError> {
    let (width, height) = (image.width(), image.height());
    let expected = width as u64 * height as u64 * DecodedImage::CHANNELS as u64;
    let data = image.into_pixels();
    if data.len() as u64 != expected {
        return Err(EncodeError::LengthMismatch {
            width,
            height,
            expected,
            actual: data.len() as u64,
        });
    }
    Ok(RawImage {
        width,
        height,
        data,
    })
}
