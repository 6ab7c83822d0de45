//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: decode (bytes → canonical RGB8 pixels) and resize.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure-Rust codecs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Pixel buffer of {actual} bytes does not match {width}x{height} RGB")]
    BufferMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Width and height of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded image in the canonical color model: row-major, 3 channels
/// (R, G, B), one byte per channel.
///
/// Construction checks `width * height * 3 == pixels.len()`, so every value of
/// this type satisfies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Bytes per pixel in the canonical color model.
    pub const CHANNELS: usize = 3;

    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BackendError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(Self::CHANNELS));
        if width == 0 || height == 0 || expected != Some(pixels.len()) {
            return Err(BackendError::BufferMismatch {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Trait for image processing backends.
///
/// Decoding must normalize to [`DecodedImage`]'s color model whatever the
/// source channel layout was; resizing must never return a zero dimension.
pub trait ImageBackend: Sync {
    /// Decode an untrusted byte buffer into canonical RGB8 pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Resample `image` to exactly `width` x `height`.
    fn resize(
        &self,
        image: DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<DecodedImage, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without touching a codec.
    /// Uses Mutex (not RefCell) so it is Sync.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode {
            len: usize,
        },
        Resize {
            from: (u32, u32),
            to: (u32, u32),
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: Mutex::new(dims),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    pub fn gray_image(width: u32, height: u32) -> DecodedImage {
        DecodedImage::from_raw(width, height, vec![128; (width * height * 3) as usize]).unwrap()
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode { len: bytes.len() });

            let dims = self
                .decode_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))?;
            Ok(gray_image(dims.width, dims.height))
        }

        fn resize(
            &self,
            image: DecodedImage,
            width: u32,
            height: u32,
        ) -> Result<DecodedImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                from: (image.width(), image.height()),
                to: (width, height),
            });
            Ok(gray_image(width, height))
        }
    }

    #[test]
    fn from_raw_accepts_matching_buffer() {
        let img = DecodedImage::from_raw(4, 2, vec![0; 24]).unwrap();
        assert_eq!(img.dimensions(), Dimensions { width: 4, height: 2 });
        assert_eq!(img.pixels().len(), 24);
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let result = DecodedImage::from_raw(4, 2, vec![0; 32]);
        assert!(matches!(
            result,
            Err(BackendError::BufferMismatch { actual: 32, .. })
        ));
    }

    #[test]
    fn from_raw_rejects_zero_dimension() {
        assert!(DecodedImage::from_raw(0, 5, Vec::new()).is_err());
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let img = backend.decode(&[1, 2, 3]).unwrap();
        assert_eq!(img.width(), 800);
        assert_eq!(img.height(), 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Decode { len: 3 }]);
    }

    #[test]
    fn mock_records_resize() {
        let backend = MockBackend::new();
        let out = backend.resize(gray_image(10, 10), 5, 4).unwrap();
        assert_eq!((out.width(), out.height()), (5, 4));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resize {
                from: (10, 10),
                to: (5, 4)
            }]
        );
    }
}
