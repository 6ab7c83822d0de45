//! Shared test utilities.
//!
//! Image fixtures are encoded in memory with the `image` crate so tests never
//! depend on files on disk. Fixture HTTP servers are real axum routers bound to
//! an ephemeral localhost port, so fetch tests exercise the real transport.

use axum::Router;
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::net::SocketAddr;

// =========================================================================
// Image fixtures
// =========================================================================

/// A horizontal gradient, so resampling has something to work on.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 128])
    })
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

/// Uniform RGBA image, every pixel set to `pixel`.
pub fn encode_png_rgba(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Uniform single-channel image.
pub fn encode_png_gray(width: u32, height: u32, value: u8) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, image::Luma([value]));
    encode(DynamicImage::ImageLuma8(img), ImageFormat::Png)
}

// =========================================================================
// Fixture servers
// =========================================================================

/// Serve `app` on `127.0.0.1:0` in the background and return its address.
///
/// The server lives until the test's runtime shuts down.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
