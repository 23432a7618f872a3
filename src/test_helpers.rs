//! Shared test utilities for the iconsync test suite.
//!
//! Generates small synthetic images on disk so tests exercise the real
//! decoders without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_opaque_png(&tmp.path().join("logo.png"), 64, 64);
//! write_transparent_corner_png(&tmp.path().join("ghost.png"), 64, 64);
//! ```

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Image writers
// =========================================================================

/// Three-channel PNG with a gradient so resized output differs from white.
pub fn write_opaque_png(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 200) as u8, (y % 200) as u8, 64])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Four-channel PNG, fully opaque except pixel (0, 0) which has alpha 0.
pub fn write_transparent_corner_png(path: &Path, width: u32, height: u32) {
    write_rgba_png(path, width, height, |x, y| {
        if x == 0 && y == 0 {
            [0, 0, 0, 0]
        } else {
            [30, 140, 200, 255]
        }
    });
}

/// Four-channel PNG with every pixel supplied by `f`.
pub fn write_rgba_png(path: &Path, width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) {
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba(f(x, y)));
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Baseline JPEG.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}
