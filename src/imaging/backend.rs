//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines every pixel-level operation the pipeline
//! needs: identify, channel inspection, alpha extraction, png normalization,
//! contain resize, and destination-in masking.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests substitute [`tests::MockBackend`], which records operations
//! without touching pixels.

use super::params::{MaskParams, ResizeParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared by every rayon worker.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Number of color channels, read from the file header without decoding
    /// pixel data.
    fn channel_count(&self, path: &Path) -> Result<u8, BackendError>;

    /// Decode the image and return one 8-bit alpha value per pixel.
    fn alpha_values(&self, path: &Path) -> Result<Vec<u8>, BackendError>;

    /// Re-encode any supported format to png, preserving alpha.
    fn convert_to_png(&self, source: &Path, output: &Path) -> Result<(), BackendError>;

    /// Contain-fit resize onto a square canvas.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Destination-in composite against a mask shape.
    fn mask(&self, params: &MaskParams) -> Result<(), BackendError>;
}
