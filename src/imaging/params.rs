//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what files to create) and the [`backend`](super::backend)
//! (which does the pixel work), so a mock backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Background`]: Fill used for the letterbox area of a contain resize.
//! - [`ResizeParams`]: Contain-fit a source onto a square canvas.
//! - [`Mask`]: Shape of a destination-in alpha mask.
//! - [`MaskParams`]: Apply a mask to a canonical image.

use std::path::PathBuf;

/// Canvas fill for the area not covered by the resized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// Fully transparent, used for assets with a meaningful alpha channel.
    Transparent,
    /// Opaque white, used for everything else.
    White,
}

impl Background {
    pub fn for_transparency(transparent: bool) -> Self {
        if transparent {
            Background::Transparent
        } else {
            Background::White
        }
    }

    pub fn rgba(self) -> [u8; 4] {
        match self {
            Background::Transparent => [0, 0, 0, 0],
            Background::White => [255, 255, 255, 255],
        }
    }
}

/// Parameters for a contain-fit resize onto a `size × size` canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub size: u32,
    pub background: Background,
}

/// Shape of a destination-in mask. Source pixels survive only where the
/// mask is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    /// Rounded rectangle covering the full canvas with the given corner radius.
    RoundedRect { radius: u32 },
    /// Circle of radius `size / 2` centered on the canvas.
    Circle,
}

/// Parameters for a masking operation.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub size: u32,
    pub mask: Mask,
}
