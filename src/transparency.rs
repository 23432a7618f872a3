//! Transparency classification.
//!
//! An asset counts as transparent when it has an alpha channel and at least
//! one pixel is not fully opaque. The flag decides the letterbox color of the
//! canonical resize and whether masked variants are generated at all.
//!
//! Images with fewer than four channels are classified from the header
//! alone. Only four-channel images pay for a full decode.

use crate::imaging::{BackendError, ImageBackend};
use std::path::Path;

/// Channels an image needs before its alpha is inspected.
const RGBA_CHANNELS: u8 = 4;

/// Strict classification. Errors surface to the caller.
pub fn classify(backend: &impl ImageBackend, path: &Path) -> Result<bool, BackendError> {
    if backend.channel_count(path)? < RGBA_CHANNELS {
        return Ok(false);
    }
    let alpha = backend.alpha_values(path)?;
    Ok(alpha.iter().any(|&a| a < u8::MAX))
}

/// Soft classification: any error is logged and treated as opaque.
pub fn is_transparent(backend: &impl ImageBackend, path: &Path) -> bool {
    match classify(backend, path) {
        Ok(transparent) => transparent,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "transparency check failed, treating image as opaque"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{write_opaque_png, write_rgba_png, write_transparent_corner_png};
    use tempfile::TempDir;

    // =========================================================================
    // Mock backend
    // =========================================================================

    #[test]
    fn three_channels_skip_pixel_decode() {
        let backend = MockBackend::new();
        assert!(!is_transparent(&backend, Path::new("a.png")));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::ChannelCount("a.png".into())]);
    }

    #[test]
    fn any_partial_alpha_is_transparent() {
        let backend = MockBackend::with_alpha(vec![255, 255, 254, 255]);
        assert!(is_transparent(&backend, Path::new("a.png")));
    }

    #[test]
    fn all_opaque_alpha_is_not_transparent() {
        let backend = MockBackend::with_alpha(vec![255; 16]);
        assert!(!is_transparent(&backend, Path::new("a.png")));
    }

    // =========================================================================
    // Real images
    // =========================================================================

    #[test]
    fn rgb_png_is_opaque() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        write_opaque_png(&path, 32, 32);
        assert!(!is_transparent(&RustBackend::new(), &path));
    }

    #[test]
    fn rgba_png_with_clear_corner_is_transparent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ghost.png");
        write_transparent_corner_png(&path, 32, 32);
        assert!(is_transparent(&RustBackend::new(), &path));
    }

    #[test]
    fn rgba_png_fully_opaque_is_not_transparent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("solid.png");
        write_rgba_png(&path, 8, 8, |_, _| [1, 2, 3, 255]);
        assert!(!is_transparent(&RustBackend::new(), &path));
    }

    #[test]
    fn decode_error_is_soft_false() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"garbage").unwrap();

        assert!(classify(&RustBackend::new(), &path).is_err());
        assert!(!is_transparent(&RustBackend::new(), &path));
    }
}
