//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP, ICO) | `image` crate (pure Rust decoders) |
//! | Channel count | `ImageDecoder::color_type` (header only) |
//! | Alpha extraction | `DynamicImage::to_rgba8` |
//! | Resize | `resize_exact` with `Lanczos3`, then `imageops::replace` onto a filled canvas |
//! | Mask | per-pixel alpha × supersampled coverage |
//! | Encode | PNG via `save_with_format` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    MaskShape, apply_coverage, calculate_contain_dimensions, centered_offset, mask_coverage,
};
use super::params::{Mask, MaskParams, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
    ("ico", ImageFormat::Ico),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
}

/// Load and decode an image from disk. The format is sniffed from content so
/// a mislabelled extension still decodes.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| decode_error(path, e))
}

/// Encode as PNG regardless of the output path's extension, so temp files
/// with non-image suffixes work.
fn save_png(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    img.save_with_format(path, ImageFormat::Png).map_err(|e| {
        BackendError::ProcessingFailed(format!("PNG encode failed for {}: {}", path.display(), e))
    })
}

/// Reduce exotic color types to 8-bit RGB or RGBA so PNG can always encode
/// them, keeping alpha when present.
fn to_png_compatible(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn channel_count(&self, path: &Path) -> Result<u8, BackendError> {
        let decoder = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .into_decoder()
            .map_err(|e| decode_error(path, e))?;
        Ok(decoder.color_type().channel_count())
    }

    fn alpha_values(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
        let rgba = load_image(path)?.to_rgba8();
        Ok(rgba.pixels().map(|p| p[3]).collect())
    }

    fn convert_to_png(&self, source: &Path, output: &Path) -> Result<(), BackendError> {
        let img = load_image(source)?;
        save_png(&to_png_compatible(img), output)
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let (w, h) = calculate_contain_dimensions((img.width(), img.height()), params.size);
        let fitted = img.resize_exact(w, h, FilterType::Lanczos3).to_rgba8();

        let mut canvas =
            RgbaImage::from_pixel(params.size, params.size, Rgba(params.background.rgba()));
        let (x, y) = centered_offset((w, h), params.size);
        image::imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);

        save_png(&DynamicImage::ImageRgba8(canvas), &params.output)
    }

    fn mask(&self, params: &MaskParams) -> Result<(), BackendError> {
        let mut rgba = load_image(&params.source)?.to_rgba8();
        if rgba.width() != params.size || rgba.height() != params.size {
            return Err(BackendError::ProcessingFailed(format!(
                "{} is {}x{}, expected {}x{} canonical image",
                params.source.display(),
                rgba.width(),
                rgba.height(),
                params.size,
                params.size
            )));
        }

        let shape = match params.mask {
            Mask::RoundedRect { radius } => MaskShape::RoundedRect { radius },
            Mask::Circle => MaskShape::Circle,
        };
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let coverage = mask_coverage(shape, params.size, x, y);
            pixel[3] = apply_coverage(pixel[3], coverage);
        }

        save_png(&DynamicImage::ImageRgba8(rgba), &params.output)
    }
}
