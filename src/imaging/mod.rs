//! Image processing: pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Channels** | decoder header, no pixel decode |
//! | **Normalize → PNG** | decode + `save_with_format(Png)` |
//! | **Contain resize** | Lanczos3 + centered overlay on a filled canvas |
//! | **Radius / round masks** | destination-in with supersampled coverage |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry and mask math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_contain_dimensions, needs_upscale};
pub use operations::{
    CanonicalConfig, VariantPaths, create_variants, get_dimensions, normalize_to_png,
    remove_variants, resize_canonical,
};
pub use params::{Background, Mask, MaskParams, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
