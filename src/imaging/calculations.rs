//! Pure calculation functions for canonical geometry and masks.
//!
//! All functions here are pure and testable without any I/O or images.

/// Samples per axis when estimating mask coverage of one pixel.
const SUPERSAMPLE: u32 = 4;

/// Calculate the size of a source image after a contain fit into a square box.
///
/// The result preserves the source aspect ratio, fits entirely inside
/// `box_size × box_size`, and touches the box on at least one axis. Both
/// dimensions are at least 1.
///
/// # Examples
/// ```
/// # use iconsync::imaging::calculate_contain_dimensions;
/// assert_eq!(calculate_contain_dimensions((1000, 500), 512), (512, 256));
/// assert_eq!(calculate_contain_dimensions((64, 64), 512), (512, 512));
/// ```
pub fn calculate_contain_dimensions(source: (u32, u32), box_size: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return (box_size, box_size);
    }
    let scale = (box_size as f64 / src_w as f64).min(box_size as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, box_size);
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, box_size);
    (w, h)
}

/// Top-left offset that centers an `inner` rectangle inside a square box.
pub fn centered_offset(inner: (u32, u32), box_size: u32) -> (u32, u32) {
    (
        box_size.saturating_sub(inner.0) / 2,
        box_size.saturating_sub(inner.1) / 2,
    )
}

/// Whether an image is small enough to be sent to the upscaler.
///
/// True when either edge is below `threshold` (target size × scale factor).
pub fn needs_upscale(dims: (u32, u32), threshold: u32) -> bool {
    dims.0 < threshold || dims.1 < threshold
}

/// Whether a point lies inside a `size × size` rounded rectangle.
///
/// Coordinates are continuous: pixel `(x, y)` spans `[x, x+1) × [y, y+1)`.
pub fn rounded_rect_contains(px: f64, py: f64, size: u32, radius: u32) -> bool {
    let s = size as f64;
    if px < 0.0 || py < 0.0 || px > s || py > s {
        return false;
    }
    let r = (radius as f64).min(s / 2.0);
    // Nearest point on the inner rectangle whose Minkowski sum with a disk of
    // radius r is the rounded rectangle.
    let cx = px.clamp(r, s - r);
    let cy = py.clamp(r, s - r);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

/// Whether a point lies inside the circle inscribed in a `size × size` canvas.
pub fn circle_contains(px: f64, py: f64, size: u32) -> bool {
    let c = size as f64 / 2.0;
    let (dx, dy) = (px - c, py - c);
    dx * dx + dy * dy <= c * c
}

/// Shape tested by [`mask_coverage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskShape {
    RoundedRect { radius: u32 },
    Circle,
}

/// Fraction (0.0–1.0) of pixel `(x, y)` covered by the mask shape.
///
/// Estimated with a regular `SUPERSAMPLE × SUPERSAMPLE` grid so mask edges
/// come out anti-aliased.
pub fn mask_coverage(shape: MaskShape, size: u32, x: u32, y: u32) -> f32 {
    let step = 1.0 / SUPERSAMPLE as f64;
    let mut inside = 0u32;
    for j in 0..SUPERSAMPLE {
        for i in 0..SUPERSAMPLE {
            let px = x as f64 + (i as f64 + 0.5) * step;
            let py = y as f64 + (j as f64 + 0.5) * step;
            let hit = match shape {
                MaskShape::RoundedRect { radius } => rounded_rect_contains(px, py, size, radius),
                MaskShape::Circle => circle_contains(px, py, size),
            };
            if hit {
                inside += 1;
            }
        }
    }
    inside as f32 / (SUPERSAMPLE * SUPERSAMPLE) as f32
}

/// Destination-in: scale a source alpha by mask coverage.
pub fn apply_coverage(alpha: u8, coverage: f32) -> u8 {
    (alpha as f32 * coverage.clamp(0.0, 1.0)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_contain_dimensions tests
    // =========================================================================

    #[test]
    fn contain_square_upscales_to_box() {
        assert_eq!(calculate_contain_dimensions((64, 64), 512), (512, 512));
    }

    #[test]
    fn contain_landscape() {
        // 2:1 → width touches, height halves
        assert_eq!(calculate_contain_dimensions((1000, 500), 512), (512, 256));
    }

    #[test]
    fn contain_portrait() {
        assert_eq!(calculate_contain_dimensions((300, 900), 512), (171, 512));
    }

    #[test]
    fn contain_extreme_aspect_keeps_one_pixel() {
        assert_eq!(calculate_contain_dimensions((10000, 1), 512), (512, 1));
    }

    #[test]
    fn contain_degenerate_source_fills_box() {
        assert_eq!(calculate_contain_dimensions((0, 10), 512), (512, 512));
    }

    // =========================================================================
    // centered_offset tests
    // =========================================================================

    #[test]
    fn offset_centers_letterbox() {
        assert_eq!(centered_offset((512, 256), 512), (0, 128));
        assert_eq!(centered_offset((171, 512), 512), (170, 0));
    }

    #[test]
    fn offset_zero_when_filling() {
        assert_eq!(centered_offset((512, 512), 512), (0, 0));
    }

    // =========================================================================
    // needs_upscale tests
    // =========================================================================

    #[test]
    fn upscale_when_either_edge_small() {
        assert!(needs_upscale((512, 512), 2048));
        assert!(needs_upscale((4096, 2000), 2048));
        assert!(needs_upscale((2000, 4096), 2048));
    }

    #[test]
    fn no_upscale_at_threshold() {
        assert!(!needs_upscale((2048, 2048), 2048));
        assert!(!needs_upscale((4000, 3000), 2048));
    }

    // =========================================================================
    // Mask geometry tests
    // =========================================================================

    #[test]
    fn rounded_rect_corner_excluded() {
        assert!(!rounded_rect_contains(0.5, 0.5, 512, 92));
        assert!(!rounded_rect_contains(511.5, 511.5, 512, 92));
    }

    #[test]
    fn rounded_rect_edges_and_center_included() {
        assert!(rounded_rect_contains(256.0, 256.0, 512, 92));
        // Middle of the top edge
        assert!(rounded_rect_contains(256.0, 0.5, 512, 92));
        // Middle of the left edge
        assert!(rounded_rect_contains(0.5, 256.0, 512, 92));
    }

    #[test]
    fn rounded_rect_zero_radius_is_full_square() {
        assert!(rounded_rect_contains(0.1, 0.1, 100, 0));
        assert!(!rounded_rect_contains(100.5, 50.0, 100, 0));
    }

    #[test]
    fn circle_contains_center_not_corners() {
        assert!(circle_contains(256.0, 256.0, 512));
        assert!(!circle_contains(0.5, 0.5, 512));
        assert!(!circle_contains(511.5, 0.5, 512));
        // Edge midpoints are on the circle
        assert!(circle_contains(256.0, 0.5, 512));
    }

    #[test]
    fn coverage_full_inside_zero_outside() {
        let round = MaskShape::Circle;
        assert_eq!(mask_coverage(round, 512, 256, 256), 1.0);
        assert_eq!(mask_coverage(round, 512, 0, 0), 0.0);

        let rect = MaskShape::RoundedRect { radius: 92 };
        assert_eq!(mask_coverage(rect, 512, 10, 256), 1.0);
        assert_eq!(mask_coverage(rect, 512, 0, 0), 0.0);
    }

    #[test]
    fn coverage_partial_on_circle_edge() {
        // A pixel straddling the circle boundary on the diagonal
        let size = 512;
        let c = size as f64 / 2.0;
        let d = c / std::f64::consts::SQRT_2;
        let x = (c - d).floor() as u32;
        let cov = mask_coverage(MaskShape::Circle, size, x, x);
        assert!(cov > 0.0 && cov < 1.0, "coverage {cov} should be partial");
    }

    #[test]
    fn apply_coverage_scales_alpha() {
        assert_eq!(apply_coverage(255, 1.0), 255);
        assert_eq!(apply_coverage(255, 0.0), 0);
        assert_eq!(apply_coverage(200, 0.5), 100);
        assert_eq!(apply_coverage(255, 2.0), 255);
    }
}
