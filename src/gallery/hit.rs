//! Pointer hit testing against the carousel planes.

use std::cmp::Ordering;

use super::item::CarouselItem;
use super::viewport::Viewport;

/// Placement of the drawing surface in the same pixel space as the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A surface filling the window from its origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }
}

/// Convert a pixel coordinate to normalised device coordinates, y pointing up.
///
/// Returns `None` for an empty surface.
pub fn to_ndc(px: f64, py: f64, rect: &SurfaceRect) -> Option<(f64, f64)> {
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }
    let x = (px - rect.left) / rect.width * 2.0 - 1.0;
    let y = -((py - rect.top) / rect.height * 2.0 - 1.0);
    Some((x, y))
}

pub fn ndc_to_world(ndc: (f64, f64), viewport: &Viewport) -> (f64, f64) {
    (ndc.0 * viewport.width / 2.0, ndc.1 * viewport.height / 2.0)
}

/// Pixel coordinate straight to world units on the z = 0 plane.
pub fn to_world(px: f64, py: f64, rect: &SurfaceRect, viewport: &Viewport) -> Option<(f64, f64)> {
    to_ndc(px, py, rect).map(|ndc| ndc_to_world(ndc, viewport))
}

/// Indices of `items` back to front: ascending z, ties in list order.
pub fn paint_order(items: &[CarouselItem]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        items[a]
            .transform
            .position
            .z
            .partial_cmp(&items[b].transform.position.z)
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

/// Topmost item containing the world point, if any.
pub fn pick(items: &[CarouselItem], world: (f64, f64)) -> Option<usize> {
    paint_order(items)
        .into_iter()
        .rev()
        .find(|&index| items[index].contains(world.0, world.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_flips_y() {
        let rect = SurfaceRect::new(10.0, 20.0, 200.0, 100.0);
        assert_eq!(to_ndc(10.0, 20.0, &rect), Some((-1.0, 1.0)));
        assert_eq!(to_ndc(210.0, 120.0, &rect), Some((1.0, -1.0)));
        assert_eq!(to_ndc(110.0, 70.0, &rect), Some((0.0, 0.0)));
    }

    #[test]
    fn empty_surface_has_no_ndc() {
        assert_eq!(to_ndc(1.0, 1.0, &SurfaceRect::sized(0.0, 10.0)), None);
    }

    #[test]
    fn world_scales_by_half_viewport() {
        let viewport = Viewport::new(8.0, 6.0);
        assert_eq!(ndc_to_world((1.0, -0.5), &viewport), (4.0, -1.5));
    }
}
