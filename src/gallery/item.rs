//! Per-item transform engine: placement, focus effects and wraparound.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::Deserialize;

use super::scroll::{Direction, ScrollState, map_range};
use super::viewport::{Screen, Viewport};

/// Phase added to every item's shader clock per frame.
pub const TIME_STEP: f64 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Position, Euler rotation (radians, XYZ order) and scale of a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Which width the cylinder maps one full turn onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CylinderReference {
    #[default]
    WidthTotal,
    Viewport,
}

/// Depth mapping applied on top of the horizontal scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Layout {
    /// Items ride a cosine arc and roll around z as they travel.
    #[serde(rename_all = "kebab-case")]
    Wave {
        #[serde(default = "Layout::default_wave_amplitude")]
        amplitude: f64,
        #[serde(default = "Layout::default_wave_vertical_offset")]
        vertical_offset: f64,
    },
    /// Items sit on a vertical cylinder and turn to face its axis.
    #[serde(rename_all = "kebab-case")]
    Cylinder {
        #[serde(default = "Layout::default_cylinder_radius")]
        radius: f64,
        #[serde(default)]
        reference: CylinderReference,
        #[serde(default = "Layout::default_rotation_intensity")]
        rotation_intensity: f64,
    },
}

impl Layout {
    const fn default_wave_amplitude() -> f64 {
        75.0
    }

    const fn default_wave_vertical_offset() -> f64 {
        -74.5
    }

    const fn default_cylinder_radius() -> f64 {
        0.5
    }

    const fn default_rotation_intensity() -> f64 {
        4.0
    }

    pub fn wave() -> Self {
        Self::Wave {
            amplitude: Self::default_wave_amplitude(),
            vertical_offset: Self::default_wave_vertical_offset(),
        }
    }

    pub fn cylinder() -> Self {
        Self::Cylinder {
            radius: Self::default_cylinder_radius(),
            reference: CylinderReference::default(),
            rotation_intensity: Self::default_rotation_intensity(),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::cylinder()
    }
}

/// Plane size in reference pixels, converted to world units on resize.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ItemSizing {
    /// Screen height at which the plane dimensions apply unscaled.
    pub reference_height_px: f64,
    pub plane_width_px: f64,
    pub plane_height_px: f64,
    /// Gap between neighbours, in world units.
    pub padding: f64,
}

impl Default for ItemSizing {
    fn default() -> Self {
        Self {
            reference_height_px: 1500.0,
            plane_width_px: 500.0,
            plane_height_px: 1000.0,
            padding: 2.0,
        }
    }
}

/// Scale pulse and opacity falloff around the centre of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FocusStyle {
    pub scale_base: f64,
    pub scale_intensity: f64,
    /// Multiple of the viewport width over which the pulse normalises.
    pub scale_spread: f64,
    /// Lowest factor the pulse may reach; keeps planes from inverting.
    pub scale_floor: f64,
    /// Fraction of the viewport width that stays fully opaque-ish.
    pub focus_fraction: f64,
    pub min_opacity: f64,
}

impl Default for FocusStyle {
    fn default() -> Self {
        Self {
            scale_base: 1.0,
            scale_intensity: 1.0,
            scale_spread: 1.5,
            scale_floor: 0.1,
            focus_fraction: 0.2,
            min_opacity: 0.4,
        }
    }
}

impl FocusStyle {
    /// Pulse factor for an item at `x`, never below `scale_floor`.
    pub fn scale_factor(&self, x: f64, viewport_width: f64) -> f64 {
        let spread = viewport_width * self.scale_spread;
        let normalized = if spread > 0.0 { x / spread } else { 0.0 };
        let factor = self.scale_base - normalized.abs() * self.scale_intensity;
        factor.max(self.scale_floor.max(0.0))
    }

    /// Quadratic falloff from 1 at the centre to `min_opacity` at the focus edge.
    pub fn opacity(&self, x: f64, viewport_width: f64) -> f64 {
        let focus_width = viewport_width * self.focus_fraction;
        let distance = x.abs();
        let normalized = if focus_width > 0.0 {
            (distance / focus_width).min(1.0)
        } else if distance > 0.0 {
            1.0
        } else {
            0.0
        };
        let min = self.min_opacity.clamp(0.0, 1.0);
        1.0 - (1.0 - min) * normalized * normalized
    }
}

/// Everything that shapes an item apart from its slot and the scroll.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemStyle {
    pub layout: Layout,
    pub sizing: ItemSizing,
    pub focus: FocusStyle,
    /// Multiplier on the base plane size for this item only.
    pub scale_multiplier: f64,
}

/// One full-cycle jump applied by the wraparound rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Left the screen on the left; moved one cycle to the right.
    ToRight,
    /// Left the screen on the right; moved one cycle to the left.
    ToLeft,
}

/// A single plane of the carousel.
#[derive(Debug, Clone)]
pub struct CarouselItem {
    pub index: usize,
    pub length: usize,
    pub base_scale_x: f64,
    pub base_scale_y: f64,
    /// Slot width: plane width plus padding.
    pub width: f64,
    /// Length of one full cycle of the carousel.
    pub width_total: f64,
    /// Home position, `width * index`.
    pub x: f64,
    /// Accumulated wraparound offset, always a whole number of cycles.
    pub extra: f64,
    pub transform: Transform,
    pub opacity: f64,
    /// Shader clock.
    pub time: f64,
    /// Scroll delta of the last frame.
    pub speed: f64,
    pub is_before: bool,
    pub is_after: bool,
    /// Whether the wraparound rule runs; bounded carousels keep items in place.
    pub wraps: bool,
    style: ItemStyle,
    screen: Screen,
    viewport: Viewport,
}

impl CarouselItem {
    pub fn new(
        index: usize,
        length: usize,
        style: ItemStyle,
        screen: Screen,
        viewport: Viewport,
        initial_time: f64,
    ) -> Self {
        let mut item = Self {
            index,
            length,
            base_scale_x: 0.0,
            base_scale_y: 0.0,
            width: 0.0,
            width_total: 0.0,
            x: 0.0,
            extra: 0.0,
            transform: Transform::default(),
            opacity: 1.0,
            time: initial_time,
            speed: 0.0,
            is_before: false,
            is_after: false,
            wraps: true,
            style,
            screen,
            viewport,
        };
        item.relayout();
        item
    }

    /// Recompute sizing and home slot for a new screen and/or viewport.
    ///
    /// Wrap offsets keep their cycle count, so an item that had wrapped
    /// `n` times is still `n` cycles away from home afterwards.
    pub fn on_resize(&mut self, screen: Option<Screen>, viewport: Option<Viewport>) {
        let cycles = if self.width_total > 0.0 {
            (self.extra / self.width_total).round()
        } else {
            0.0
        };
        if let Some(screen) = screen {
            self.screen = screen;
        }
        if let Some(viewport) = viewport {
            self.viewport = viewport;
        }
        self.relayout();
        self.extra = cycles * self.width_total;
    }

    fn relayout(&mut self) {
        let sizing = &self.style.sizing;
        let multiplier = if self.style.scale_multiplier > 0.0 {
            self.style.scale_multiplier
        } else {
            1.0
        };
        if self.screen.is_empty() || self.viewport.is_degenerate() {
            self.base_scale_x = 0.0;
            self.base_scale_y = 0.0;
        } else {
            let screen_w = f64::from(self.screen.width);
            let screen_h = f64::from(self.screen.height);
            let scale = if sizing.reference_height_px > 0.0 {
                screen_h / sizing.reference_height_px
            } else {
                1.0
            };
            self.base_scale_y =
                self.viewport.height * (sizing.plane_height_px * scale) / screen_h * multiplier;
            self.base_scale_x =
                self.viewport.width * (sizing.plane_width_px * scale) / screen_w * multiplier;
        }
        self.transform.scale = Vec3::new(self.base_scale_x, self.base_scale_y, 1.0);
        self.width = self.base_scale_x + sizing.padding;
        self.width_total = self.width * self.length as f64;
        self.x = self.width * self.index as f64;
    }

    /// Advance the item by one frame.
    ///
    /// Returns the relocation applied this frame, if any. The transform is
    /// always consistent with `x - scroll.current - extra` on return.
    pub fn update(&mut self, scroll: &ScrollState, direction: Direction) -> Option<Relocation> {
        self.place(scroll.current);

        self.speed = scroll.speed();
        self.time += TIME_STEP;

        let relocation = self.wrap(direction);
        if relocation.is_some() {
            self.place(scroll.current);
        }
        relocation
    }

    fn place(&mut self, current: f64) {
        let x = self.x - current - self.extra;
        let viewport_width = self.viewport.width;
        let width_total = self.width_total;

        let mut position = Vec3::new(x, 0.0, 0.0);
        let mut rotation = Vec3::ZERO;
        match self.style.layout {
            Layout::Wave {
                amplitude,
                vertical_offset,
            } => {
                let phase = if width_total > 0.0 {
                    x / width_total * PI
                } else {
                    0.0
                };
                position.y = phase.cos() * amplitude + vertical_offset;
                rotation.z = if width_total > 0.0 {
                    map_range(x, -width_total, width_total, PI, -PI)
                } else {
                    0.0
                };
            }
            Layout::Cylinder {
                radius,
                reference,
                rotation_intensity,
            } => {
                let reference_width = match reference {
                    CylinderReference::WidthTotal => width_total,
                    CylinderReference::Viewport => viewport_width,
                };
                let turn = if reference_width > 0.0 {
                    x / reference_width * TAU
                } else {
                    0.0
                };
                let angle = turn + FRAC_PI_2;
                position.y = angle.cos() * radius;
                position.z = angle.sin() * radius;
                let normalized = if viewport_width > 0.0 {
                    x / (viewport_width * 1.5)
                } else {
                    0.0
                };
                rotation.y = -normalized * rotation_intensity;
            }
        }

        let focus = &self.style.focus;
        if self.base_scale_x > 0.0 && self.base_scale_y > 0.0 {
            let factor = focus.scale_factor(x, viewport_width);
            self.transform.scale =
                Vec3::new(self.base_scale_x * factor, self.base_scale_y * factor, 1.0);
        }
        self.opacity = focus.opacity(x, viewport_width);
        self.transform.position = position;
        self.transform.rotation = rotation;
    }

    fn wrap(&mut self, direction: Direction) -> Option<Relocation> {
        if !self.wraps || self.width_total <= 0.0 {
            self.is_before = false;
            self.is_after = false;
            return None;
        }

        let x = self.transform.position.x;
        let half_width = self.transform.scale.x / 2.0;
        let viewport_offset = self.viewport.width;

        self.is_before = x + half_width < -viewport_offset;
        self.is_after = x - half_width > viewport_offset;

        let relocation = match direction {
            Direction::Right if self.is_before => {
                self.extra -= self.width_total;
                Some(Relocation::ToRight)
            }
            Direction::Left if self.is_after => {
                self.extra += self.width_total;
                Some(Relocation::ToLeft)
            }
            _ => None,
        };
        if relocation.is_some() {
            self.is_before = false;
            self.is_after = false;
        }
        relocation
    }

    /// Axis-aligned world-space bounds `(left, right, bottom, top)`.
    ///
    /// Rotation and depth are ignored.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let Transform {
            position, scale, ..
        } = self.transform;
        (
            position.x - scale.x / 2.0,
            position.x + scale.x / 2.0,
            position.y - scale.y / 2.0,
            position.y + scale.y / 2.0,
        )
    }

    pub fn contains(&self, world_x: f64, world_y: f64) -> bool {
        let (left, right, bottom, top) = self.bounds();
        world_x >= left && world_x <= right && world_y >= bottom && world_y <= top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_style() -> ItemStyle {
        ItemStyle {
            layout: Layout::Cylinder {
                radius: 0.0,
                reference: CylinderReference::WidthTotal,
                rotation_intensity: 0.0,
            },
            sizing: ItemSizing::default(),
            focus: FocusStyle {
                scale_intensity: 0.0,
                ..FocusStyle::default()
            },
            scale_multiplier: 1.0,
        }
    }

    fn item(index: usize, length: usize) -> CarouselItem {
        CarouselItem::new(
            index,
            length,
            flat_style(),
            Screen::new(1500, 1500),
            Viewport::new(6.0, 6.0),
            0.0,
        )
    }

    #[test]
    fn resize_derives_slot_geometry() {
        let it = item(3, 5);
        // scale = 1500/1500, base_x = 6 * 500 / 1500 = 2, base_y = 6 * 1000 / 1500 = 4
        assert!((it.base_scale_x - 2.0).abs() < 1e-12);
        assert!((it.base_scale_y - 4.0).abs() < 1e-12);
        assert!((it.width - 4.0).abs() < 1e-12);
        assert!((it.width_total - 20.0).abs() < 1e-12);
        assert!((it.x - 12.0).abs() < 1e-12);
    }

    #[test]
    fn update_places_relative_to_scroll() {
        let mut it = item(2, 5);
        let mut scroll = ScrollState::new(0.1);
        scroll.current = 3.0;
        scroll.last = 2.5;
        it.update(&scroll, Direction::Right);
        assert_eq!(it.transform.position.x, it.x - 3.0 - it.extra);
        assert!((it.speed - 0.5).abs() < 1e-12);
        assert!((it.time - TIME_STEP).abs() < 1e-12);
    }

    #[test]
    fn right_motion_relocates_leaving_items_once() {
        let mut it = item(0, 5);
        let mut scroll = ScrollState::new(0.1);
        // x = 0 - 8 = -8, half width 1: -7 < -6 so the item left the screen
        scroll.last = 7.9;
        scroll.current = 8.0;
        let moved = it.update(&scroll, Direction::Right);
        assert_eq!(moved, Some(Relocation::ToRight));
        assert_eq!(it.extra, -20.0);
        assert_eq!(it.transform.position.x, 12.0);
        assert!(!it.is_before && !it.is_after);

        scroll.last = 8.0;
        scroll.current = 8.1;
        assert_eq!(it.update(&scroll, Direction::Right), None);
        assert_eq!(it.extra, -20.0);
    }

    #[test]
    fn wraparound_is_gated_by_direction() {
        let mut it = item(0, 5);
        let mut scroll = ScrollState::new(0.1);
        scroll.current = 8.0;
        scroll.last = 8.0;
        assert_eq!(it.update(&scroll, Direction::Left), None);
        assert!(it.is_before);
        assert_eq!(it.extra, 0.0);
    }

    #[test]
    fn zero_cycle_skips_wraparound() {
        let mut it = CarouselItem::new(
            0,
            0,
            flat_style(),
            Screen::new(800, 600),
            Viewport::new(4.0, 3.0),
            0.0,
        );
        let mut scroll = ScrollState::new(0.1);
        scroll.current = 1000.0;
        assert_eq!(it.update(&scroll, Direction::Right), None);
        assert!(it.transform.position.x.is_finite());
        assert!(it.transform.position.y.is_finite());
        assert!(it.opacity.is_finite());
    }

    #[test]
    fn degenerate_viewport_stays_finite() {
        let mut it = CarouselItem::new(
            1,
            3,
            ItemStyle::default(),
            Screen::new(0, 0),
            Viewport::default(),
            0.0,
        );
        let scroll = ScrollState::new(0.1);
        it.update(&scroll, Direction::Left);
        let t = it.transform;
        for v in [t.position.x, t.position.y, t.position.z, t.rotation.y, it.opacity] {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn scale_pulse_is_floored() {
        let focus = FocusStyle {
            scale_base: 1.0,
            scale_intensity: 1.0,
            scale_spread: 0.1,
            scale_floor: 0.2,
            ..FocusStyle::default()
        };
        assert!((focus.scale_factor(0.0, 10.0) - 1.0).abs() < 1e-12);
        assert!((focus.scale_factor(50.0, 10.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn opacity_falls_off_quadratically() {
        let focus = FocusStyle {
            focus_fraction: 0.5,
            min_opacity: 0.4,
            ..FocusStyle::default()
        };
        // focus width 5
        assert!((focus.opacity(0.0, 10.0) - 1.0).abs() < 1e-12);
        assert!((focus.opacity(2.5, 10.0) - (1.0 - 0.6 * 0.25)).abs() < 1e-12);
        assert!((focus.opacity(-9.0, 10.0) - 0.4).abs() < 1e-12);
        let collapsed = FocusStyle {
            focus_fraction: 0.0,
            ..focus
        };
        assert!((collapsed.opacity(0.0, 10.0) - 1.0).abs() < 1e-12);
        assert!((collapsed.opacity(0.1, 10.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn wave_layout_peaks_at_centre() {
        let style = ItemStyle {
            layout: Layout::wave(),
            ..flat_style()
        };
        let mut it = CarouselItem::new(
            0,
            5,
            style,
            Screen::new(1500, 1500),
            Viewport::new(6.0, 6.0),
            0.0,
        );
        it.update(&ScrollState::new(0.1), Direction::Left);
        assert!((it.transform.position.y - 0.5).abs() < 1e-9);
        assert!(it.transform.rotation.z.abs() < 1e-12);
    }

    #[test]
    fn cylinder_front_item_sits_on_axis() {
        let style = ItemStyle {
            layout: Layout::cylinder(),
            ..flat_style()
        };
        let mut it = CarouselItem::new(
            0,
            5,
            style,
            Screen::new(1500, 1500),
            Viewport::new(6.0, 6.0),
            0.0,
        );
        it.update(&ScrollState::new(0.1), Direction::Left);
        assert!(it.transform.position.y.abs() < 1e-12);
        assert!((it.transform.position.z - 0.5).abs() < 1e-12);
        assert!(it.transform.rotation.y.abs() < 1e-12);
    }

    /// Item 0 of five (width 4, cycle 20, viewport 6) placed at `x` with wrapping off.
    fn placed_at(layout: Layout, x: f64) -> CarouselItem {
        let style = ItemStyle {
            layout,
            ..flat_style()
        };
        let mut it = CarouselItem::new(
            0,
            5,
            style,
            Screen::new(1500, 1500),
            Viewport::new(6.0, 6.0),
            0.0,
        );
        it.wraps = false;
        let mut scroll = ScrollState::new(0.1);
        scroll.current = -x;
        it.update(&scroll, Direction::Right);
        assert_eq!(it.transform.position.x, x);
        it
    }

    fn close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn wave_rolls_through_half_turns_across_the_cycle() {
        let right = placed_at(Layout::wave(), 20.0);
        close(right.transform.rotation.z, -PI);
        close(right.transform.position.y, -75.0 - 74.5);

        let left = placed_at(Layout::wave(), -20.0);
        close(left.transform.rotation.z, PI);
        close(left.transform.position.y, -75.0 - 74.5);

        let quarter = placed_at(Layout::wave(), 10.0);
        close(quarter.transform.rotation.z, -FRAC_PI_2);
        close(quarter.transform.position.y, -74.5);
    }

    #[test]
    fn cylinder_quarter_cycle_reaches_the_far_side() {
        let layout = Layout::Cylinder {
            radius: 0.5,
            reference: CylinderReference::WidthTotal,
            rotation_intensity: 4.0,
        };
        let it = placed_at(layout, 5.0);
        close(it.transform.position.y, -0.5);
        close(it.transform.position.z, 0.0);
        // -(5 / (6 * 1.5)) * 4
        close(it.transform.rotation.y, -20.0 / 9.0);

        let mirrored = placed_at(layout, -5.0);
        close(mirrored.transform.position.y, 0.5);
        close(mirrored.transform.position.z, 0.0);
        close(mirrored.transform.rotation.y, 20.0 / 9.0);
    }

    #[test]
    fn cylinder_viewport_reference_turns_per_viewport() {
        let by_viewport = Layout::Cylinder {
            radius: 0.5,
            reference: CylinderReference::Viewport,
            rotation_intensity: 4.0,
        };
        // quarter turn at vw / 4
        let it = placed_at(by_viewport, 1.5);
        close(it.transform.position.y, -0.5);
        close(it.transform.position.z, 0.0);
        // rotation always normalises by the viewport
        close(it.transform.rotation.y, -2.0 / 3.0);

        // half turn back at -vw / 2
        let behind = placed_at(by_viewport, -3.0);
        close(behind.transform.position.y, 0.0);
        close(behind.transform.position.z, -0.5);

        let by_cycle = placed_at(
            Layout::Cylinder {
                radius: 0.5,
                reference: CylinderReference::WidthTotal,
                rotation_intensity: 4.0,
            },
            1.5,
        );
        close(by_cycle.transform.position.y, 0.5 * (0.65 * PI).cos());
        close(by_cycle.transform.position.z, 0.5 * (0.65 * PI).sin());
    }

    #[test]
    fn resize_keeps_cycle_count() {
        let mut it = item(0, 5);
        it.extra = -40.0;
        it.on_resize(Some(Screen::new(1500, 1500)), Some(Viewport::new(3.0, 3.0)));
        // base_x = 1, width = 3, total = 15
        assert!((it.width_total - 15.0).abs() < 1e-12);
        assert!((it.extra + 30.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_follow_pulsed_scale() {
        let mut it = item(0, 5);
        it.update(&ScrollState::new(0.1), Direction::Left);
        assert!(it.contains(0.0, 0.0));
        assert!(it.contains(0.99, 1.99));
        assert!(!it.contains(1.01, 0.0));
    }
}
