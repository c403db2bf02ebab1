//! Scroll state and the easing helpers shared by every gallery component.

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Re-map `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// A collapsed input range maps everything onto `out_min`.
pub fn map_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    if span == 0.0 || !span.is_finite() {
        return out_min;
    }
    let t = (value - in_min) / span;
    t * (out_max - out_min) + out_min
}

/// Horizontal motion of the scroll between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Left,
    Right,
}

impl Direction {
    /// `Right` only while `current` moved past `last`; a tie reads as `Left`.
    pub fn from_motion(current: f64, last: f64) -> Self {
        if current > last {
            Self::Right
        } else {
            Self::Left
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Optional scroll limits. `None` on either side means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ScrollBounds {
    pub const UNBOUNDED: Self = Self {
        min: None,
        max: None,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min.min(max)),
            max: Some(max.max(min)),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn apply(&self, value: f64) -> f64 {
        let mut value = value;
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        value
    }
}

/// Eased scroll position in world units.
///
/// `current` chases `target` every frame; `last` holds the previous frame's
/// `current` and only feeds [`Direction::from_motion`]. `position` is the
/// value of `current` captured when a drag started.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollState {
    pub ease: f64,
    pub current: f64,
    pub target: f64,
    pub last: f64,
    pub position: Option<f64>,
}

impl ScrollState {
    pub fn new(ease: f64) -> Self {
        Self::starting_at(ease, 0.0)
    }

    pub fn starting_at(ease: f64, at: f64) -> Self {
        let ease = if ease.is_finite() {
            ease.clamp(f64::EPSILON, 1.0)
        } else {
            1.0
        };
        Self {
            ease,
            current: at,
            target: at,
            last: at,
            position: None,
        }
    }

    /// Move `current` one easing step toward `target`.
    pub fn advance(&mut self) {
        self.current = lerp(self.current, self.target, self.ease);
    }

    /// Direction of the motion between the previous and the current frame.
    pub fn direction(&self) -> Direction {
        Direction::from_motion(self.current, self.last)
    }

    /// Frame-to-frame delta of `current`.
    pub fn speed(&self) -> f64 {
        self.current - self.last
    }

    /// Rotate `current` into `last`; call once at the end of every frame.
    pub fn commit_frame(&mut self) {
        self.last = self.current;
    }

    /// Clamp `target` and `current` into the bounds, if any.
    pub fn clamp(&mut self, bounds: &ScrollBounds) {
        if !bounds.is_bounded() {
            return;
        }
        self.target = bounds.apply(self.target);
        self.current = bounds.apply(self.current);
    }

    /// Clamp only `target`; used by input handlers between frames.
    pub fn clamp_target(&mut self, bounds: &ScrollBounds) {
        self.target = bounds.apply(self.target);
    }

    /// Round `target` to the nearest multiple of `item_width`.
    pub fn snap_to_nearest_item(&mut self, item_width: f64) {
        self.target = snap_to_multiple(self.target, item_width);
    }

    /// Distance still to travel before `current` reaches `target`.
    pub fn remaining(&self) -> f64 {
        (self.target - self.current).abs()
    }

    /// Multiply every stored coordinate by `ratio`; used when item widths change.
    pub fn rescale(&mut self, ratio: f64) {
        if !ratio.is_finite() || ratio <= 0.0 {
            return;
        }
        self.current *= ratio;
        self.target *= ratio;
        self.last *= ratio;
        if let Some(position) = self.position.as_mut() {
            *position *= ratio;
        }
    }
}

/// Sign-preserving rounding of `value` to a multiple of `step`.
///
/// Halves round away from zero on both sides, so `-15` with a step of 10
/// lands on `-20` just like `15` lands on `20`.
pub fn snap_to_multiple(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() || !value.is_finite() {
        return value;
    }
    let index = (value.abs() / step).round();
    let snapped = step * index;
    if value < 0.0 { -snapped } else { snapped }
}
