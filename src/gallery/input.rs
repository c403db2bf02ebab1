//! Pointer and wheel handling for the scroll state.

use std::time::{Duration, Instant};

use super::scroll::{ScrollBounds, ScrollState};

/// Pixels per wheel "line" and per wheel "page".
pub const LINE_HEIGHT_PX: f64 = 40.0;
pub const PAGE_HEIGHT_PX: f64 = 800.0;

/// Raw wheel delta as reported by the windowing system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Lines { x: f64, y: f64 },
    Pixels { x: f64, y: f64 },
    Pages { x: f64, y: f64 },
}

/// Convert any wheel delta to pixels.
pub fn normalize_wheel(delta: WheelDelta) -> (f64, f64) {
    match delta {
        WheelDelta::Lines { x, y } => (x * LINE_HEIGHT_PX, y * LINE_HEIGHT_PX),
        WheelDelta::Pixels { x, y } => (x, y),
        WheelDelta::Pages { x, y } => (x * PAGE_HEIGHT_PX, y * PAGE_HEIGHT_PX),
    }
}

/// Fires once `delay` after the most recent poke.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Lets at most one value through per interval, keeping the latest one
/// offered in between for a trailing call.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    last_run: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            pending: None,
        }
    }

    fn open(&self, now: Instant) -> bool {
        self.last_run
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Pass `value` straight through if the interval elapsed, otherwise hold it.
    pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
        if self.open(now) {
            self.last_run = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the held value once the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.open(now) {
            self.last_run = Some(now);
            return self.pending.take();
        }
        None
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputOptions {
    /// World units per normalised wheel pixel.
    pub wheel_multiplier: f64,
    /// World units per dragged pixel.
    pub drag_multiplier: f64,
    /// Largest per-axis pointer travel still counted as a click.
    pub click_threshold_px: f64,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            wheel_multiplier: 0.005,
            drag_multiplier: 0.01,
            click_threshold_px: 5.0,
        }
    }
}

/// Outcome of releasing the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerRelease {
    Click { x: f64, y: f64 },
    DragEnd,
}

/// Translates pointer and wheel input into scroll target updates.
#[derive(Debug, Clone, Default)]
pub struct InputController {
    options: InputOptions,
    down_at: Option<(f64, f64)>,
}

impl InputController {
    pub fn new(options: InputOptions) -> Self {
        Self {
            options,
            down_at: None,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down_at.is_some()
    }

    pub fn handle_pointer_down(&mut self, x: f64, y: f64, scroll: &mut ScrollState) {
        self.down_at = Some((x, y));
        scroll.position = Some(scroll.current);
    }

    /// Drag the scroll while the pointer is down. Returns whether it did.
    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        _y: f64,
        scroll: &mut ScrollState,
        bounds: &ScrollBounds,
    ) -> bool {
        let Some((start_x, _)) = self.down_at else {
            return false;
        };
        let origin = scroll.position.unwrap_or(scroll.current);
        let distance = (start_x - x) * self.options.drag_multiplier;
        scroll.target = origin + distance;
        scroll.clamp_target(bounds);
        true
    }

    /// Finish the gesture. `None` when no pointer was down.
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        scroll: &mut ScrollState,
    ) -> Option<PointerRelease> {
        let (start_x, start_y) = self.down_at.take()?;
        scroll.position = None;
        let threshold = self.options.click_threshold_px;
        if (x - start_x).abs() < threshold && (y - start_y).abs() < threshold {
            Some(PointerRelease::Click { x, y })
        } else {
            Some(PointerRelease::DragEnd)
        }
    }

    /// Abandon a gesture without a release, e.g. when the pointer leaves the window.
    pub fn cancel(&mut self, scroll: &mut ScrollState) {
        self.down_at = None;
        scroll.position = None;
    }

    /// Push the target by a wheel delta; vertical motion wins unless the
    /// gesture is mostly horizontal.
    pub fn handle_wheel(&self, delta: WheelDelta, scroll: &mut ScrollState, bounds: &ScrollBounds) {
        let (px, py) = normalize_wheel(delta);
        let pixels = if px.abs() > py.abs() { px } else { py };
        scroll.target += pixels * self.options.wheel_multiplier;
        scroll.clamp_target(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_units_normalise_to_pixels() {
        assert_eq!(normalize_wheel(WheelDelta::Lines { x: 0.0, y: 1.0 }), (0.0, 40.0));
        assert_eq!(normalize_wheel(WheelDelta::Pages { x: 1.0, y: 0.0 }), (800.0, 0.0));
        assert_eq!(normalize_wheel(WheelDelta::Pixels { x: 3.0, y: -7.0 }), (3.0, -7.0));
    }

    #[test]
    fn wheel_moves_target_by_multiplier() {
        let controller = InputController::default();
        let mut scroll = ScrollState::new(0.05);
        controller.handle_wheel(
            WheelDelta::Pixels { x: 0.0, y: 100.0 },
            &mut scroll,
            &ScrollBounds::UNBOUNDED,
        );
        assert!((scroll.target - 0.5).abs() < 1e-12);
        assert_eq!(scroll.current, 0.0);
    }

    #[test]
    fn wheel_respects_bounds() {
        let controller = InputController::default();
        let mut scroll = ScrollState::new(0.05);
        controller.handle_wheel(
            WheelDelta::Lines { x: 0.0, y: -10.0 },
            &mut scroll,
            &ScrollBounds::new(0.0, 8.0),
        );
        assert_eq!(scroll.target, 0.0);
    }

    #[test]
    fn drag_is_relative_to_current_at_press() {
        let mut controller = InputController::default();
        let mut scroll = ScrollState::starting_at(0.05, 3.0);
        controller.handle_pointer_down(200.0, 50.0, &mut scroll);
        scroll.current = 3.5;
        assert!(controller.handle_pointer_move(100.0, 50.0, &mut scroll, &ScrollBounds::UNBOUNDED));
        assert!((scroll.target - 4.0).abs() < 1e-12);
    }

    #[test]
    fn move_without_press_does_nothing() {
        let mut controller = InputController::default();
        let mut scroll = ScrollState::new(0.05);
        assert!(!controller.handle_pointer_move(10.0, 0.0, &mut scroll, &ScrollBounds::UNBOUNDED));
        assert_eq!(scroll.target, 0.0);
    }

    #[test]
    fn short_travel_is_a_click() {
        let mut controller = InputController::default();
        let mut scroll = ScrollState::new(0.05);
        controller.handle_pointer_down(100.0, 100.0, &mut scroll);
        assert_eq!(
            controller.handle_pointer_up(102.0, 101.0, &mut scroll),
            Some(PointerRelease::Click { x: 102.0, y: 101.0 })
        );

        controller.handle_pointer_down(100.0, 100.0, &mut scroll);
        assert_eq!(
            controller.handle_pointer_up(150.0, 100.0, &mut scroll),
            Some(PointerRelease::DragEnd)
        );
        assert_eq!(controller.handle_pointer_up(150.0, 100.0, &mut scroll), None);
    }

    #[test]
    fn debounce_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(200));
        debounce.poke(start);
        debounce.poke(start + Duration::from_millis(150));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(300)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(350)));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(400)));
    }

    #[test]
    fn throttle_passes_leading_and_keeps_trailing() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(50));
        assert_eq!(throttle.offer(start, 1), Some(1));
        assert_eq!(throttle.offer(start + Duration::from_millis(10), 2), None);
        assert_eq!(throttle.offer(start + Duration::from_millis(20), 3), None);
        assert_eq!(throttle.poll(start + Duration::from_millis(30)), None);
        assert_eq!(throttle.poll(start + Duration::from_millis(50)), Some(3));
        assert_eq!(throttle.poll(start + Duration::from_millis(200)), None);
        assert_eq!(throttle.offer(start + Duration::from_millis(200), 4), Some(4));
    }
}
