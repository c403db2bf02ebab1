//! The carousel driver: owns scroll, items and backdrop and runs one frame at a time.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info, trace};

use super::background::{Background, BackgroundKind};
use super::hit::{self, SurfaceRect};
use super::input::{Debounce, InputController, InputOptions, PointerRelease, Throttle, WheelDelta};
use super::item::{CarouselItem, ItemStyle};
use super::scroll::{ScrollBounds, ScrollState};
use super::viewport::{PerspectiveCamera, Screen, Viewport};
use crate::events::GalleryEvent;

/// Shader clocks start somewhere in `[0, INITIAL_TIME_RANGE)`.
const INITIAL_TIME_RANGE: f64 = 100.0;
/// Per-frame increment of the scene fade-in once ready.
const FADE_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundsMode {
    /// Items wrap around forever.
    #[default]
    Infinite,
    /// Scrolling stops at the first and last item.
    Bounded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselOptions {
    pub camera: PerspectiveCamera,
    pub ease: f64,
    pub bounds: BoundsMode,
    pub input: InputOptions,
    pub snap_debounce: Duration,
    pub hover_throttle: Duration,
    pub load_timeout: Duration,
    pub style: ItemStyle,
    pub background: BackgroundKind,
    /// Fixes the random shader phases and particle layout when set.
    pub seed: Option<u64>,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            camera: PerspectiveCamera::default(),
            ease: 0.05,
            bounds: BoundsMode::Infinite,
            input: InputOptions::default(),
            snap_debounce: Duration::from_millis(200),
            hover_throttle: Duration::from_millis(50),
            load_timeout: Duration::from_secs(10),
            style: ItemStyle::default(),
            background: BackgroundKind::None,
            seed: None,
        }
    }
}

/// Identity of one carousel entry as seen by event receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub id: String,
    pub title: Option<String>,
}

impl Slide {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }
}

/// What an external dot/arrow indicator needs to draw itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorState {
    pub current_index: usize,
    pub total_slides: usize,
    pub can_previous: bool,
    pub can_next: bool,
}

/// Tracks which images have settled and when the gallery may show itself.
#[derive(Debug, Clone)]
pub struct LoadTracker {
    settled: Vec<bool>,
    started: Instant,
    timeout: Duration,
    ready: bool,
}

impl LoadTracker {
    pub fn new(count: usize, started: Instant, timeout: Duration) -> Self {
        Self {
            settled: vec![false; count],
            started,
            timeout,
            ready: false,
        }
    }

    pub fn settle(&mut self, index: usize) {
        if let Some(slot) = self.settled.get_mut(index) {
            *slot = true;
        }
    }

    pub fn settled_count(&self) -> usize {
        self.settled.iter().filter(|s| **s).count()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns `Some(timed_out)` on the transition to ready.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        if self.ready {
            return None;
        }
        if self.settled.iter().all(|s| *s) {
            self.ready = true;
            return Some(false);
        }
        if now.saturating_duration_since(self.started) >= self.timeout {
            self.ready = true;
            return Some(true);
        }
        None
    }
}

pub struct Carousel {
    options: CarouselOptions,
    slides: Vec<Slide>,
    screen: Screen,
    viewport: Viewport,
    rect: SurfaceRect,
    scroll: ScrollState,
    bounds: ScrollBounds,
    items: Vec<CarouselItem>,
    background: Background,
    input: InputController,
    snap: Debounce,
    hover: Throttle<(f64, f64)>,
    hovered: Option<usize>,
    announced_index: Option<usize>,
    loads: LoadTracker,
    fade: f64,
    rng: StdRng,
}

impl Carousel {
    pub fn new(options: CarouselOptions, slides: Vec<Slide>, screen: Screen, now: Instant) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let viewport = options.camera.viewport_for(screen);
        let mut carousel = Self {
            options,
            slides: Vec::new(),
            screen,
            viewport,
            rect: surface_rect(screen),
            scroll: ScrollState::new(options.ease),
            bounds: ScrollBounds::UNBOUNDED,
            items: Vec::new(),
            background: options.background.build(viewport, 0.0),
            input: InputController::new(options.input),
            snap: Debounce::new(options.snap_debounce),
            hover: Throttle::new(options.hover_throttle),
            hovered: None,
            announced_index: None,
            loads: LoadTracker::new(0, now, options.load_timeout),
            fade: 0.0,
            rng,
        };
        carousel.replace_media(slides, now);
        carousel
    }

    /// Drop every item and build a fresh set for `slides`, starting from the first.
    pub fn replace_media(&mut self, slides: Vec<Slide>, now: Instant) {
        let length = slides.len();
        let style = self.options.style;
        let (screen, viewport) = (self.screen, self.viewport);
        let rng = &mut self.rng;
        self.items = (0..length)
            .map(|index| {
                let phase = rng.random_range(0.0..INITIAL_TIME_RANGE);
                CarouselItem::new(index, length, style, screen, viewport, phase)
            })
            .collect();
        self.slides = slides;
        self.scroll = ScrollState::new(self.options.ease);
        self.snap.cancel();
        self.hover.clear();
        self.hovered = None;
        self.announced_index = None;
        self.loads = LoadTracker::new(length, now, self.options.load_timeout);
        self.fade = 0.0;
        self.apply_bounds();
        info!(count = length, bounds = ?self.options.bounds, "carousel media replaced");
    }

    fn apply_bounds(&mut self) {
        let wraps = self.options.bounds == BoundsMode::Infinite;
        for item in &mut self.items {
            item.wraps = wraps;
        }
        self.bounds = match self.options.bounds {
            BoundsMode::Infinite => ScrollBounds::UNBOUNDED,
            BoundsMode::Bounded => {
                let last = self.items.len().saturating_sub(1) as f64;
                ScrollBounds::new(0.0, self.item_width() * last)
            }
        };
    }

    pub fn items(&self) -> &[CarouselItem] {
        &self.items
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.options.camera
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn is_dragging(&self) -> bool {
        self.input.is_down()
    }

    pub fn is_ready(&self) -> bool {
        self.loads.is_ready()
    }

    /// Scene opacity, rising from 0 to 1 once ready.
    pub fn fade(&self) -> f64 {
        self.fade
    }

    /// Slot width shared by every item.
    pub fn item_width(&self) -> f64 {
        self.items.first().map_or(0.0, |item| item.width)
    }

    fn width_total(&self) -> f64 {
        self.items.first().map_or(0.0, |item| item.width_total)
    }

    fn index_at(&self, scroll: f64) -> usize {
        let width = self.item_width();
        let len = self.items.len();
        if len == 0 || width <= 0.0 {
            return 0;
        }
        let slot = (scroll / width).round();
        match self.options.bounds {
            BoundsMode::Infinite => slot.rem_euclid(len as f64) as usize,
            BoundsMode::Bounded => slot.clamp(0.0, (len - 1) as f64) as usize,
        }
    }

    /// Item nearest to the centre right now.
    pub fn current_index(&self) -> usize {
        self.index_at(self.scroll.current)
    }

    /// Item the scroll is heading to.
    pub fn target_index(&self) -> usize {
        self.index_at(self.scroll.target)
    }

    pub fn indicator(&self) -> IndicatorState {
        let total = self.items.len();
        let index = self.target_index();
        let (can_previous, can_next) = match self.options.bounds {
            BoundsMode::Infinite => (total > 1, total > 1),
            BoundsMode::Bounded => (index > 0, index + 1 < total),
        };
        IndicatorState {
            current_index: index,
            total_slides: total,
            can_previous,
            can_next,
        }
    }

    /// Head for item `index`. Infinite carousels pick the occurrence of the
    /// item closest to where the scroll is already heading.
    pub fn navigate(&mut self, index: usize) {
        let len = self.items.len();
        let width = self.item_width();
        if len == 0 || width <= 0.0 {
            return;
        }
        let target = match self.options.bounds {
            BoundsMode::Bounded => width * index.min(len - 1) as f64,
            BoundsMode::Infinite => {
                let home = width * (index % len) as f64;
                let cycle = self.width_total();
                home + ((self.scroll.target - home) / cycle).round() * cycle
            }
        };
        self.scroll.target = target;
        self.scroll.clamp_target(&self.bounds);
        self.snap.cancel();
        debug!(index, target, "navigate");
    }

    pub fn next(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let index = self.target_index();
        match self.options.bounds {
            BoundsMode::Bounded if index + 1 >= len => {}
            _ => self.navigate((index + 1) % len),
        }
    }

    pub fn previous(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let index = self.target_index();
        match self.options.bounds {
            BoundsMode::Bounded if index == 0 => {}
            _ => self.navigate((index + len - 1) % len),
        }
    }

    /// Settle the target on the nearest item.
    pub fn snap(&mut self) {
        let width = self.item_width();
        if width <= 0.0 {
            return;
        }
        match self.options.bounds {
            BoundsMode::Infinite => self.scroll.snap_to_nearest_item(width),
            BoundsMode::Bounded => {
                self.scroll.target = width * self.target_index() as f64;
            }
        }
        trace!(target = self.scroll.target, "snapped");
    }

    pub fn handle_resize(&mut self, screen: Screen) {
        let old_width = self.item_width();
        let viewport = self.options.camera.viewport_for(screen);
        self.screen = screen;
        self.viewport = viewport;
        self.rect = surface_rect(screen);
        for item in &mut self.items {
            item.on_resize(Some(screen), Some(viewport));
        }
        let new_width = self.item_width();
        if old_width > 0.0 && new_width > 0.0 {
            self.scroll.rescale(new_width / old_width);
        }
        self.apply_bounds();
        self.scroll.clamp(&self.bounds);
        self.background.on_resize(viewport, self.scroll.current);
        debug!(
            width = screen.width,
            height = screen.height,
            viewport_width = viewport.width,
            viewport_height = viewport.height,
            "carousel resized"
        );
    }

    pub fn handle_pointer_down(&mut self, x: f64, y: f64) {
        self.snap.cancel();
        self.input.handle_pointer_down(x, y, &mut self.scroll);
    }

    /// Drag while pressed, otherwise sample hover through the throttle.
    pub fn handle_pointer_move(&mut self, x: f64, y: f64, now: Instant) -> Vec<GalleryEvent> {
        if self
            .input
            .handle_pointer_move(x, y, &mut self.scroll, &self.bounds)
        {
            return Vec::new();
        }
        match self.hover.offer(now, (x, y)) {
            Some((x, y)) => self.hover_at(x, y).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64) -> Vec<GalleryEvent> {
        match self.input.handle_pointer_up(x, y, &mut self.scroll) {
            Some(PointerRelease::Click { x, y }) => self.click_at(x, y).into_iter().collect(),
            Some(PointerRelease::DragEnd) => {
                self.snap();
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// The pointer left the window: end any drag and clear hover.
    pub fn handle_pointer_leave(&mut self) -> Vec<GalleryEvent> {
        if self.input.is_down() {
            self.input.cancel(&mut self.scroll);
            self.snap();
        }
        self.hover.clear();
        self.set_hovered(None).into_iter().collect()
    }

    pub fn handle_wheel(&mut self, delta: WheelDelta, now: Instant) {
        self.input.handle_wheel(delta, &mut self.scroll, &self.bounds);
        self.snap.poke(now);
    }

    /// Topmost item under a pixel coordinate.
    pub fn item_at(&self, x: f64, y: f64) -> Option<usize> {
        let world = hit::to_world(x, y, &self.rect, &self.viewport)?;
        hit::pick(&self.items, world)
    }

    fn hover_at(&mut self, x: f64, y: f64) -> Option<GalleryEvent> {
        let hit = self.item_at(x, y);
        self.set_hovered(hit)
    }

    fn set_hovered(&mut self, hit: Option<usize>) -> Option<GalleryEvent> {
        if hit == self.hovered {
            return None;
        }
        self.hovered = hit;
        let id = hit.and_then(|index| self.slides.get(index)).map(|s| s.id.clone());
        debug!(index = ?hit, id = ?id, "hover changed");
        Some(GalleryEvent::Hovered { index: hit, id })
    }

    fn click_at(&mut self, x: f64, y: f64) -> Option<GalleryEvent> {
        let index = self.item_at(x, y)?;
        let id = self.slides.get(index)?.id.clone();
        info!(index, id = %id, "item opened");
        Some(GalleryEvent::Open { index, id })
    }

    /// Record that the image for item `index` decoded.
    pub fn mark_loaded(&mut self, index: usize) {
        self.loads.settle(index);
    }

    /// Record that the image for item `index` will never arrive.
    pub fn mark_failed(&mut self, index: usize) {
        self.loads.settle(index);
    }

    /// Feed the backdrop image aspect ratio once it is known.
    pub fn set_backdrop_aspect(&mut self, aspect: f64) {
        self.background.set_aspect_ratio(aspect, self.scroll.current);
    }

    /// Run one frame: timers, clamp, ease, direction, items, backdrop, bookkeeping.
    pub fn frame(&mut self, now: Instant) -> Vec<GalleryEvent> {
        let mut events = Vec::new();

        if self.snap.fire_if_due(now) && !self.input.is_down() {
            self.snap();
        }
        if let Some((x, y)) = self.hover.poll(now) {
            events.extend(self.hover_at(x, y));
        }

        self.scroll.clamp(&self.bounds);
        self.scroll.advance();
        let direction = self.scroll.direction();

        for item in &mut self.items {
            if let Some(relocation) = item.update(&self.scroll, direction) {
                trace!(
                    index = item.index,
                    ?relocation,
                    extra = item.extra,
                    "item wrapped"
                );
            }
        }
        self.background.update(&self.scroll, direction);

        if let Some(timed_out) = self.loads.poll(now) {
            info!(
                timed_out,
                settled = self.loads.settled_count(),
                total = self.items.len(),
                "gallery ready"
            );
            events.push(GalleryEvent::Ready { timed_out });
        }
        if self.loads.is_ready() {
            self.fade = (self.fade + FADE_STEP).min(1.0);
        }

        if !self.items.is_empty() {
            let index = self.target_index();
            if self.announced_index != Some(index) {
                self.announced_index = Some(index);
                debug!(index, total = self.items.len(), "slide changed");
                events.push(GalleryEvent::SlideChanged {
                    index,
                    total: self.items.len(),
                });
            }
        }

        self.scroll.commit_frame();
        events
    }
}

fn surface_rect(screen: Screen) -> SurfaceRect {
    SurfaceRect::sized(f64::from(screen.width), f64::from(screen.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slides(count: usize) -> Vec<Slide> {
        (0..count).map(|i| Slide::new(format!("slide-{i}"))).collect()
    }

    fn carousel(count: usize, bounds: BoundsMode) -> (Carousel, Instant) {
        let now = Instant::now();
        let options = CarouselOptions {
            bounds,
            seed: Some(1),
            ..CarouselOptions::default()
        };
        (Carousel::new(options, slides(count), Screen::new(1600, 900), now), now)
    }

    #[test]
    fn bounded_navigation_clamps_and_disables_ends() {
        let (mut carousel, _) = carousel(3, BoundsMode::Bounded);
        assert!(!carousel.indicator().can_previous);
        carousel.previous();
        assert_eq!(carousel.scroll().target, 0.0);

        carousel.navigate(10);
        assert_eq!(carousel.target_index(), 2);
        assert!(!carousel.indicator().can_next);
        carousel.next();
        assert_eq!(carousel.target_index(), 2);
    }

    #[test]
    fn infinite_next_wraps_forward() {
        let (mut carousel, _) = carousel(4, BoundsMode::Infinite);
        let width = carousel.item_width();
        carousel.navigate(1);
        carousel.next();
        carousel.next();
        assert!((carousel.scroll().target - width * 3.0).abs() < 1e-9);
        carousel.next();
        assert_eq!(carousel.target_index(), 0);
        assert!((carousel.scroll().target - width * 4.0).abs() < 1e-9);
        carousel.previous();
        assert!((carousel.scroll().target - width * 3.0).abs() < 1e-9);
    }

    #[test]
    fn load_tracker_reports_ready_once() {
        let (mut carousel, now) = carousel(2, BoundsMode::Infinite);
        assert!(carousel.frame(now).iter().all(|e| !matches!(e, GalleryEvent::Ready { .. })));
        carousel.mark_loaded(0);
        carousel.mark_failed(1);
        let events = carousel.frame(now);
        assert!(events.contains(&GalleryEvent::Ready { timed_out: false }));
        assert!(carousel.frame(now).iter().all(|e| !matches!(e, GalleryEvent::Ready { .. })));
    }

    #[test]
    fn load_timeout_forces_ready() {
        let (mut carousel, now) = carousel(2, BoundsMode::Infinite);
        let later = now + Duration::from_secs(11);
        assert!(carousel.frame(later).contains(&GalleryEvent::Ready { timed_out: true }));
        assert!(carousel.is_ready());
    }

    #[test]
    fn first_frame_announces_slide() {
        let (mut carousel, now) = carousel(3, BoundsMode::Infinite);
        let events = carousel.frame(now);
        assert!(events.contains(&GalleryEvent::SlideChanged { index: 0, total: 3 }));
        let again = carousel.frame(now);
        assert!(
            !again
                .iter()
                .any(|e| matches!(e, GalleryEvent::SlideChanged { .. }))
        );
    }

    #[test]
    fn empty_carousel_runs_frames() {
        let (mut carousel, now) = carousel(0, BoundsMode::Infinite);
        carousel.next();
        carousel.snap();
        let events = carousel.frame(now + Duration::from_secs(20));
        assert!(events.contains(&GalleryEvent::Ready { timed_out: false }));
        assert_eq!(carousel.indicator().total_slides, 0);
    }
}
