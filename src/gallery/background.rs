//! Backdrop layers with their own wraparound bookkeeping.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::item::{Transform, Vec3};
use super::scroll::{Direction, ScrollState};
use super::viewport::Viewport;

/// Aspect ratio assumed for backdrop tiles until the image size is known.
pub const DEFAULT_TILE_ASPECT: f64 = 16.0 / 9.0;
/// Depth of the backdrop tiles behind the carousel.
pub const TILE_DEPTH: f64 = -10.0;
/// Vertical drift per frame for a particle with speed 1.
pub const PARTICLE_DRIFT: f64 = 0.05;

/// A small drifting plane with its own parallax speed.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Baseline x before scroll and wrap offsets.
    pub x: f64,
    pub x_extra: f64,
    pub speed: f64,
    pub transform: Transform,
    pub is_before: bool,
    pub is_after: bool,
}

impl Particle {
    fn cycle(&self, viewport: &Viewport) -> f64 {
        viewport.width + self.transform.scale.x
    }

    fn place(&mut self, current: f64) {
        self.transform.position.x = self.x - current * self.speed - self.x_extra;
    }
}

/// Field of independent particles wrapping horizontally and vertically.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    viewport: Viewport,
}

impl ParticleField {
    pub fn new<R: Rng + ?Sized>(count: usize, viewport: Viewport, rng: &mut R) -> Self {
        let half_w = viewport.width * 0.5;
        let half_h = viewport.height * 0.5;
        let particles = (0..count)
            .map(|_| {
                let size = rng.random_range(0.75..=1.0);
                let speed = rng.random_range(0.75..=1.0);
                let x = sample(rng, half_w);
                let y = sample(rng, half_h);
                Particle {
                    x,
                    x_extra: 0.0,
                    speed,
                    transform: Transform {
                        position: Vec3::new(x, y, 0.0),
                        scale: Vec3::new(1.6 * size, 0.9 * size, 1.0),
                        ..Transform::default()
                    },
                    is_before: false,
                    is_after: false,
                }
            })
            .collect();
        Self {
            particles,
            viewport,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn update(&mut self, scroll: &ScrollState, direction: Direction) {
        let viewport = self.viewport;
        let edge = viewport.width * 0.5;
        for particle in &mut self.particles {
            particle.place(scroll.current);

            let cycle = particle.cycle(&viewport);
            let x = particle.transform.position.x;
            particle.is_before = x < -edge;
            particle.is_after = x > edge;

            if direction == Direction::Right && particle.is_before {
                particle.x_extra -= cycle;
                particle.is_before = false;
                particle.is_after = false;
                particle.place(scroll.current);
            }
            if direction == Direction::Left && particle.is_after {
                particle.x_extra += cycle;
                particle.is_before = false;
                particle.is_after = false;
                particle.place(scroll.current);
            }

            let position = &mut particle.transform.position;
            let span = viewport.height + particle.transform.scale.y;
            let limit = viewport.height * 0.5 + particle.transform.scale.y;
            position.y += PARTICLE_DRIFT * particle.speed;
            if span > 0.0 {
                if position.y > limit {
                    position.y -= span;
                } else if position.y < -limit {
                    position.y += span;
                }
            }
        }
    }

    /// Stretch the field onto a new viewport and pull every particle back on screen.
    pub fn on_resize(&mut self, viewport: Viewport, current: f64) {
        let ratio_w = ratio(viewport.width, self.viewport.width);
        let ratio_h = ratio(viewport.height, self.viewport.height);
        self.viewport = viewport;
        let edge = viewport.width * 0.5;
        for particle in &mut self.particles {
            particle.x *= ratio_w;
            particle.x_extra *= ratio_w;
            particle.transform.position.y *= ratio_h;
            particle.place(current);
            let cycle = particle.cycle(&viewport);
            if cycle > 0.0 {
                let x = particle.transform.position.x;
                let cycles = ((x + edge) / cycle).floor();
                particle.x_extra += cycles * cycle;
                particle.place(current);
            }
        }
    }
}

fn sample<R: Rng + ?Sized>(rng: &mut R, half: f64) -> f64 {
    if half > 0.0 {
        rng.random_range(-half..half)
    } else {
        0.0
    }
}

fn ratio(new: f64, old: f64) -> f64 {
    if old > 0.0 && new > 0.0 { new / old } else { 1.0 }
}

/// A wide backdrop tile in the ring.
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: f64,
    pub x_extra: f64,
    pub transform: Transform,
    pub is_before: bool,
    pub is_after: bool,
}

impl Tile {
    /// Position of the tile with scroll removed.
    pub fn base_x(&self) -> f64 {
        self.x + self.x_extra
    }
}

/// Ring of contiguous backdrop tiles that reorders itself as it scrolls.
#[derive(Debug, Clone)]
pub struct TiledBackdrop {
    tiles: Vec<Tile>,
    viewport: Viewport,
    aspect_ratio: Option<f64>,
    scroll_speed: f64,
}

impl TiledBackdrop {
    pub fn new(count: usize, viewport: Viewport, scroll_speed: f64) -> Self {
        let tiles = (0..count)
            .map(|_| Tile {
                x: 0.0,
                x_extra: 0.0,
                transform: Transform {
                    position: Vec3::new(0.0, 0.0, TILE_DEPTH),
                    ..Transform::default()
                },
                is_before: false,
                is_after: false,
            })
            .collect();
        let mut backdrop = Self {
            tiles,
            viewport,
            aspect_ratio: None,
            scroll_speed,
        };
        backdrop.layout();
        backdrop
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile_width(&self) -> f64 {
        self.viewport.height * self.aspect_ratio.unwrap_or(DEFAULT_TILE_ASPECT)
    }

    /// Record the real image aspect ratio once the backdrop image is decoded.
    pub fn set_aspect_ratio(&mut self, aspect: f64, current: f64) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect_ratio = Some(aspect);
            self.layout();
            self.reanchor(current);
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport, current: f64) {
        self.viewport = viewport;
        self.layout();
        self.reanchor(current);
    }

    fn layout(&mut self) {
        let tile_width = self.tile_width();
        let height = self.viewport.height;
        let centre = ((self.tiles.len().max(1) - 1) / 2) as f64;
        for (index, tile) in self.tiles.iter_mut().enumerate() {
            tile.transform.scale = Vec3::new(tile_width, height, 1.0);
            tile.x = (index as f64 - centre) * tile_width;
            tile.transform.position.x = tile.base_x();
            tile.transform.position.y = 0.0;
        }
    }

    /// Shift the whole ring by whole tiles so it is centred on the scroll.
    fn reanchor(&mut self, current: f64) {
        let tile_width = self.tile_width();
        if tile_width <= 0.0 {
            return;
        }
        let shift = (current * self.scroll_speed / tile_width).round() * tile_width;
        for tile in &mut self.tiles {
            tile.x_extra = shift;
            tile.transform.position.x = tile.x - current * self.scroll_speed + tile.x_extra;
        }
    }

    fn position_of(&self, tile: &Tile, current: f64) -> f64 {
        tile.x - current * self.scroll_speed + tile.x_extra
    }

    pub fn update(&mut self, scroll: &ScrollState, direction: Direction) {
        if self.tiles.is_empty() {
            return;
        }
        let tile_width = self.tile_width();
        let edge = self.viewport.width * 0.5;
        let half = tile_width * 0.5;
        let current = scroll.current;

        for index in 0..self.tiles.len() {
            let x = self.position_of(&self.tiles[index], current);
            let tile = &mut self.tiles[index];
            tile.transform.position.x = x;
            tile.is_before = x + half < -edge;
            tile.is_after = x - half > edge;
        }

        // A negative speed moves the ring against the scroll.
        let travel = if self.scroll_speed < 0.0 {
            direction.reversed()
        } else {
            direction
        };
        match travel {
            Direction::Right => {
                for index in 0..self.tiles.len() {
                    if !self.tiles[index].is_before {
                        continue;
                    }
                    let anchor = self.extreme(|a, b| a > b);
                    let anchor_base = self.tiles[anchor].base_x();
                    self.snap_next_to(index, anchor_base + tile_width, current);
                }
            }
            Direction::Left => {
                for index in 0..self.tiles.len() {
                    if !self.tiles[index].is_after {
                        continue;
                    }
                    let anchor = self.extreme(|a, b| a < b);
                    let anchor_base = self.tiles[anchor].base_x();
                    self.snap_next_to(index, anchor_base - tile_width, current);
                }
            }
        }
    }

    /// Index of the tile whose on-screen x wins `better` against all others.
    fn extreme(&self, better: impl Fn(f64, f64) -> bool) -> usize {
        let mut best = 0;
        for (index, tile) in self.tiles.iter().enumerate().skip(1) {
            if better(
                tile.transform.position.x,
                self.tiles[best].transform.position.x,
            ) {
                best = index;
            }
        }
        best
    }

    fn snap_next_to(&mut self, index: usize, base: f64, current: f64) {
        let speed = self.scroll_speed;
        let tile = &mut self.tiles[index];
        tile.x_extra = base - tile.x;
        tile.transform.position.x = tile.x - current * speed + tile.x_extra;
        tile.is_before = false;
        tile.is_after = false;
    }
}

/// Recipe for a [`Background`], resolved once the viewport is known.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackgroundKind {
    #[default]
    None,
    Particles {
        count: usize,
        seed: Option<u64>,
    },
    Tiles {
        count: usize,
        scroll_speed: f64,
        aspect_ratio: Option<f64>,
    },
}

impl BackgroundKind {
    pub fn build(&self, viewport: Viewport, current: f64) -> Background {
        match *self {
            Self::None => Background::None,
            Self::Particles { count, seed } => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_rng(&mut rand::rng()),
                };
                Background::Particles(ParticleField::new(count, viewport, &mut rng))
            }
            Self::Tiles {
                count,
                scroll_speed,
                aspect_ratio,
            } => {
                let mut backdrop = TiledBackdrop::new(count, viewport, scroll_speed);
                if let Some(aspect) = aspect_ratio {
                    backdrop.set_aspect_ratio(aspect, current);
                } else {
                    backdrop.on_resize(viewport, current);
                }
                Background::Tiles(backdrop)
            }
        }
    }
}

/// The backdrop variant running behind the carousel.
#[derive(Debug, Clone, Default)]
pub enum Background {
    #[default]
    None,
    Particles(ParticleField),
    Tiles(TiledBackdrop),
}

impl Background {
    pub fn update(&mut self, scroll: &ScrollState, direction: Direction) {
        match self {
            Self::None => {}
            Self::Particles(field) => field.update(scroll, direction),
            Self::Tiles(backdrop) => backdrop.update(scroll, direction),
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport, current: f64) {
        match self {
            Self::None => {}
            Self::Particles(field) => field.on_resize(viewport, current),
            Self::Tiles(backdrop) => backdrop.on_resize(viewport, current),
        }
    }

    /// Transforms of every backdrop plane, in paint order.
    pub fn planes(&self) -> Vec<Transform> {
        match self {
            Self::None => Vec::new(),
            Self::Particles(field) => field.particles.iter().map(|p| p.transform).collect(),
            Self::Tiles(backdrop) => backdrop.tiles.iter().map(|t| t.transform).collect(),
        }
    }

    /// Feed the decoded backdrop image size to a tiled backdrop.
    pub fn set_aspect_ratio(&mut self, aspect: f64, current: f64) {
        if let Self::Tiles(backdrop) = self {
            backdrop.set_aspect_ratio(aspect, current);
        }
    }
}
