use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::error::GalleryError;
use crate::gallery::background::BackgroundKind;
use crate::gallery::carousel::{BoundsMode, CarouselOptions};
use crate::gallery::input::InputOptions;
use crate::gallery::item::{FocusStyle, ItemSizing, ItemStyle, Layout};
use crate::gallery::viewport::PerspectiveCamera;

/// One image in the carousel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MediaEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub title: Option<String>,
    /// Identity reported on hover and click; defaults to the file stem.
    #[serde(default)]
    pub id: Option<String>,
}

impl MediaEntry {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: None,
            id: None,
        }
    }

    pub fn id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CameraOptions {
    pub fov_degrees: f64,
    /// Distance from the camera to the carousel plane.
    pub distance: f64,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            distance: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScrollOptions {
    /// Fraction of the remaining distance covered each frame.
    pub ease: f64,
    pub wheel_multiplier: f64,
    pub drag_multiplier: f64,
    /// Quiet period after the last wheel tick before snapping to an item.
    #[serde(with = "humantime_serde")]
    pub snap_debounce: Duration,
    /// Minimum spacing between hover hit tests.
    #[serde(with = "humantime_serde")]
    pub hover_throttle: Duration,
    pub click_threshold_px: f64,
    pub bounds: BoundsMode,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        let input = InputOptions::default();
        Self {
            ease: 0.05,
            wheel_multiplier: input.wheel_multiplier,
            drag_multiplier: input.drag_multiplier,
            snap_debounce: Duration::from_millis(200),
            hover_throttle: Duration::from_millis(50),
            click_threshold_px: input.click_threshold_px,
            bounds: BoundsMode::Infinite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackgroundConfig {
    #[default]
    None,
    /// Drifting particles with parallax.
    #[serde(rename_all = "kebab-case")]
    Particles {
        #[serde(default = "BackgroundConfig::default_particle_count")]
        count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// A ring of wide image tiles behind the carousel.
    #[serde(rename_all = "kebab-case")]
    Tiles {
        path: PathBuf,
        #[serde(default = "BackgroundConfig::default_tile_count")]
        count: usize,
        #[serde(default = "BackgroundConfig::default_tile_scroll_speed")]
        scroll_speed: f64,
        /// Known width / height of the image; measured after decoding otherwise.
        #[serde(default)]
        aspect_ratio: Option<f64>,
    },
}

impl BackgroundConfig {
    const fn default_particle_count() -> usize {
        50
    }

    const fn default_tile_count() -> usize {
        3
    }

    const fn default_tile_scroll_speed() -> f64 {
        0.5
    }

    pub fn kind(&self, seed: Option<u64>) -> BackgroundKind {
        match self {
            Self::None => BackgroundKind::None,
            Self::Particles { count, seed: own } => BackgroundKind::Particles {
                count: *count,
                seed: own.or(seed),
            },
            Self::Tiles {
                count,
                scroll_speed,
                aspect_ratio,
                ..
            } => BackgroundKind::Tiles {
                count: *count,
                scroll_speed: *scroll_speed,
                aspect_ratio: *aspect_ratio,
            },
        }
    }

    /// Image the backdrop needs decoded, if any.
    pub fn image_path(&self) -> Option<&Path> {
        match self {
            Self::Tiles { path, .. } => Some(path),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::None => {}
            Self::Particles { count, .. } => {
                ensure!(*count > 0, "background.count must be greater than zero");
            }
            Self::Tiles {
                count,
                scroll_speed,
                aspect_ratio,
                ..
            } => {
                ensure!(*count >= 2, "background.count must be at least 2 for tiles");
                ensure!(
                    scroll_speed.is_finite(),
                    "background.scroll-speed must be finite"
                );
                if let Some(aspect) = aspect_ratio {
                    ensure!(*aspect > 0.0, "background.aspect-ratio must be positive");
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Explicit list of images, in carousel order.
    pub media: Vec<MediaEntry>,
    /// Directory scanned recursively when `media` is empty.
    pub media_dir: Option<PathBuf>,
    pub camera: CameraOptions,
    pub scroll: ScrollOptions,
    pub layout: Layout,
    pub sizing: ItemSizing,
    pub focus: FocusStyle,
    /// Multiplier on every plane's base size.
    pub item_scale: f64,
    pub background: BackgroundConfig,
    /// Longest wait for images before the gallery shows itself anyway.
    #[serde(with = "humantime_serde")]
    pub load_timeout: Duration,
    /// Cap on the backing store scale for high-density displays.
    pub max_device_pixel_ratio: f64,
    /// Maximum number of concurrent image decodes in the loader.
    pub loader_max_concurrent_decodes: usize,
    /// Optional deterministic seed for shader phases and particles.
    pub seed: Option<u64>,
    pub window_title: String,
    pub fullscreen: bool,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path).map_err(GalleryError::from)?;
        Ok(serde_yaml::from_str(&s).map_err(GalleryError::from)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.scroll.ease > 0.0 && self.scroll.ease <= 1.0,
            "scroll.ease must be in (0, 1]"
        );
        ensure!(
            self.scroll.click_threshold_px > 0.0,
            "scroll.click-threshold-px must be positive"
        );
        ensure!(
            self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0,
            "camera.fov-degrees must be between 0 and 180"
        );
        ensure!(self.camera.distance > 0.0, "camera.distance must be positive");
        ensure!(
            self.sizing.reference_height_px > 0.0
                && self.sizing.plane_width_px > 0.0
                && self.sizing.plane_height_px > 0.0,
            "sizing pixel dimensions must be positive"
        );
        ensure!(self.sizing.padding >= 0.0, "sizing.padding must not be negative");
        ensure!(
            (0.0..=1.0).contains(&self.focus.min_opacity),
            "focus.min-opacity must be in [0, 1]"
        );
        ensure!(self.item_scale > 0.0, "item-scale must be positive");
        ensure!(
            self.max_device_pixel_ratio > 0.0,
            "max-device-pixel-ratio must be positive"
        );
        ensure!(
            self.loader_max_concurrent_decodes > 0,
            "loader-max-concurrent-decodes must be greater than zero"
        );
        self.background.validate()?;
        Ok(self)
    }

    pub fn carousel_options(&self) -> CarouselOptions {
        CarouselOptions {
            camera: PerspectiveCamera::new(self.camera.fov_degrees, self.camera.distance),
            ease: self.scroll.ease,
            bounds: self.scroll.bounds,
            input: InputOptions {
                wheel_multiplier: self.scroll.wheel_multiplier,
                drag_multiplier: self.scroll.drag_multiplier,
                click_threshold_px: self.scroll.click_threshold_px,
            },
            snap_debounce: self.scroll.snap_debounce,
            hover_throttle: self.scroll.hover_throttle,
            load_timeout: self.load_timeout,
            style: ItemStyle {
                layout: self.layout,
                sizing: self.sizing,
                focus: self.focus,
                scale_multiplier: self.item_scale,
            },
            background: self.background.kind(self.seed),
            seed: self.seed,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            media: Vec::new(),
            media_dir: None,
            camera: CameraOptions::default(),
            scroll: ScrollOptions::default(),
            layout: Layout::default(),
            sizing: ItemSizing::default(),
            focus: FocusStyle::default(),
            item_scale: 1.0,
            background: BackgroundConfig::default(),
            load_timeout: Duration::from_secs(10),
            max_device_pixel_ratio: 2.0,
            loader_max_concurrent_decodes: 4,
            seed: None,
            window_title: String::from("Scroll Gallery"),
            fullscreen: false,
        }
    }
}
