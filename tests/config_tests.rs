use scroll_gallery::config::{BackgroundConfig, Configuration};
use scroll_gallery::gallery::BoundsMode;
use scroll_gallery::gallery::background::BackgroundKind;
use scroll_gallery::gallery::item::{CylinderReference, Layout};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert!(cfg.media.is_empty());
    assert_eq!(cfg.camera.fov_degrees, 45.0);
    assert_eq!(cfg.camera.distance, 20.0);
    assert_eq!(cfg.scroll.ease, 0.05);
    assert_eq!(cfg.scroll.snap_debounce, Duration::from_millis(200));
    assert_eq!(cfg.scroll.hover_throttle, Duration::from_millis(50));
    assert_eq!(cfg.scroll.bounds, BoundsMode::Infinite);
    assert_eq!(cfg.layout, Layout::cylinder());
    assert_eq!(cfg.background, BackgroundConfig::None);
    assert_eq!(cfg.load_timeout, Duration::from_secs(10));
    assert_eq!(cfg.max_device_pixel_ratio, 2.0);
    assert!(cfg.validated().is_ok());
}

#[test]
fn parse_kebab_case_media_and_scroll() {
    let yaml = r#"
media:
  - path: "/photos/one.jpg"
    title: "One"
  - path: "/photos/two.png"
    id: "second"
scroll:
  ease: 0.1
  wheel-multiplier: 0.01
  snap-debounce: 350ms
  click-threshold-px: 8
  bounds: bounded
load-timeout: 3s
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.media.len(), 2);
    assert_eq!(cfg.media[0].path, PathBuf::from("/photos/one.jpg"));
    assert_eq!(cfg.media[0].title.as_deref(), Some("One"));
    assert_eq!(cfg.media[0].id(), "one");
    assert_eq!(cfg.media[1].id(), "second");
    assert_eq!(cfg.scroll.ease, 0.1);
    assert_eq!(cfg.scroll.wheel_multiplier, 0.01);
    assert_eq!(cfg.scroll.drag_multiplier, 0.01);
    assert_eq!(cfg.scroll.snap_debounce, Duration::from_millis(350));
    assert_eq!(cfg.scroll.click_threshold_px, 8.0);
    assert_eq!(cfg.scroll.bounds, BoundsMode::Bounded);
    assert_eq!(cfg.load_timeout, Duration::from_secs(3));
}

#[test]
fn parse_wave_layout_with_defaults() {
    let yaml = r#"
layout:
  type: wave
  amplitude: 10
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        cfg.layout,
        Layout::Wave {
            amplitude: 10.0,
            vertical_offset: -74.5,
        }
    );
}

#[test]
fn parse_cylinder_viewport_reference() {
    let yaml = r#"
layout:
  type: cylinder
  reference: viewport
  rotation-intensity: 2
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        cfg.layout,
        Layout::Cylinder {
            radius: 0.5,
            reference: CylinderReference::Viewport,
            rotation_intensity: 2.0,
        }
    );
}

#[test]
fn parse_tiles_background() {
    let yaml = r#"
background:
  type: tiles
  path: "/photos/backdrop.jpg"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        cfg.background.image_path(),
        Some(PathBuf::from("/photos/backdrop.jpg").as_path())
    );
    assert_eq!(
        cfg.background.kind(None),
        BackgroundKind::Tiles {
            count: 3,
            scroll_speed: 0.5,
            aspect_ratio: None,
        }
    );
}

#[test]
fn tiles_may_scroll_against_the_carousel() {
    let yaml = r#"
background:
  type: tiles
  path: "/photos/backdrop.jpg"
  scroll-speed: -0.5
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(
        cfg.carousel_options().background,
        BackgroundKind::Tiles {
            count: 3,
            scroll_speed: -0.5,
            aspect_ratio: None,
        }
    );
}

#[test]
fn particles_inherit_global_seed() {
    let yaml = r#"
seed: 9
background:
  type: particles
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        cfg.carousel_options().background,
        BackgroundKind::Particles {
            count: 50,
            seed: Some(9),
        }
    );
}

#[test]
fn focus_and_sizing_sections_parse() {
    let yaml = r#"
sizing:
  padding: 1.5
focus:
  scale-floor: 0.3
  min-opacity: 0.2
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.sizing.padding, 1.5);
    assert_eq!(cfg.sizing.plane_width_px, 500.0);
    assert_eq!(cfg.focus.scale_floor, 0.3);
    assert_eq!(cfg.focus.min_opacity, 0.2);
    let options = cfg.carousel_options();
    assert_eq!(options.style.sizing.padding, 1.5);
}

#[test]
fn validation_rejects_bad_values() {
    let bad = [
        "scroll: { ease: 0 }",
        "scroll: { ease: 1.5 }",
        "camera: { fov-degrees: 180 }",
        "camera: { distance: 0 }",
        "focus: { min-opacity: 1.5 }",
        "sizing: { padding: -1 }",
        "scroll: { click-threshold-px: 0 }",
        "background: { type: tiles, path: a.jpg, count: 1 }",
        "background: { type: particles, count: 0 }",
        "loader-max-concurrent-decodes: 0",
    ];
    for yaml in bad {
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err(), "accepted {yaml}");
    }
}

#[test]
fn from_yaml_file_reads_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gallery.yaml");
    std::fs::write(&path, "media-dir: /photos\nfullscreen: true\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.media_dir, Some(PathBuf::from("/photos")));
    assert!(cfg.fullscreen);
}

#[test]
fn from_yaml_file_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Configuration::from_yaml_file(dir.path().join("absent.yaml")).is_err());
}
