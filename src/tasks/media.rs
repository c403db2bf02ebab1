use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{Configuration, MediaEntry};
use crate::error::GalleryError;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "jfif"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Media entries for the carousel: the configured list, or else a sorted
/// recursive scan of `media-dir`.
pub fn discover(cfg: &Configuration) -> Result<Vec<MediaEntry>, GalleryError> {
    if !cfg.media.is_empty() {
        info!(count = cfg.media.len(), "using configured media list");
        return Ok(cfg.media.clone());
    }
    let Some(dir) = cfg.media_dir.as_deref() else {
        return Err(GalleryError::NoMedia);
    };
    let entries = scan_dir(dir)?;
    if entries.is_empty() {
        return Err(GalleryError::NoMedia);
    }
    Ok(entries)
}

pub fn scan_dir(dir: &Path) -> Result<Vec<MediaEntry>, GalleryError> {
    if !dir.is_dir() {
        return Err(GalleryError::InvalidMediaDir(dir.to_path_buf()));
    }
    let mut paths: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image(p))
        .collect();
    paths.sort();
    for path in &paths {
        debug!(path = %path.display(), "discovered media");
    }
    info!(root = %dir.display(), discovered = paths.len(), "media scan complete");
    Ok(paths.into_iter().map(MediaEntry::from_path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn recognises_image_extensions_case_insensitively() {
        assert!(is_image(Path::new("a/b/photo.JPG")));
        assert!(is_image(Path::new("x.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("no_extension")));
    }

    #[test]
    fn scan_is_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.png"), b"").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("nested/c.gif"), b"").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"").unwrap();

        let entries = scan_dir(dir.path()).unwrap();
        let names: Vec<String> = entries.iter().map(MediaEntry::id).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn explicit_list_wins_over_directory() {
        let cfg = Configuration {
            media: vec![MediaEntry::from_path("one.png")],
            media_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Configuration::default()
        };
        let entries = discover(&cfg).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_directory_is_reported() {
        let cfg = Configuration {
            media_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Configuration::default()
        };
        assert!(matches!(
            discover(&cfg),
            Err(GalleryError::InvalidMediaDir(_))
        ));
    }

    #[test]
    fn empty_directory_means_no_media() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Configuration {
            media_dir: Some(dir.path().to_path_buf()),
            ..Configuration::default()
        };
        assert!(matches!(discover(&cfg), Err(GalleryError::NoMedia)));
        assert!(matches!(
            discover(&Configuration::default()),
            Err(GalleryError::NoMedia)
        ));
    }
}
