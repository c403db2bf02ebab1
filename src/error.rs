use std::path::PathBuf;

use thiserror::Error;

/// Library error type for gallery operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Neither the media list nor the media directory yielded any image.
    #[error("no media to show")]
    NoMedia,

    /// The configured media directory is missing or not a directory.
    #[error("invalid media directory: {0}")]
    InvalidMediaDir(PathBuf),

    /// An image file could not be decoded.
    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
