use std::collections::VecDeque;
use std::path::Path;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GalleryError;
use crate::events::{DecodedImage, LoadMedia, LoaderEvent};

/// Longest texture edge uploaded to the GPU; larger images are downscaled.
pub const MAX_TEXTURE_DIMENSION: u32 = 4096;

/// Decode an image file to RGBA8.
pub fn decode_rgba8(path: &Path) -> Result<image::RgbaImage, GalleryError> {
    let decode_err = |source| GalleryError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(decode_err)?;
    let img = if img.width().max(img.height()) > MAX_TEXTURE_DIMENSION {
        debug!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            "downscaling oversized image"
        );
        img.resize(
            MAX_TEXTURE_DIMENSION,
            MAX_TEXTURE_DIMENSION,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };
    Ok(img.to_rgba8())
}

fn decode_request(request: LoadMedia) -> LoaderEvent {
    match decode_rgba8(&request.path) {
        Ok(rgba8) => {
            let (width, height) = rgba8.dimensions();
            LoaderEvent::Loaded(DecodedImage {
                slot: request.slot,
                path: request.path,
                width,
                height,
                pixels: rgba8.into_raw(),
            })
        }
        Err(err) => {
            warn!(path = %request.path.display(), error = %err, "media failed to load");
            LoaderEvent::Failed {
                slot: request.slot,
                path: request.path,
            }
        }
    }
}

/// Decode requested images with at most `max_in_flight` decodes running,
/// forwarding each result (or failure) to the viewer.
pub async fn run(
    mut load_rx: Receiver<LoadMedia>,
    to_viewer: Sender<LoaderEvent>,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let max_in_flight = max_in_flight.max(1);
    let mut queue: VecDeque<LoadMedia> = VecDeque::new();
    let mut tasks: JoinSet<LoaderEvent> = JoinSet::new();
    let mut requests_open = true;

    loop {
        while tasks.len() < max_in_flight {
            let Some(request) = queue.pop_front() else {
                break;
            };
            debug!(path = %request.path.display(), slot = ?request.slot, "decoding");
            tasks.spawn(async move {
                let slot = request.slot;
                let path = request.path.clone();
                match tokio::task::spawn_blocking(move || decode_request(request)).await {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "decode task panicked");
                        LoaderEvent::Failed { slot, path }
                    }
                }
            });
        }

        if !requests_open && queue.is_empty() && tasks.is_empty() {
            break;
        }

        select! {
            _ = cancel.cancelled() => break,

            request = load_rx.recv(), if requests_open => {
                match request {
                    Some(request) => queue.push_back(request),
                    None => requests_open = false,
                }
            }

            Some(joined) = tasks.join_next() => {
                if let Ok(event) = joined {
                    if to_viewer.send(event).await.is_err() {
                        debug!("viewer gone; stopping loader");
                        break;
                    }
                }
            }
        }
    }
    tasks.abort_all();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TextureSlot;
    use tokio::sync::mpsc;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn decodes_to_rgba8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        write_png(&path, 3, 2);
        let img = decode_rgba8(&path).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(
            decode_rgba8(&path),
            Err(GalleryError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn forwards_every_request_then_exits() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        write_png(&good, 4, 2);
        let missing = dir.path().join("missing.png");

        let (load_tx, load_rx) = mpsc::channel(4);
        let (viewer_tx, mut viewer_rx) = mpsc::channel(4);
        load_tx
            .send(LoadMedia {
                slot: TextureSlot::Item(0),
                path: good,
            })
            .await
            .unwrap();
        load_tx
            .send(LoadMedia {
                slot: TextureSlot::Backdrop,
                path: missing,
            })
            .await
            .unwrap();
        drop(load_tx);

        run(load_rx, viewer_tx, CancellationToken::new(), 1)
            .await
            .unwrap();

        let mut loaded = 0;
        let mut failed = 0;
        while let Ok(event) = viewer_rx.try_recv() {
            match event {
                LoaderEvent::Loaded(image) => {
                    assert_eq!(image.slot, TextureSlot::Item(0));
                    assert_eq!(image.aspect_ratio(), 2.0);
                    loaded += 1;
                }
                LoaderEvent::Failed { slot, .. } => {
                    assert_eq!(slot, TextureSlot::Backdrop);
                    failed += 1;
                }
            }
        }
        assert_eq!((loaded, failed), (1, 1));
    }
}
