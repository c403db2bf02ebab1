use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use scroll_gallery::config::Configuration;
use scroll_gallery::events::{GalleryEvent, LoadMedia, LoaderEvent, TextureSlot};
use scroll_gallery::gallery::Slide;
use scroll_gallery::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "scroll-gallery",
    version,
    about = "scroll-driven 3D image carousel"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Scan this directory instead of the configured media
    #[arg(long = "media-dir", value_name = "DIR")]
    media_dir: Option<PathBuf>,
    /// Fixed seed for shader phases and particles
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::new(format!(
        "{level},wgpu=warn,wgpu_core=warn,wgpu_hal=warn,naga=warn,winit=warn"
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        media_dir,
        seed,
        verbose,
    } = Args::parse();

    // init tracing (RUST_LOG overrides, default = info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if let Some(dir) = media_dir {
        cfg.media.clear();
        cfg.media_dir = Some(dir);
    }
    if seed.is_some() {
        cfg.seed = seed;
    }
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let media = tasks::media::discover(&cfg).context("failed to discover media")?;
    let slides: Vec<Slide> = media
        .iter()
        .map(|entry| Slide {
            id: entry.id(),
            title: entry.title.clone(),
        })
        .collect();
    tracing::info!(count = slides.len(), "gallery media ready to load");

    // Channels (small/bounded)
    let (to_load_tx, to_load_rx) = mpsc::channel::<LoadMedia>(media.len() + 1); // Main -> Loader
    let (loaded_tx, loaded_rx) =
        mpsc::channel::<LoaderEvent>(cfg.loader_max_concurrent_decodes); // Loader -> Viewer
    let (gallery_tx, mut gallery_rx) = mpsc::channel::<GalleryEvent>(64); // Viewer -> outside

    for (index, entry) in media.iter().enumerate() {
        to_load_tx
            .send(LoadMedia {
                slot: TextureSlot::Item(index),
                path: entry.path.clone(),
            })
            .await
            .context("loader queue closed")?;
    }
    if let Some(path) = cfg.background.image_path() {
        to_load_tx
            .send(LoadMedia {
                slot: TextureSlot::Backdrop,
                path: path.to_path_buf(),
            })
            .await
            .context("loader queue closed")?;
    }
    drop(to_load_tx);

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // MediaLoader
    tasks.spawn({
        let cancel = cancel.clone();
        let max_in_flight = cfg.loader_max_concurrent_decodes;
        async move {
            tasks::loader::run(to_load_rx, loaded_tx, cancel, max_in_flight)
                .await
                .context("loader task failed")
        }
    });

    // GalleryEvents: navigation and chrome live outside; log what they would receive.
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = gallery_rx.recv() => match event {
                        Some(GalleryEvent::Open { index, id }) => {
                            tracing::info!(index, id = %id, "open requested");
                        }
                        Some(GalleryEvent::SlideChanged { index, total }) => {
                            tracing::debug!(index, total, "indicator update");
                        }
                        Some(event) => tracing::debug!(?event, "gallery event"),
                        None => break,
                    }
                }
            }
            Ok(())
        }
    });

    // Run the windowed viewer on the main thread (blocking) after spawning other tasks
    if let Err(e) = tasks::viewer::run_windowed(cfg, slides, loaded_rx, gallery_tx, cancel.clone())
        .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    // Ensure other tasks are asked to stop
    cancel.cancel();

    // Drain JoinSet (wait for other tasks to complete)
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
