pub mod renderer;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use renderer::GalleryRenderer;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{CursorIcon, Fullscreen, Window, WindowAttributes},
};

use crate::{
    config::{BackgroundConfig, Configuration},
    events::{GalleryEvent, LoaderEvent, TextureSlot},
    gallery::{Carousel, Screen, Slide, input::WheelDelta},
};

#[derive(Debug)]
pub enum ViewerEvent {
    Cancelled,
}

type LoaderReceiver = mpsc::Receiver<LoaderEvent>;
type GallerySender = mpsc::Sender<GalleryEvent>;

/// Surface size for a window, capping the device pixel ratio at `max_ratio`.
pub fn backing_size(logical: (f64, f64), scale_factor: f64, max_ratio: f64) -> (u32, u32) {
    let ratio = scale_factor.min(max_ratio).max(f64::MIN_POSITIVE);
    let width = (logical.0 * ratio).round().max(1.0) as u32;
    let height = (logical.1 * ratio).round().max(1.0) as u32;
    (width, height)
}

fn logical_screen(size: PhysicalSize<u32>, scale_factor: f64) -> Screen {
    let logical = size.to_logical::<f64>(scale_factor);
    Screen::new(logical.width.round() as u32, logical.height.round() as u32)
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    slides: Vec<Slide>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    renderer: Option<GalleryRenderer>,
    carousel: Option<Carousel>,
    cursor: (f64, f64),
    active_touch: Option<u64>,
    cursor_icon: CursorIcon,
    from_loader: LoaderReceiver,
    to_outside: GallerySender,
}

impl ViewerApp {
    fn new(
        cfg: Configuration,
        slides: Vec<Slide>,
        cancel: CancellationToken,
        from_loader: LoaderReceiver,
        to_outside: GallerySender,
    ) -> Self {
        Self {
            cfg,
            cancel,
            slides,
            window: None,
            surface: None,
            surface_config: None,
            device: None,
            queue: None,
            renderer: None,
            carousel: None,
            cursor: (0.0, 0.0),
            active_touch: None,
            cursor_icon: CursorIcon::Default,
            from_loader,
            to_outside,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let mut attrs = WindowAttributes::default().with_title(self.cfg.window_title.clone());
        if self.cfg.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create gallery window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("gallery-device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let logical = size.to_logical::<f64>(window.scale_factor());
        let (width, height) = backing_size(
            (logical.width, logical.height),
            window.scale_factor(),
            self.cfg.max_device_pixel_ratio,
        );
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "gallery surface configured",
        );

        let mut renderer = GalleryRenderer::new(&device, &queue, format);
        renderer.reset_items(self.slides.len());

        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.device = Some(device);
        self.queue = Some(queue);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn ensure_carousel(&mut self, window: &Window) {
        if self.carousel.is_some() {
            return;
        }
        let screen = logical_screen(window.inner_size(), window.scale_factor());
        let carousel = Carousel::new(
            self.cfg.carousel_options(),
            self.slides.clone(),
            screen,
            Instant::now(),
        );
        self.carousel = Some(carousel);
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let scale_factor = window.scale_factor();
        if let Some(carousel) = self.carousel.as_mut() {
            carousel.handle_resize(logical_screen(new_size, scale_factor));
        }

        let (Some(surface), Some(device), Some(config)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.surface_config.as_mut(),
        ) else {
            return;
        };
        let logical = new_size.to_logical::<f64>(scale_factor);
        let (width, height) = backing_size(
            (logical.width, logical.height),
            scale_factor,
            self.cfg.max_device_pixel_ratio,
        );
        config.width = width;
        config.height = height;
        surface.configure(device, config);
        debug!(
            width = config.width,
            height = config.height,
            "gallery surface resized",
        );
        window.request_redraw();
    }

    fn publish(&self, events: Vec<GalleryEvent>) {
        for event in events {
            if let GalleryEvent::Ready { timed_out } = &event {
                info!(timed_out, "gallery visible");
            }
            if let Err(err) = self.to_outside.try_send(event) {
                debug!(error = %err, "gallery event dropped");
            }
        }
    }

    fn update_cursor_icon(&mut self) {
        let Some(carousel) = self.carousel.as_ref() else {
            return;
        };
        let icon = if carousel.is_dragging() {
            CursorIcon::Grabbing
        } else if carousel.hovered().is_some() {
            CursorIcon::Pointer
        } else {
            CursorIcon::Default
        };
        if icon != self.cursor_icon {
            self.cursor_icon = icon;
            if let Some(window) = self.window.as_ref() {
                window.set_cursor(icon);
            }
        }
    }

    fn to_logical(&self, position: PhysicalPosition<f64>) -> (f64, f64) {
        let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        let logical = position.to_logical::<f64>(scale);
        (logical.x, logical.y)
    }

    fn pointer_down(&mut self, at: (f64, f64)) {
        if let Some(carousel) = self.carousel.as_mut() {
            carousel.handle_pointer_down(at.0, at.1);
        }
        self.update_cursor_icon();
    }

    fn pointer_move(&mut self, at: (f64, f64)) {
        let events = match self.carousel.as_mut() {
            Some(carousel) => carousel.handle_pointer_move(at.0, at.1, Instant::now()),
            None => return,
        };
        self.publish(events);
        self.update_cursor_icon();
    }

    fn pointer_up(&mut self, at: (f64, f64)) {
        let events = match self.carousel.as_mut() {
            Some(carousel) => carousel.handle_pointer_up(at.0, at.1),
            None => return,
        };
        self.publish(events);
        self.update_cursor_icon();
    }

    fn pointer_leave(&mut self) {
        let events = match self.carousel.as_mut() {
            Some(carousel) => carousel.handle_pointer_leave(),
            None => return,
        };
        self.publish(events);
        self.update_cursor_icon();
    }

    fn wheel(&mut self, delta: MouseScrollDelta) {
        let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        // Positive wheel deltas scroll content forward, as on the web.
        let delta = match delta {
            MouseScrollDelta::LineDelta(x, y) => WheelDelta::Lines {
                x: -f64::from(x),
                y: -f64::from(y),
            },
            MouseScrollDelta::PixelDelta(position) => WheelDelta::Pixels {
                x: -position.x / scale,
                y: -position.y / scale,
            },
        };
        if let Some(carousel) = self.carousel.as_mut() {
            carousel.handle_wheel(delta, Instant::now());
        }
    }

    fn drain_loader(&mut self) {
        let (Some(carousel), Some(renderer), Some(device), Some(queue)) = (
            self.carousel.as_mut(),
            self.renderer.as_mut(),
            self.device.as_ref(),
            self.queue.as_ref(),
        ) else {
            return;
        };
        let measure_backdrop = matches!(
            self.cfg.background,
            BackgroundConfig::Tiles {
                aspect_ratio: None,
                ..
            }
        );
        loop {
            match self.from_loader.try_recv() {
                Ok(LoaderEvent::Loaded(image)) => {
                    renderer.upload(device, queue, &image);
                    match image.slot {
                        TextureSlot::Item(index) => carousel.mark_loaded(index),
                        TextureSlot::Backdrop if measure_backdrop => {
                            carousel.set_backdrop_aspect(image.aspect_ratio());
                        }
                        TextureSlot::Backdrop => {}
                    }
                }
                Ok(LoaderEvent::Failed { slot, path }) => {
                    debug!(path = %path.display(), ?slot, "media settled without texture");
                    if let TextureSlot::Item(index) = slot {
                        carousel.mark_failed(index);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let events = match self.carousel.as_mut() {
            Some(carousel) => carousel.frame(Instant::now()),
            None => return,
        };
        self.publish(events);
        self.update_cursor_icon();

        let (Some(surface), Some(device), Some(queue), Some(window)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.queue.as_ref(),
            self.window.clone(),
        ) else {
            return;
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("gallery surface lost; reconfiguring");
                self.handle_resize(window.inner_size());
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("gallery surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("gallery surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("gallery surface reported an unknown error; retrying");
                self.handle_resize(window.inner_size());
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gallery-encoder"),
        });

        if let (Some(renderer), Some(carousel)) = (self.renderer.as_mut(), self.carousel.as_ref()) {
            renderer.render(device, queue, &mut encoder, &view, carousel);
        }

        queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop, reason: &str) {
        info!(reason, "gallery shutting down");
        self.cancel.cancel();
        self.renderer = None;
        self.carousel = None;
        event_loop.exit();
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.device.is_none() {
            if let Err(err) = self.init_gpu(window.clone()) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }
        self.ensure_carousel(&window);
        window.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop, "window close requested");
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = self.to_logical(position);
                self.pointer_move(self.cursor);
            }
            WindowEvent::CursorLeft { .. } => self.pointer_leave(),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.pointer_down(self.cursor),
                ElementState::Released => self.pointer_up(self.cursor),
            },
            WindowEvent::MouseWheel { delta, .. } => self.wheel(delta),
            WindowEvent::Touch(touch) => {
                if self.active_touch.is_some_and(|id| id != touch.id) {
                    return;
                }
                let at = self.to_logical(touch.location);
                match touch.phase {
                    TouchPhase::Started => {
                        self.active_touch = Some(touch.id);
                        self.pointer_down(at);
                    }
                    TouchPhase::Moved => self.pointer_move(at),
                    TouchPhase::Ended => {
                        self.active_touch = None;
                        self.pointer_up(at);
                    }
                    TouchPhase::Cancelled => {
                        self.active_touch = None;
                        self.pointer_leave();
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key {
                    Key::Named(NamedKey::ArrowRight) => {
                        if let Some(carousel) = self.carousel.as_mut() {
                            carousel.next();
                        }
                    }
                    Key::Named(NamedKey::ArrowLeft) => {
                        if let Some(carousel) = self.carousel.as_mut() {
                            carousel.previous();
                        }
                    }
                    Key::Named(NamedKey::Escape) => self.shutdown(event_loop, "escape pressed"),
                    Key::Character(ref c) if c.eq_ignore_ascii_case("q") => {
                        self.shutdown(event_loop, "quit key pressed");
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.drain_loader();
        if self.carousel.is_some() {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("gallery received cancellation event");
                self.renderer = None;
                self.carousel = None;
                event_loop.exit();
            }
        }
    }
}

pub fn run_windowed(
    cfg: Configuration,
    slides: Vec<Slide>,
    from_loader: LoaderReceiver,
    to_outside: GallerySender,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build gallery event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(cfg, slides, cancel, from_loader, to_outside);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("gallery event loop failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_size_caps_pixel_ratio() {
        assert_eq!(backing_size((800.0, 600.0), 3.0, 2.0), (1600, 1200));
        assert_eq!(backing_size((800.0, 600.0), 1.5, 2.0), (1200, 900));
    }

    #[test]
    fn backing_size_never_collapses() {
        assert_eq!(backing_size((0.0, 0.0), 1.0, 2.0), (1, 1));
    }

    #[test]
    fn logical_screen_divides_by_scale() {
        let screen = logical_screen(PhysicalSize::new(2000, 1000), 2.0);
        assert_eq!(screen, Screen::new(1000, 500));
    }
}
