use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, warn};

use crate::events::{DecodedImage, TextureSlot};
use crate::gallery::background::Background;
use crate::gallery::hit;
use crate::gallery::item::{TIME_STEP, Transform};
use crate::gallery::Carousel;

const PLACEHOLDER_RGBA: [u8; 4] = [38, 38, 42, 255];
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.025,
    a: 1.0,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    fade: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct PlaneUniform {
    model: [[f32; 4]; 4],
    opacity: f32,
    time: f32,
    speed: f32,
    kind: u32,
    uv_scale: [f32; 2],
    uv_offset: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    Image = 0,
    Particle = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRef {
    Placeholder,
    Item(usize),
    Backdrop,
}

/// One plane to draw this frame, in paint order.
#[derive(Debug, Clone, Copy)]
pub struct PlaneDraw {
    pub transform: Transform,
    pub opacity: f64,
    pub time: f64,
    pub speed: f64,
    pub kind: PlaneKind,
    pub texture: TextureRef,
}

/// Backdrop planes first, then items back to front.
pub fn plane_draws(carousel: &Carousel, clock: f64) -> Vec<PlaneDraw> {
    let speed = carousel.scroll().speed();
    let mut draws = Vec::new();
    match carousel.background() {
        Background::None => {}
        Background::Particles(field) => {
            draws.extend(field.particles().iter().enumerate().map(|(i, p)| PlaneDraw {
                transform: p.transform,
                opacity: 1.0,
                time: clock + i as f64 * 1.7,
                speed,
                kind: PlaneKind::Particle,
                texture: TextureRef::Placeholder,
            }));
        }
        Background::Tiles(backdrop) => {
            draws.extend(backdrop.tiles().iter().map(|t| PlaneDraw {
                transform: t.transform,
                opacity: 1.0,
                time: clock,
                speed: 0.0,
                kind: PlaneKind::Image,
                texture: TextureRef::Backdrop,
            }));
        }
    }
    let items = carousel.items();
    draws.extend(hit::paint_order(items).into_iter().map(|index| {
        let item = &items[index];
        PlaneDraw {
            transform: item.transform,
            opacity: item.opacity,
            time: item.time,
            speed: item.speed,
            kind: PlaneKind::Image,
            texture: TextureRef::Item(index),
        }
    }));
    draws
}

/// UV scale and offset that crop an image to fill a plane without stretching.
pub fn cover_uv(plane_aspect: f64, image_aspect: f64) -> ([f32; 2], [f32; 2]) {
    if !(plane_aspect > 0.0 && image_aspect > 0.0) {
        return ([1.0, 1.0], [0.0, 0.0]);
    }
    if image_aspect > plane_aspect {
        let scale = plane_aspect / image_aspect;
        ([scale as f32, 1.0], [((1.0 - scale) / 2.0) as f32, 0.0])
    } else {
        let scale = image_aspect / plane_aspect;
        ([1.0, scale as f32], [0.0, ((1.0 - scale) / 2.0) as f32])
    }
}

type Mat4 = [[f64; 4]; 4];

fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// Column-major `T * Rx * Ry * Rz * S`.
pub fn model_matrix(transform: &Transform) -> [[f32; 4]; 4] {
    let Transform {
        position: p,
        rotation: r,
        scale: s,
    } = *transform;
    let (sx, cx) = r.x.sin_cos();
    let (sy, cy) = r.y.sin_cos();
    let (sz, cz) = r.z.sin_cos();
    let rx = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, cx, sx, 0.0],
        [0.0, -sx, cx, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let ry = [
        [cy, 0.0, -sy, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sy, 0.0, cy, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let rz = [
        [cz, sz, 0.0, 0.0],
        [-sz, cz, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let mut m = mul(&mul(&rx, &ry), &rz);
    for (col, factor) in [s.x, s.y, s.z].into_iter().enumerate() {
        for cell in &mut m[col][..3] {
            *cell *= factor;
        }
    }
    m[3] = [p.x, p.y, p.z, 1.0];
    m.map(|column| column.map(|v| v as f32))
}

struct PlaneTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    aspect: f64,
}

struct PlaneBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct GalleryRenderer {
    pipeline: wgpu::RenderPipeline,
    globals: wgpu::Buffer,
    globals_bind: wgpu::BindGroup,
    plane_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholder: PlaneTexture,
    items: Vec<Option<PlaneTexture>>,
    backdrop: Option<PlaneTexture>,
    planes: Vec<PlaneBinding>,
    clock: f64,
}

fn uniform_layout_entry(visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GalleryRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gallery-globals-layout"),
            entries: &[uniform_layout_entry(wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let plane_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gallery-plane-layout"),
            entries: &[uniform_layout_entry(wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gallery-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gallery-shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "../../shaders/gallery.wgsl"
            ))),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gallery-pipeline-layout"),
            bind_group_layouts: &[&globals_layout, &plane_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gallery-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gallery-globals"),
            size: size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gallery-globals-bind"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("gallery-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = create_texture(
            device,
            queue,
            &texture_layout,
            &sampler,
            "gallery-placeholder",
            1,
            1,
            &PLACEHOLDER_RGBA,
        );

        Self {
            pipeline,
            globals,
            globals_bind,
            plane_layout,
            texture_layout,
            sampler,
            placeholder,
            items: Vec::new(),
            backdrop: None,
            planes: Vec::new(),
            clock: 0.0,
        }
    }

    /// Forget every item texture; used when the media set is replaced.
    pub fn reset_items(&mut self, count: usize) {
        self.items = (0..count).map(|_| None).collect();
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, image: &DecodedImage) {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            warn!(path = %image.path.display(), "ignoring malformed decoded image");
            return;
        }
        let label = match image.slot {
            TextureSlot::Item(_) => "gallery-item-texture",
            TextureSlot::Backdrop => "gallery-backdrop-texture",
        };
        let texture = create_texture(
            device,
            queue,
            &self.texture_layout,
            &self.sampler,
            label,
            image.width,
            image.height,
            &image.pixels,
        );
        match image.slot {
            TextureSlot::Item(index) => match self.items.get_mut(index) {
                Some(slot) => *slot = Some(texture),
                None => warn!(index, "texture for unknown item dropped"),
            },
            TextureSlot::Backdrop => self.backdrop = Some(texture),
        }
        debug!(
            path = %image.path.display(),
            width = image.width,
            height = image.height,
            "texture uploaded"
        );
    }

    fn texture(&self, texture: TextureRef) -> &PlaneTexture {
        let found = match texture {
            TextureRef::Placeholder => None,
            TextureRef::Item(index) => self.items.get(index).and_then(Option::as_ref),
            TextureRef::Backdrop => self.backdrop.as_ref(),
        };
        found.unwrap_or(&self.placeholder)
    }

    fn ensure_planes(&mut self, device: &wgpu::Device, count: usize) {
        while self.planes.len() < count {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("gallery-plane-uniform"),
                size: size_of::<PlaneUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("gallery-plane-bind"),
                layout: &self.plane_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.planes.push(PlaneBinding { buffer, bind_group });
        }
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        carousel: &Carousel,
    ) {
        self.clock += TIME_STEP;
        let globals = GlobalsUniform {
            view_proj: carousel
                .camera()
                .view_projection(carousel.screen().aspect()),
            fade: carousel.fade() as f32,
            _pad: [0.0; 3],
        };
        queue.write_buffer(&self.globals, 0, bytemuck::bytes_of(&globals));

        let draws = plane_draws(carousel, self.clock);
        self.ensure_planes(device, draws.len());
        for (draw, plane) in draws.iter().zip(&self.planes) {
            let texture = self.texture(draw.texture);
            let scale = draw.transform.scale;
            let plane_aspect = if scale.y > 0.0 { scale.x / scale.y } else { 0.0 };
            let (uv_scale, uv_offset) = cover_uv(plane_aspect, texture.aspect);
            let uniform = PlaneUniform {
                model: model_matrix(&draw.transform),
                opacity: draw.opacity as f32,
                time: draw.time as f32,
                speed: draw.speed as f32,
                kind: draw.kind as u32,
                uv_scale,
                uv_offset,
            };
            queue.write_buffer(&plane.buffer, 0, bytemuck::bytes_of(&uniform));
        }

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gallery-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.globals_bind, &[]);
        for (draw, plane) in draws.iter().zip(&self.planes) {
            rpass.set_bind_group(1, &plane.bind_group, &[]);
            rpass.set_bind_group(2, &self.texture(draw.texture).bind_group, &[]);
            rpass.draw(0..4, 0..1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> PlaneTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    PlaneTexture {
        _texture: texture,
        bind_group,
        aspect: f64::from(width) / f64::from(height.max(1)),
    }
}
