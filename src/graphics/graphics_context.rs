//! GPU presentation of the spark canvas.
//!
//! The sparks are rasterized on the CPU into a premultiplied RGBA pixmap. Every
//! redraw uploads that pixmap into a texture and composites it over the host
//! backdrop with premultiplied alpha blending, so the backdrop stays visible
//! wherever no spark was drawn.
//!
//! Blending happens on the encoded sRGB values, like a browser 2D canvas. The
//! overlay texture is plain `Rgba8Unorm` and sRGB surfaces are drawn through a
//! non-sRGB view, so nothing is decoded or re-encoded on the way.

use std::sync::Arc;

use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::SparkColor;
use crate::graphics::canvas::{PixmapCanvas, SparkCanvas};
use crate::utils::geometry::BufferSize;

/// Errors that can occur while setting up the overlay graphics.
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Failed to create window")]
    WindowCreationError,

    #[error("Failed to create graphics surface for rendering")]
    SurfaceCreationError,

    #[error("Failed to request graphics adapter")]
    AdapterRequestError,

    #[error("Failed to request graphics device")]
    DeviceRequestError,
}

pub type OverlayResult<T = ()> = std::result::Result<T, OverlayError>;

/// Vertex of the quad covering the whole surface.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    /// Clip space, -1.0 to 1.0
    position: [f32; 2],
    texture_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

const FULLSCREEN_QUAD: [Vertex; 6] = [
    Vertex {
        position: [-1.0, 1.0],
        texture_coords: [0.0, 0.0],
    },
    Vertex {
        position: [-1.0, -1.0],
        texture_coords: [0.0, 1.0],
    },
    Vertex {
        position: [1.0, -1.0],
        texture_coords: [1.0, 1.0],
    },
    Vertex {
        position: [-1.0, 1.0],
        texture_coords: [0.0, 0.0],
    },
    Vertex {
        position: [1.0, -1.0],
        texture_coords: [1.0, 1.0],
    },
    Vertex {
        position: [1.0, 1.0],
        texture_coords: [1.0, 0.0],
    },
];

/// Texture mirroring the canvas pixmap. Recreated when the canvas is resized.
#[derive(Debug)]
struct OverlayTexture {
    size: BufferSize,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// The pixmap bytes are uploaded as they are.
const OVERLAY_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Picks the surface format and the format the frame is rendered through.
///
/// A non-sRGB surface format wins. When the surface only offers sRGB formats,
/// the frame is rendered through the same format without the sRGB suffix.
fn presentation_formats(
    formats: &[wgpu::TextureFormat],
) -> Option<(wgpu::TextureFormat, wgpu::TextureFormat)> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .map(|format| (format, format))
        .or_else(|| {
            formats
                .first()
                .map(|format| (*format, format.remove_srgb_suffix()))
        })
}

fn clear_color(color: SparkColor) -> wgpu::Color {
    let [r, g, b, a] = color.to_f64_array();
    wgpu::Color { r, g, b, a }
}

#[derive(Debug)]
pub struct GraphicsContext<'a> {
    surface: wgpu::Surface<'a>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    window: Arc<Window>,
    render_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
    view_format: wgpu::TextureFormat,
    overlay_texture: Option<OverlayTexture>,
    background: wgpu::Color,
}

impl<'a> GraphicsContext<'a> {
    /// Creates the surface, device and compositing pipeline for `window`.
    ///
    /// # Errors
    ///
    /// - `OverlayError::SurfaceCreationError` - no surface or no supported format
    /// - `OverlayError::AdapterRequestError` - no suitable GPU adapter found
    /// - `OverlayError::DeviceRequestError` - failed to create the logical device
    pub fn new(window: Arc<Window>, background: SparkColor) -> OverlayResult<Self> {
        let size = window.inner_size();
        log::info!("GraphicsContext::new: window size: {size:?}");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).map_err(|e| {
            log::error!("GraphicsContext::new: {e:?}");
            OverlayError::SurfaceCreationError
        })?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            log::error!("GraphicsContext::new request_adapter: {e:?}");
            OverlayError::AdapterRequestError
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            label: None,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
        }))
        .map_err(|e| {
            log::error!("GraphicsContext::new request_device: {e:?}");
            OverlayError::DeviceRequestError
        })?;

        let capabilities = surface.get_capabilities(&adapter);
        let (surface_format, view_format) = presentation_formats(&capabilities.formats)
            .ok_or(OverlayError::SurfaceCreationError)?;
        log::info!("GraphicsContext::new: surface {surface_format:?}, view {view_format:?}");

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: if view_format == surface_format {
                vec![]
            } else {
                vec![view_format]
            },
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "../shaders/overlay.wgsl"
            ))),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay bind group layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay render pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: view_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        // Texture and surface share the same size, nearest keeps lines crisp.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Overlay sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay vertex buffer"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            window,
            render_pipeline,
            bind_group_layout,
            sampler,
            vertex_buffer,
            view_format,
            overlay_texture: None,
            background: clear_color(background),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Reconfigures the surface. Zero sized windows (minimized) are skipped.
    pub fn resize(&mut self, size: BufferSize) {
        if size.is_empty() {
            log::debug!("GraphicsContext::resize: ignoring empty size");
            return;
        }
        log::info!("GraphicsContext::resize: {size:?}");
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn create_overlay_texture(&self, size: BufferSize) -> OverlayTexture {
        log::debug!("GraphicsContext::create_overlay_texture: {size:?}");
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Overlay texture"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OVERLAY_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        OverlayTexture {
            size,
            texture,
            bind_group,
        }
    }

    fn upload(&mut self, canvas: &PixmapCanvas) {
        let Some(pixmap) = canvas.pixmap() else {
            self.overlay_texture = None;
            return;
        };
        let size = canvas.buffer_size();
        if self.overlay_texture.as_ref().map(|overlay| overlay.size) != Some(size) {
            self.overlay_texture = Some(self.create_overlay_texture(size));
        }
        let Some(overlay) = &self.overlay_texture else {
            return;
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &overlay.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixmap.data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Draws the backdrop and the canvas content to the window.
    ///
    /// `canvas` is uploaded first when given. With `None` the texture from the
    /// last upload is drawn again, which is enough for redraws the window
    /// system asks for while the canvas is unchanged.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped, the
    /// next redraw picks it up again.
    pub fn present(&mut self, canvas: Option<&PixmapCanvas>) {
        if let Some(canvas) = canvas {
            self.upload(canvas);
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("GraphicsContext::present: surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(e) => {
                log::error!("GraphicsContext::present: failed to get current texture: {e:?}");
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.view_format),
            ..Default::default()
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay encoder"),
            });
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.background),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        if let Some(overlay) = &self.overlay_texture {
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &overlay.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..FULLSCREEN_QUAD.len() as u32, 0..1);
        }
        drop(render_pass);

        self.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        output.present();
    }
}
