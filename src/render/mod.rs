mod bloom;
pub mod common;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use glam::UVec2;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;

use self::bloom::{BloomChain, ColorTarget};
use self::common::GlobalUniform;
use crate::geometry::{Geometry, Vertex};
use crate::render_loop::FrameRenderer;
use crate::resize::RenderSurface;
use crate::scene::SceneState;
use crate::shader::{ShaderSource, ShaderStage};

/// GPU renderer: draws the patched material into an HDR target, then runs
/// the bloom chain and tone-maps into the surface.
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    hdr_format: wgpu::TextureFormat,
    hdr: ColorTarget,
    depth: DepthBuffer,
    pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    mesh: MeshBuffers,
    bloom: BloomChain,
}

impl Renderer {
    /// Creates the GPU state for `target` at `width` x `height` physical
    /// pixels. Compiles the scene material, which runs its compile hook.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        scene: &mut SceneState,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("surface has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: backends(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("sketch-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: required_limits(&adapter),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            // Frame pacing follows the display, like requestAnimationFrame.
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let hdr_format = hdr_format(&adapter);
        let size = UVec2::new(width, height);
        let hdr = ColorTarget::create(&device, "scene-hdr", size, hdr_format);
        let depth = DepthBuffer::create(&device, width, height);

        let compiled = scene
            .material
            .compile()
            .context("failed to compile scene material")?;
        let source = compiled.source.clone();

        let global_layout = uniform_layout(&device, "global-bind-layout");
        let material_layout = uniform_layout(&device, "material-bind-layout");
        let pipeline = scene_pipeline(
            &device,
            &source,
            &[&global_layout, &material_layout],
            hdr_format,
        )?;

        let global_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("global-uniform"),
            contents: bytes_of(&GlobalUniform::from_scene(scene)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let global_bind_group = bind_buffer(&device, "global-bind-group", &global_layout, &global_buffer);

        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("material-uniform"),
            contents: bytemuck::cast_slice(&source.uniforms.packed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let material_bind_group =
            bind_buffer(&device, "material-bind-group", &material_layout, &material_buffer);

        let mesh = MeshBuffers::from_geometry(&device, &scene.mesh.geometry, "icosahedron");
        let bloom = BloomChain::new(&device, &hdr.view, size, hdr_format, surface_format);
        debug!("bloom mips {:?}", bloom.mip_sizes());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            hdr_format,
            hdr,
            depth,
            pipeline,
            global_buffer,
            global_bind_group,
            material_buffer,
            material_bind_group,
            mesh,
            bloom,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn upload(&self, scene: &SceneState) {
        self.queue.write_buffer(
            &self.global_buffer,
            0,
            bytes_of(&GlobalUniform::from_scene(scene)),
        );
        if let Some(shader) = scene.material.shader() {
            self.queue.write_buffer(
                &self.material_buffer,
                0,
                bytemuck::cast_slice(&shader.uniforms().packed()),
            );
        }
        self.bloom.update(&self.queue, &scene.composer);
    }
}

impl FrameRenderer for Renderer {
    fn render_frame(&mut self, scene: &SceneState) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Surface timeout; retrying next frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
        };
        self.upload(scene);

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        {
            let clear = scene.clear_color.as_dvec3();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.hdr.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.x,
                            g: clear.y,
                            b: clear.z,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.global_bind_group, &[]);
            pass.set_bind_group(1, &self.material_bind_group, &[]);
            pass.set_vertex_buffer(0, self.mesh.vertex.slice(..));
            pass.set_index_buffer(self.mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.mesh.index_count, 0, 0..1);
        }

        self.bloom.encode(&mut encoder, &view);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl RenderSurface for Renderer {
    fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
        let size = UVec2::new(width, height);
        self.hdr = ColorTarget::create(&self.device, "scene-hdr", size, self.hdr_format);
        self.depth = DepthBuffer::create(&self.device, width, height);
        self.bloom.resize(&self.device, &self.hdr.view, size);
    }
}

fn backends() -> wgpu::Backends {
    if cfg!(target_arch = "wasm32") {
        wgpu::Backends::GL
    } else {
        wgpu::Backends::PRIMARY
    }
}

fn required_limits(adapter: &wgpu::Adapter) -> wgpu::Limits {
    if cfg!(target_arch = "wasm32") {
        wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
    } else {
        wgpu::Limits::default()
    }
}

/// Half-float when the adapter can render to and filter it, otherwise
/// 8-bit with bloom clipped at 1.0.
fn hdr_format(adapter: &wgpu::Adapter) -> wgpu::TextureFormat {
    let features = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba16Float);
    let renderable = features
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING);
    let filterable = features
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE);
    if renderable && filterable {
        wgpu::TextureFormat::Rgba16Float
    } else {
        warn!("Rgba16Float is not renderable here; falling back to Rgba8Unorm");
        wgpu::TextureFormat::Rgba8Unorm
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn bind_buffer(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

fn scene_pipeline(
    device: &wgpu::Device,
    source: &ShaderSource,
    layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline> {
    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("material-vertex"),
        source: wgpu::ShaderSource::Wgsl(source.module(ShaderStage::Vertex)?.into()),
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("material-fragment"),
        source: wgpu::ShaderSource::Wgsl(source.module(ShaderStage::Fragment)?.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("material-pipeline-layout"),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("material-pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    }))
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_geometry(device: &wgpu::Device, geometry: &Geometry, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: geometry.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
