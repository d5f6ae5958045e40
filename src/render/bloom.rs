//! GPU side of the bloom composer: high pass, separable blur over a mip
//! chain, mip composite and the tone-mapped output pass.

use bytemuck::bytes_of;
use glam::UVec2;

use super::common::{
    post_module, BlurParams, CompositeParams, HighPassParams, OutputParams, BLUR_FRAGMENT,
    COMPOSITE_FRAGMENT, HIGH_PASS_FRAGMENT, OUTPUT_FRAGMENT,
};
use crate::postprocess::{BloomPass, Composer, BLOOM_KERNEL_RADII, BLOOM_MIPS};

const BLUR_X: [f32; 2] = [1.0, 0.0];
const BLUR_Y: [f32; 2] = [0.0, 1.0];

pub(crate) struct ColorTarget {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: UVec2,
}

impl ColorTarget {
    pub fn create(device: &wgpu::Device, label: &str, size: UVec2, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.x.max(1),
                height: size.y.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            size,
        }
    }
}

struct BlurStep {
    horizontal: ColorTarget,
    vertical: ColorTarget,
    horizontal_bind_group: wgpu::BindGroup,
    vertical_bind_group: wgpu::BindGroup,
}

/// Size-dependent textures and bind groups, rebuilt on resize.
struct ChainTargets {
    bright: ColorTarget,
    bright_bind_group: wgpu::BindGroup,
    steps: Vec<BlurStep>,
    bloom: ColorTarget,
    composite_bind_group: wgpu::BindGroup,
    output_bind_group: wgpu::BindGroup,
    _blur_buffers: Vec<wgpu::Buffer>,
}

/// Pipelines, layouts and parameter buffers; independent of the size.
struct BloomShared {
    format: wgpu::TextureFormat,
    sampler: wgpu::Sampler,
    source_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    output_layout: wgpu::BindGroupLayout,
    high_pass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    output_pipeline: wgpu::RenderPipeline,
    high_pass_buffer: wgpu::Buffer,
    composite_buffer: wgpu::Buffer,
    output_buffer: wgpu::Buffer,
}

pub(crate) struct BloomChain {
    shared: BloomShared,
    targets: ChainTargets,
}

impl BloomChain {
    /// `format` is the HDR format of the scene target, `output_format` the
    /// surface format the output pass writes to.
    pub fn new(
        device: &wgpu::Device,
        scene_view: &wgpu::TextureView,
        size: UVec2,
        format: wgpu::TextureFormat,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-source-layout"),
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-composite-layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                sampler_entry(5),
                uniform_entry(6),
            ],
        });
        let output_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("output-layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3),
            ],
        });

        let high_pass_pipeline =
            post_pipeline(device, "bloom-high-pass", HIGH_PASS_FRAGMENT, &source_layout, format);
        let blur_pipeline =
            post_pipeline(device, "bloom-blur", BLUR_FRAGMENT, &source_layout, format);
        let composite_pipeline = post_pipeline(
            device,
            "bloom-composite",
            COMPOSITE_FRAGMENT,
            &composite_layout,
            format,
        );
        let output_pipeline =
            post_pipeline(device, "output", OUTPUT_FRAGMENT, &output_layout, output_format);

        let high_pass_buffer = uniform_buffer::<HighPassParams>(device, "bloom-high-pass-params");
        let composite_buffer = uniform_buffer::<CompositeParams>(device, "bloom-composite-params");
        let output_buffer = uniform_buffer::<OutputParams>(device, "output-params");

        let shared = BloomShared {
            format,
            sampler,
            source_layout,
            composite_layout,
            output_layout,
            high_pass_pipeline,
            blur_pipeline,
            composite_pipeline,
            output_pipeline,
            high_pass_buffer,
            composite_buffer,
            output_buffer,
        };
        let targets = shared.build_targets(device, scene_view, size);
        Self { shared, targets }
    }

    /// Rebuilds the mip chain for a new scene target.
    pub fn resize(&mut self, device: &wgpu::Device, scene_view: &wgpu::TextureView, size: UVec2) {
        self.targets = self.shared.build_targets(device, scene_view, size);
    }

    pub fn mip_sizes(&self) -> Vec<UVec2> {
        self.targets.steps.iter().map(|step| step.vertical.size).collect()
    }

    /// Uploads the per-frame bloom and tone-mapping parameters.
    pub fn update(&self, queue: &wgpu::Queue, composer: &Composer) {
        let shared = &self.shared;
        queue.write_buffer(
            &shared.high_pass_buffer,
            0,
            bytes_of(&HighPassParams::new(&composer.bloom)),
        );
        queue.write_buffer(
            &shared.composite_buffer,
            0,
            bytes_of(&CompositeParams::new(&composer.bloom)),
        );
        queue.write_buffer(
            &shared.output_buffer,
            0,
            bytes_of(&OutputParams::new(&composer.tone_mapping)),
        );
    }

    /// Records every post pass, ending with the output pass into `output`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let shared = &self.shared;
        let targets = &self.targets;
        draw_fullscreen(
            encoder,
            "bloom-high-pass",
            &targets.bright.view,
            &shared.high_pass_pipeline,
            &targets.bright_bind_group,
        );
        for step in &targets.steps {
            draw_fullscreen(
                encoder,
                "bloom-blur-h",
                &step.horizontal.view,
                &shared.blur_pipeline,
                &step.horizontal_bind_group,
            );
            draw_fullscreen(
                encoder,
                "bloom-blur-v",
                &step.vertical.view,
                &shared.blur_pipeline,
                &step.vertical_bind_group,
            );
        }
        draw_fullscreen(
            encoder,
            "bloom-composite",
            &targets.bloom.view,
            &shared.composite_pipeline,
            &targets.composite_bind_group,
        );
        draw_fullscreen(
            encoder,
            "output",
            output,
            &shared.output_pipeline,
            &targets.output_bind_group,
        );
    }
}

impl BloomShared {
    fn build_targets(
        &self,
        device: &wgpu::Device,
        scene_view: &wgpu::TextureView,
        size: UVec2,
    ) -> ChainTargets {
        let sizes = BloomPass::new(size, 0.0, 0.0, 0.0).mip_sizes();
        let bright = ColorTarget::create(device, "bloom-bright", sizes[0], self.format);
        let bright_bind_group =
            self.source_bind_group(device, "bloom-bright-bind-group", scene_view, &self.high_pass_buffer);

        let mut steps: Vec<BlurStep> = Vec::with_capacity(BLOOM_MIPS);
        let mut blur_buffers = Vec::with_capacity(BLOOM_MIPS * 2);
        for (level, mip_size) in sizes.iter().copied().enumerate() {
            let radius = BLOOM_KERNEL_RADII[level];
            let horizontal =
                ColorTarget::create(device, &format!("bloom-h{level}"), mip_size, self.format);
            let vertical =
                ColorTarget::create(device, &format!("bloom-v{level}"), mip_size, self.format);
            let horizontal_params = init_buffer(
                device,
                &format!("bloom-h{level}-params"),
                &BlurParams::new(BLUR_X, mip_size, radius),
            );
            let vertical_params = init_buffer(
                device,
                &format!("bloom-v{level}-params"),
                &BlurParams::new(BLUR_Y, mip_size, radius),
            );
            let input = match steps.last() {
                Some(previous) => &previous.vertical.view,
                None => &bright.view,
            };
            let horizontal_bind_group = self.source_bind_group(
                device,
                &format!("bloom-h{level}-bind-group"),
                input,
                &horizontal_params,
            );
            let vertical_bind_group = self.source_bind_group(
                device,
                &format!("bloom-v{level}-bind-group"),
                &horizontal.view,
                &vertical_params,
            );
            blur_buffers.push(horizontal_params);
            blur_buffers.push(vertical_params);
            steps.push(BlurStep {
                horizontal,
                vertical,
                horizontal_bind_group,
                vertical_bind_group,
            });
        }

        let bloom = ColorTarget::create(device, "bloom-composite", sizes[0], self.format);
        let mut composite_entries: Vec<wgpu::BindGroupEntry> = steps
            .iter()
            .enumerate()
            .map(|(binding, step)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(&step.vertical.view),
            })
            .collect();
        composite_entries.push(wgpu::BindGroupEntry {
            binding: BLOOM_MIPS as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        composite_entries.push(wgpu::BindGroupEntry {
            binding: BLOOM_MIPS as u32 + 1,
            resource: self.composite_buffer.as_entire_binding(),
        });
        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom-composite-bind-group"),
            layout: &self.composite_layout,
            entries: &composite_entries,
        });

        let output_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("output-bind-group"),
            layout: &self.output_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&bloom.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.output_buffer.as_entire_binding(),
                },
            ],
        });

        ChainTargets {
            bright,
            bright_bind_group,
            steps,
            bloom,
            composite_bind_group,
            output_bind_group,
            _blur_buffers: blur_buffers,
        }
    }

    fn source_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        source: &wgpu::TextureView,
        params: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.source_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}

fn draw_fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

fn post_pipeline(
    device: &wgpu::Device,
    label: &str,
    fragment: &str,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(post_module(fragment).into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_fullscreen",
            buffers: &[],
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_buffer<T>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn init_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    use wgpu::util::DeviceExt;
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}
