use bytemuck::{Pod, Zeroable};
use glam::UVec2;

use crate::postprocess::{BloomPass, ToneMapping, ToneMappingMode, BLOOM_MIPS};
use crate::scene::SceneState;

/// Camera, model and lighting state shared by both material stages.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub base_color: [f32; 4],
    /// Linear colour in `xyz`, intensity in `w`.
    pub ambient_color: [f32; 4],
    /// Linear colour in `xyz`, intensity in `w`.
    pub light_color: [f32; 4],
    pub light_direction: [f32; 4],
}

impl GlobalUniform {
    pub fn from_scene(scene: &SceneState) -> Self {
        let ambient = &scene.lights.ambient;
        let directional = &scene.lights.directional;
        Self {
            view_proj: scene.camera.view_projection().to_cols_array_2d(),
            model: scene.mesh.model.to_cols_array_2d(),
            camera_position: scene.camera.position.extend(1.0).to_array(),
            base_color: scene.material.color.extend(1.0).to_array(),
            ambient_color: ambient.color.extend(ambient.intensity).to_array(),
            light_color: directional.color.extend(directional.intensity).to_array(),
            light_direction: directional.direction().extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct HighPassParams {
    pub threshold: f32,
    pub smooth_width: f32,
    pub _pad: [f32; 2],
}

impl HighPassParams {
    pub fn new(bloom: &BloomPass) -> Self {
        Self {
            threshold: bloom.threshold,
            smooth_width: bloom.smooth_width,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurParams {
    pub direction: [f32; 2],
    pub texel_size: [f32; 2],
    pub sigma: f32,
    pub radius: u32,
    pub _pad: [f32; 2],
}

impl BlurParams {
    /// Blur of `radius` taps along `direction` into a target of `size`.
    pub fn new(direction: [f32; 2], size: UVec2, radius: u32) -> Self {
        Self {
            direction,
            texel_size: [1.0 / size.x.max(1) as f32, 1.0 / size.y.max(1) as f32],
            sigma: radius as f32,
            radius,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CompositeParams {
    /// Weights of the first four mips.
    pub weights: [f32; 4],
    pub last_weight: f32,
    pub strength: f32,
    pub _pad: [f32; 2],
}

impl CompositeParams {
    pub fn new(bloom: &BloomPass) -> Self {
        let mut weights = [0.0; BLOOM_MIPS];
        for (level, weight) in weights.iter_mut().enumerate() {
            *weight = bloom.mip_weight(level);
        }
        Self {
            weights: [weights[0], weights[1], weights[2], weights[3]],
            last_weight: weights[4],
            strength: bloom.strength,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct OutputParams {
    pub exposure: f32,
    pub tone_mapping: u32,
    pub _pad: [f32; 2],
}

impl OutputParams {
    pub fn new(tone_mapping: &ToneMapping) -> Self {
        Self {
            exposure: tone_mapping.exposure,
            tone_mapping: match tone_mapping.mode {
                ToneMappingMode::None => 0,
                ToneMappingMode::Reinhard => 1,
            },
            _pad: [0.0; 2],
        }
    }
}

/// Full-screen triangle shared by every post-processing pass.
pub const FULLSCREEN_VERTEX: &str = r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let x = f32((index << 1u) & 2u);
    let y = f32(index & 2u);
    var out: FullscreenOutput;
    out.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    out.uv = vec2<f32>(x, y);
    return out;
}
"#;

pub const HIGH_PASS_FRAGMENT: &str = r#"
struct HighPassParams {
    threshold: f32,
    smooth_width: f32,
    _pad: vec2<f32>,
}

@group(0) @binding(0)
var source_texture: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;
@group(0) @binding(2)
var<uniform> params: HighPassParams;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let texel = textureSampleLevel(source_texture, source_sampler, input.uv, 0.0);
    let luma = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let alpha = smoothstep(params.threshold, params.threshold + params.smooth_width, luma);
    return mix(vec4<f32>(0.0), texel, alpha);
}
"#;

pub const BLUR_FRAGMENT: &str = r#"
struct BlurParams {
    direction: vec2<f32>,
    texel_size: vec2<f32>,
    sigma: f32,
    radius: u32,
    _pad: vec2<f32>,
}

@group(0) @binding(0)
var source_texture: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;
@group(0) @binding(2)
var<uniform> params: BlurParams;

fn gaussian(x: f32, sigma: f32) -> f32 {
    return 0.39894 * exp(-0.5 * x * x / (sigma * sigma)) / sigma;
}

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    var weight_sum = gaussian(0.0, params.sigma);
    var color = textureSampleLevel(source_texture, source_sampler, input.uv, 0.0).rgb * weight_sum;
    for (var i = 1u; i < params.radius; i = i + 1u) {
        let x = f32(i);
        let weight = gaussian(x, params.sigma);
        let offset = params.direction * params.texel_size * x;
        let ahead = textureSampleLevel(source_texture, source_sampler, input.uv + offset, 0.0).rgb;
        let behind = textureSampleLevel(source_texture, source_sampler, input.uv - offset, 0.0).rgb;
        color = color + (ahead + behind) * weight;
        weight_sum = weight_sum + 2.0 * weight;
    }
    return vec4<f32>(color / weight_sum, 1.0);
}
"#;

pub const COMPOSITE_FRAGMENT: &str = r#"
struct CompositeParams {
    weights: vec4<f32>,
    last_weight: f32,
    strength: f32,
    _pad: vec2<f32>,
}

@group(0) @binding(0)
var blur_0: texture_2d<f32>;
@group(0) @binding(1)
var blur_1: texture_2d<f32>;
@group(0) @binding(2)
var blur_2: texture_2d<f32>;
@group(0) @binding(3)
var blur_3: texture_2d<f32>;
@group(0) @binding(4)
var blur_4: texture_2d<f32>;
@group(0) @binding(5)
var blur_sampler: sampler;
@group(0) @binding(6)
var<uniform> params: CompositeParams;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    var sum = textureSampleLevel(blur_0, blur_sampler, input.uv, 0.0).rgb * params.weights.x;
    sum = sum + textureSampleLevel(blur_1, blur_sampler, input.uv, 0.0).rgb * params.weights.y;
    sum = sum + textureSampleLevel(blur_2, blur_sampler, input.uv, 0.0).rgb * params.weights.z;
    sum = sum + textureSampleLevel(blur_3, blur_sampler, input.uv, 0.0).rgb * params.weights.w;
    sum = sum + textureSampleLevel(blur_4, blur_sampler, input.uv, 0.0).rgb * params.last_weight;
    return vec4<f32>(sum * params.strength, 1.0);
}
"#;

pub const OUTPUT_FRAGMENT: &str = r#"
struct OutputParams {
    exposure: f32,
    tone_mapping: u32,
    _pad: vec2<f32>,
}

@group(0) @binding(0)
var scene_texture: texture_2d<f32>;
@group(0) @binding(1)
var bloom_texture: texture_2d<f32>;
@group(0) @binding(2)
var output_sampler: sampler;
@group(0) @binding(3)
var<uniform> params: OutputParams;

@fragment
fn fs_main(input: FullscreenOutput) -> @location(0) vec4<f32> {
    let scene = textureSampleLevel(scene_texture, output_sampler, input.uv, 0.0).rgb;
    let bloom = textureSampleLevel(bloom_texture, output_sampler, input.uv, 0.0).rgb;
    var color = (scene + bloom) * params.exposure;
    if (params.tone_mapping == 1u) {
        color = color / (vec3<f32>(1.0) + color);
    }
    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// Full-screen vertex stage followed by a pass fragment stage.
pub fn post_module(fragment: &str) -> String {
    let mut module = String::with_capacity(FULLSCREEN_VERTEX.len() + fragment.len());
    module.push_str(FULLSCREEN_VERTEX);
    module.push_str(fragment);
    module
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;
    use crate::config::SketchConfig;

    fn validate(source: &str) {
        let module = naga::front::wgsl::parse_str(source).expect("wgsl parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("wgsl validate");
    }

    #[test]
    fn uniform_layouts_match_wgsl() {
        assert_eq!(size_of::<GlobalUniform>(), 208);
        assert_eq!(size_of::<HighPassParams>(), 16);
        assert_eq!(size_of::<BlurParams>(), 32);
        assert_eq!(size_of::<CompositeParams>(), 32);
        assert_eq!(size_of::<OutputParams>(), 16);
    }

    #[test]
    fn post_shaders_validate() {
        for fragment in [
            HIGH_PASS_FRAGMENT,
            BLUR_FRAGMENT,
            COMPOSITE_FRAGMENT,
            OUTPUT_FRAGMENT,
        ] {
            validate(&post_module(fragment));
        }
    }

    #[test]
    fn globals_carry_scene_state() {
        let config = SketchConfig {
            detail: 0,
            ..SketchConfig::default()
        };
        let scene = SceneState::bootstrap(&config, 640, 480, 1.0).unwrap();
        let globals = GlobalUniform::from_scene(&scene);
        assert_eq!(globals.ambient_color[3], 0.5);
        assert_eq!(globals.light_color[3], 0.6);
        assert_eq!(globals.base_color, [1.0, 1.0, 1.0, 1.0]);
        assert!((globals.camera_position[2] - 2.0).abs() < 1e-5);
        assert_eq!(globals.light_direction[3], 0.0);
    }

    #[test]
    fn composite_weights_follow_radius() {
        let mut bloom = BloomPass::new(UVec2::new(64, 64), 3.0, 0.0, 0.0);
        let params = CompositeParams::new(&bloom);
        assert_eq!(params.weights, [1.0, 0.8, 0.6, 0.4]);
        assert!((params.last_weight - 0.2).abs() < 1e-6);
        bloom.radius = 1.0;
        let mirrored = CompositeParams::new(&bloom);
        assert!((mirrored.last_weight - 1.0).abs() < 1e-6);
        assert_eq!(mirrored.strength, 3.0);
    }

    #[test]
    fn output_params_encode_tone_mapping() {
        let params = OutputParams::new(&ToneMapping::default());
        assert_eq!(params.tone_mapping, 1);
        assert_eq!(params.exposure, 1.0);
        let blur = BlurParams::new([1.0, 0.0], UVec2::new(4, 2), 5);
        assert_eq!(blur.texel_size, [0.25, 0.5]);
    }
}
