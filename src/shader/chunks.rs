//! WGSL source of the standard material and the displacement snippets that
//! the sketch splices into it.

use super::Insertion;

pub const VERTEX_PARS_ANCHOR: &str = "#include <displacementmap_pars_vertex>";
pub const VERTEX_MAIN_ANCHOR: &str = "#include <displacementmap_vertex>";
pub const FRAGMENT_MAIN_ANCHOR: &str = "#include <normal_fragment_maps>";
pub const FRAGMENT_PARS_ANCHOR: &str = "#include <bumpmap_pars_fragment>";

/// Vertex-stage insertions, applied in order.
pub const VERTEX_INSERTIONS: [Insertion<'static>; 2] = [
    Insertion::new(VERTEX_PARS_ANCHOR, VERTEX_PARS),
    Insertion::new(VERTEX_MAIN_ANCHOR, VERTEX_MAIN),
];

/// Fragment-stage insertions, applied in order.
pub const FRAGMENT_INSERTIONS: [Insertion<'static>; 2] = [
    Insertion::new(FRAGMENT_MAIN_ANCHOR, FRAGMENT_MAIN),
    Insertion::new(FRAGMENT_PARS_ANCHOR, FRAGMENT_PARS),
];

pub(crate) const GLOBALS_PRELUDE: &str = r#"struct Globals {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    camera_position: vec4<f32>,
    base_color: vec4<f32>,
    ambient_color: vec4<f32>,
    light_color: vec4<f32>,
    light_direction: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

pub const STANDARD_VERTEX: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) object_normal: vec3<f32>,
    @location(3) user: vec4<f32>,
}

// #include <displacementmap_pars_vertex>

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.user = vec4<f32>(0.0);
    let object_normal = normalize(input.normal);
    var transformed = input.position;
    // #include <displacementmap_vertex>
    let world_position = globals.model * vec4<f32>(transformed, 1.0);
    out.world_position = world_position.xyz;
    out.world_normal = normalize((globals.model * vec4<f32>(object_normal, 0.0)).xyz);
    out.object_normal = object_normal;
    out.clip_position = globals.view_proj * world_position;
    return out;
}
"#;

pub const STANDARD_FRAGMENT: &str = r#"
struct FragmentInput {
    @builtin(position) frag_coord: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) object_normal: vec3<f32>,
    @location(3) user: vec4<f32>,
}

// #include <bumpmap_pars_fragment>

@fragment
fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {
    var diffuse_color = globals.base_color.rgb;
    var emissive = vec3<f32>(0.0);
    var normal = normalize(input.world_normal);
    // #include <normal_fragment_maps>
    let ambient = globals.ambient_color.rgb * globals.ambient_color.a;
    let light_direction = normalize(globals.light_direction.xyz);
    let irradiance = max(dot(normal, light_direction), 0.0);
    let direct = globals.light_color.rgb * globals.light_color.a * irradiance;
    let outgoing = diffuse_color * (ambient + direct) + emissive;
    return vec4<f32>(outgoing, globals.base_color.a);
}
"#;

pub const VERTEX_PARS: &str = r#"
fn displacement_hash(p: vec3<f32>) -> vec3<f32> {
    let q = vec3<f32>(
        dot(p, vec3<f32>(127.1, 311.7, 74.7)),
        dot(p, vec3<f32>(269.5, 183.3, 246.1)),
        dot(p, vec3<f32>(113.5, 271.9, 124.6))
    );
    return fract(sin(q) * 43758.5453123) * 2.0 - 1.0;
}

fn displacement_corner(cell: vec3<f32>, local: vec3<f32>, corner: vec3<f32>) -> f32 {
    return dot(displacement_hash(cell + corner), local - corner);
}

fn displacement_noise(p: vec3<f32>) -> f32 {
    let cell = floor(p);
    let local = fract(p);
    let u = local * local * (3.0 - 2.0 * local);
    let x00 = mix(
        displacement_corner(cell, local, vec3<f32>(0.0, 0.0, 0.0)),
        displacement_corner(cell, local, vec3<f32>(1.0, 0.0, 0.0)),
        u.x
    );
    let x10 = mix(
        displacement_corner(cell, local, vec3<f32>(0.0, 1.0, 0.0)),
        displacement_corner(cell, local, vec3<f32>(1.0, 1.0, 0.0)),
        u.x
    );
    let x01 = mix(
        displacement_corner(cell, local, vec3<f32>(0.0, 0.0, 1.0)),
        displacement_corner(cell, local, vec3<f32>(1.0, 0.0, 1.0)),
        u.x
    );
    let x11 = mix(
        displacement_corner(cell, local, vec3<f32>(0.0, 1.0, 1.0)),
        displacement_corner(cell, local, vec3<f32>(1.0, 1.0, 1.0)),
        u.x
    );
    return mix(mix(x00, x10, u.y), mix(x01, x11, u.y), u.z);
}

fn displacement_smooth_mod(axis: f32, amplitude: f32, radius: f32) -> f32 {
    let phase = 3.14159265 * (axis / amplitude);
    let s = sin(phase);
    let top = cos(phase) * s;
    let bottom = s * s + radius * radius;
    return amplitude * 0.5 - (1.0 / 3.14159265) * atan(top / bottom);
}

fn displacement_fit(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let mapped = out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min);
    return clamp(mapped, out_min, out_max);
}

fn displacement_wave(position: vec3<f32>) -> f32 {
    return displacement_fit(displacement_smooth_mod(position.y * 6.0, 1.0, 1.5), 0.35, 0.6, 0.0, 1.0);
}
"#;

pub const VERTEX_MAIN: &str = r#"    let noise_coords = object_normal * 2.0 + vec3<f32>(0.0, material.time * 0.2, 0.0);
    let noise_pattern = vec3<f32>(displacement_noise(noise_coords));
    let pattern = displacement_wave(noise_pattern);
    out.user.x = pattern;
    transformed = transformed + object_normal * (pattern / 3.0);"#;

pub const FRAGMENT_PARS: &str = r#"
fn displacement_tint(displacement: f32) -> vec3<f32> {
    let low = vec3<f32>(0.05, 0.08, 0.35);
    let high = vec3<f32>(1.0, 1.0, 1.0);
    return mix(low, high, smoothstep(0.2, 1.0, displacement));
}
"#;

pub const FRAGMENT_MAIN: &str = r#"    let displacement = input.user.x;
    var facet_normal = normalize(cross(dpdx(input.world_position), dpdy(input.world_position)));
    if (dot(facet_normal, globals.camera_position.xyz - input.world_position) < 0.0) {
        facet_normal = -facet_normal;
    }
    normal = normalize(mix(normal, facet_normal, 0.85));
    diffuse_color = diffuse_color * displacement_tint(displacement);
    emissive = emissive + vec3<f32>(0.02, 0.04, 0.2) * (displacement * displacement * displacement);"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_carry_every_anchor() {
        assert!(STANDARD_VERTEX.contains(VERTEX_PARS_ANCHOR));
        assert!(STANDARD_VERTEX.contains(VERTEX_MAIN_ANCHOR));
        assert!(STANDARD_FRAGMENT.contains(FRAGMENT_MAIN_ANCHOR));
        assert!(STANDARD_FRAGMENT.contains(FRAGMENT_PARS_ANCHOR));
    }

    #[test]
    fn snippets_do_not_reintroduce_anchors() {
        for snippet in [VERTEX_PARS, VERTEX_MAIN, FRAGMENT_PARS, FRAGMENT_MAIN] {
            assert!(!snippet.contains("#include"));
        }
    }
}
