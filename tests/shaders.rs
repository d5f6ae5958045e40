use bloom_sketch::material::{displacement_hook, StandardMaterial};
use bloom_sketch::shader::{ShaderSource, ShaderStage};
use naga::valid::{Capabilities, ValidationFlags, Validator};

fn validate(label: &str, source: &str) {
    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|err| panic!("{label} failed to parse: {}", err.emit_to_string(source)));
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .unwrap_or_else(|err| panic!("{label} failed validation: {err:?}"));
}

fn entry_points(source: &str) -> Vec<String> {
    let module = naga::front::wgsl::parse_str(source).expect("parses");
    module
        .entry_points
        .iter()
        .map(|entry| entry.name.clone())
        .collect()
}

#[test]
fn patched_material_modules_validate() {
    let mut material = StandardMaterial::new().with_compile_hook(displacement_hook(true));
    let shader = material.compile().expect("material compiles");
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        let module = shader.source.module(stage).expect("module assembles");
        validate(&format!("patched {stage} module"), &module);
    }
}

#[test]
fn unpatched_template_validates() {
    let source = ShaderSource::standard();
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        let module = source.module(stage).expect("module assembles");
        validate(&format!("template {stage} module"), &module);
    }
}

#[test]
fn modules_expose_the_pipeline_entry_points() {
    let mut material = StandardMaterial::new().with_compile_hook(displacement_hook(true));
    let shader = material.compile().expect("material compiles");
    let vertex = shader.source.module(ShaderStage::Vertex).expect("vertex");
    let fragment = shader.source.module(ShaderStage::Fragment).expect("fragment");
    assert_eq!(entry_points(&vertex), vec!["vs_main".to_string()]);
    assert_eq!(entry_points(&fragment), vec!["fs_main".to_string()]);
}

#[test]
fn time_uniform_is_declared_once_per_module() {
    let mut material = StandardMaterial::new().with_compile_hook(displacement_hook(true));
    let shader = material.compile().expect("material compiles");
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        let module = shader.source.module(stage).expect("module assembles");
        assert_eq!(module.matches("time: f32").count(), 1, "{stage} module");
    }
}
