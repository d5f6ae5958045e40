use std::fmt;

use anyhow::{Context, Result};
use glam::Vec3;
use log::{debug, warn};

use crate::error::ShaderPatchError;
use crate::shader::chunks::{FRAGMENT_INSERTIONS, VERTEX_INSERTIONS};
use crate::shader::{
    missing_anchors, patch_shader, patch_shader_checked, ShaderSource, ShaderStage,
};

/// Callback run right before a material's shader modules are built. It may
/// rewrite the source and add uniforms.
pub type CompileHook = Box<dyn FnMut(&mut ShaderSource) -> Result<(), ShaderPatchError>>;

/// Shader source a material was last compiled from. The renderer reads the
/// uniform values from here every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledShader {
    pub source: ShaderSource,
}

impl CompiledShader {
    pub fn uniforms(&self) -> &crate::shader::Uniforms {
        &self.source.uniforms
    }

    /// Overwrites `name` if the compile hook declared it.
    pub fn set_uniform(&mut self, name: &str, value: f32) -> bool {
        match self.source.uniforms.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Lit material with a white base colour, fully rough and non metallic.
pub struct StandardMaterial {
    pub color: Vec3,
    pub roughness: f32,
    pub metalness: f32,
    on_before_compile: Option<CompileHook>,
    shader: Option<CompiledShader>,
}

impl fmt::Debug for StandardMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardMaterial")
            .field("color", &self.color)
            .field("roughness", &self.roughness)
            .field("metalness", &self.metalness)
            .field("has_hook", &self.on_before_compile.is_some())
            .field("shader", &self.shader)
            .finish()
    }
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            roughness: 1.0,
            metalness: 0.0,
            on_before_compile: None,
            shader: None,
        }
    }
}

impl StandardMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compile_hook(mut self, hook: CompileHook) -> Self {
        self.on_before_compile = Some(hook);
        self
    }

    /// Builds the shader source, lets the compile hook rewrite it and keeps
    /// the result as the material's compiled shader.
    pub fn compile(&mut self) -> Result<&CompiledShader> {
        let mut source = ShaderSource::standard();
        if let Some(hook) = self.on_before_compile.as_mut() {
            hook(&mut source).context("material compile hook failed")?;
        }
        debug!(
            "compiled standard material with {} custom uniform(s)",
            source.uniforms.len()
        );
        Ok(self.shader.insert(CompiledShader { source }))
    }

    /// `None` until [`compile`](Self::compile) has run.
    pub fn shader(&self) -> Option<&CompiledShader> {
        self.shader.as_ref()
    }

    pub fn shader_mut(&mut self) -> Option<&mut CompiledShader> {
        self.shader.as_mut()
    }
}

/// Compile hook that adds the `time` uniform and splices the displacement
/// snippets into both stages. Missing anchors are logged; in `strict` mode the
/// first one aborts compilation.
pub fn displacement_hook(strict: bool) -> CompileHook {
    Box::new(move |shader: &mut ShaderSource| {
        shader.uniforms.set("time", 0.0);
        shader.vertex_shader = patch_stage(
            &shader.vertex_shader,
            ShaderStage::Vertex,
            &VERTEX_INSERTIONS,
            strict,
        )?;
        shader.fragment_shader = patch_stage(
            &shader.fragment_shader,
            ShaderStage::Fragment,
            &FRAGMENT_INSERTIONS,
            strict,
        )?;
        Ok(())
    })
}

fn patch_stage(
    source: &str,
    stage: ShaderStage,
    insertions: &[crate::shader::Insertion<'_>],
    strict: bool,
) -> Result<String, ShaderPatchError> {
    if strict {
        return patch_shader_checked(source, stage, insertions);
    }
    for anchor in missing_anchors(source, insertions) {
        warn!("{stage} shader has no `{anchor}` anchor; snippet skipped");
    }
    Ok(patch_shader(source, insertions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::chunks::{
        FRAGMENT_MAIN, FRAGMENT_MAIN_ANCHOR, FRAGMENT_PARS, FRAGMENT_PARS_ANCHOR, VERTEX_MAIN,
        VERTEX_MAIN_ANCHOR, VERTEX_PARS, VERTEX_PARS_ANCHOR,
    };

    #[test]
    fn shader_record_is_absent_until_compiled() {
        let mut material = StandardMaterial::new().with_compile_hook(displacement_hook(false));
        assert!(material.shader().is_none());
        material.compile().unwrap();
        assert_eq!(material.shader().unwrap().uniforms().get("time"), Some(0.0));
    }

    #[test]
    fn hook_appends_all_four_snippets_after_their_anchors() {
        let mut material = StandardMaterial::new().with_compile_hook(displacement_hook(true));
        let source = &material.compile().unwrap().source;
        for (text, anchor, snippet) in [
            (&source.vertex_shader, VERTEX_PARS_ANCHOR, VERTEX_PARS),
            (&source.vertex_shader, VERTEX_MAIN_ANCHOR, VERTEX_MAIN),
            (&source.fragment_shader, FRAGMENT_MAIN_ANCHOR, FRAGMENT_MAIN),
            (&source.fragment_shader, FRAGMENT_PARS_ANCHOR, FRAGMENT_PARS),
        ] {
            assert!(text.contains(&format!("{anchor}\n{snippet}")), "{anchor}");
        }
    }

    #[test]
    fn material_without_hook_keeps_the_template() {
        let mut material = StandardMaterial::new();
        let compiled = material.compile().unwrap();
        assert_eq!(compiled.source, ShaderSource::standard());
        assert!(compiled.uniforms().is_empty());
    }

    #[test]
    fn strict_hook_fails_on_drifted_template() {
        let mut hook = displacement_hook(true);
        let mut source = ShaderSource::standard();
        source.fragment_shader = source.fragment_shader.replace(FRAGMENT_PARS_ANCHOR, "");
        let err = hook(&mut source).unwrap_err();
        assert!(matches!(
            err,
            ShaderPatchError::MissingAnchor { stage: ShaderStage::Fragment, .. }
        ));
    }

    #[test]
    fn lenient_hook_leaves_drifted_stage_unmodified() {
        let mut hook = displacement_hook(false);
        let mut source = ShaderSource::standard();
        let drifted = source.vertex_shader.replace(VERTEX_PARS_ANCHOR, "").replace(VERTEX_MAIN_ANCHOR, "");
        source.vertex_shader = drifted.clone();
        hook(&mut source).unwrap();
        assert_eq!(source.vertex_shader, drifted);
        assert!(source.fragment_shader.contains(FRAGMENT_MAIN));
    }

    #[test]
    fn set_uniform_ignores_undeclared_names() {
        let mut material = StandardMaterial::new().with_compile_hook(displacement_hook(false));
        material.compile().unwrap();
        let shader = material.shader_mut().unwrap();
        assert!(shader.set_uniform("time", 2.5));
        assert!(!shader.set_uniform("speed", 1.0));
        assert_eq!(shader.uniforms().get("time"), Some(2.5));
    }
}
