//! Text-level shader patching.
//!
//! Material shaders are assembled from a WGSL template that carries
//! `#include <...>` anchors inside line comments. Custom code is spliced in
//! right after those anchors, and the custom uniforms added by a compile hook
//! are turned into a generated `MaterialUniforms` block.

pub mod chunks;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ShaderPatchError;

/// Programmable stage a piece of shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Snippet appended immediately after the first occurrence of `anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion<'a> {
    pub anchor: &'a str,
    pub snippet: &'a str,
}

impl<'a> Insertion<'a> {
    pub const fn new(anchor: &'a str, snippet: &'a str) -> Self {
        Self { anchor, snippet }
    }

    /// Whether `source` already carries this snippet right after its anchor.
    pub fn is_applied(&self, source: &str) -> bool {
        source.contains(&format!("{}\n{}", self.anchor, self.snippet))
    }
}

/// Applies every insertion in order. An anchor that is absent leaves the
/// source untouched for that insertion.
pub fn patch_shader(source: &str, insertions: &[Insertion<'_>]) -> String {
    let mut patched = source.to_string();
    for insertion in insertions {
        if let Some(next) = insert_after(&patched, insertion) {
            patched = next;
        }
    }
    patched
}

/// Like [`patch_shader`], but the first missing anchor is an error.
pub fn patch_shader_checked(
    source: &str,
    stage: ShaderStage,
    insertions: &[Insertion<'_>],
) -> Result<String, ShaderPatchError> {
    let mut patched = source.to_string();
    for insertion in insertions {
        patched = insert_after(&patched, insertion).ok_or_else(|| {
            ShaderPatchError::MissingAnchor {
                stage,
                anchor: insertion.anchor.to_string(),
            }
        })?;
    }
    Ok(patched)
}

/// Anchors of `insertions` that do not occur in `source`.
pub fn missing_anchors<'a>(source: &str, insertions: &[Insertion<'a>]) -> Vec<&'a str> {
    insertions
        .iter()
        .filter(|insertion| !source.contains(insertion.anchor))
        .map(|insertion| insertion.anchor)
        .collect()
}

fn insert_after(source: &str, insertion: &Insertion<'_>) -> Option<String> {
    let start = source.find(insertion.anchor)?;
    let end = start + insertion.anchor.len();
    let mut patched = String::with_capacity(source.len() + insertion.snippet.len() + 1);
    patched.push_str(&source[..end]);
    patched.push('\n');
    patched.push_str(insertion.snippet);
    patched.push_str(&source[end..]);
    Some(patched)
}

/// Scalar uniform exposed to material shaders.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub name: String,
    pub value: f32,
}

/// Ordered set of custom material uniforms. Declaration order is the layout
/// order of the generated uniform block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    entries: Vec<Uniform>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a uniform or overwrites the value of an existing one.
    pub fn set(&mut self, name: &str, value: f32) {
        match self.entries.iter_mut().find(|uniform| uniform.name == name) {
            Some(uniform) => uniform.value = value,
            None => self.entries.push(Uniform {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|uniform| uniform.name == name)
            .map(|uniform| uniform.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut f32> {
        self.entries
            .iter_mut()
            .find(|uniform| uniform.name == name)
            .map(|uniform| &mut uniform.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uniform> {
        self.entries.iter()
    }

    /// Values laid out as the generated WGSL block expects them, zero padded
    /// to a multiple of four floats.
    pub fn packed(&self) -> Vec<f32> {
        let mut values: Vec<f32> = self.entries.iter().map(|uniform| uniform.value).collect();
        values.resize(padded_len(values.len()), 0.0);
        values
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(4).max(1) * 4
}

/// Mutable shader source handed to a material compile hook.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub uniforms: Uniforms,
}

impl ShaderSource {
    /// Source of the built-in standard material, before any hook runs.
    pub fn standard() -> Self {
        Self {
            vertex_shader: chunks::STANDARD_VERTEX.to_string(),
            fragment_shader: chunks::STANDARD_FRAGMENT.to_string(),
            uniforms: Uniforms::new(),
        }
    }

    /// Complete WGSL module for one stage: generated prelude plus stage body.
    pub fn module(&self, stage: ShaderStage) -> Result<String, ShaderPatchError> {
        let body = match stage {
            ShaderStage::Vertex => &self.vertex_shader,
            ShaderStage::Fragment => &self.fragment_shader,
        };
        compose_stage(body, &self.uniforms)
    }
}

/// Prepends the shared globals and the custom uniform block to `source`.
pub fn compose_stage(source: &str, uniforms: &Uniforms) -> Result<String, ShaderPatchError> {
    let mut module = String::from(chunks::GLOBALS_PRELUDE);
    module.push_str("\nstruct MaterialUniforms {\n");
    for uniform in uniforms.iter() {
        if !is_identifier(&uniform.name) {
            return Err(ShaderPatchError::InvalidUniformName(uniform.name.clone()));
        }
        module.push_str(&format!("    {}: f32,\n", uniform.name));
    }
    for pad in uniforms.len()..padded_len(uniforms.len()) {
        module.push_str(&format!("    _pad{pad}: f32,\n"));
    }
    module.push_str("}\n\n@group(1) @binding(0)\nvar<uniform> material: MaterialUniforms;\n");
    module.push_str(source);
    Ok(module)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && !name.starts_with("__")
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "head\n// #include <a>\nmiddle\n// #include <b>\ntail";

    #[test]
    fn applied_insertions_are_detected() {
        let insertion = Insertion::new("#include <a>", "snippet_a");
        assert!(!insertion.is_applied(SOURCE));
        assert!(insertion.is_applied(&patch_shader(SOURCE, &[insertion])));
    }

    #[test]
    fn inserts_after_each_anchor() {
        let patched = patch_shader(
            SOURCE,
            &[
                Insertion::new("#include <a>", "snippet_a"),
                Insertion::new("#include <b>", "snippet_b"),
            ],
        );
        assert_eq!(
            patched,
            "head\n// #include <a>\nsnippet_a\nmiddle\n// #include <b>\nsnippet_b\ntail"
        );
    }

    #[test]
    fn only_first_occurrence_is_patched() {
        let patched = patch_shader("<x> <x>", &[Insertion::new("<x>", "y")]);
        assert_eq!(patched, "<x>\ny <x>");
    }

    #[test]
    fn missing_anchor_is_a_noop() {
        let insertions = [Insertion::new("#include <c>", "never")];
        assert_eq!(patch_shader(SOURCE, &insertions), SOURCE);
        assert_eq!(missing_anchors(SOURCE, &insertions), vec!["#include <c>"]);
    }

    #[test]
    fn checked_patch_reports_missing_anchor() {
        let err = patch_shader_checked(
            SOURCE,
            ShaderStage::Fragment,
            &[
                Insertion::new("#include <a>", "ok"),
                Insertion::new("#include <c>", "never"),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShaderPatchError::MissingAnchor {
                stage: ShaderStage::Fragment,
                anchor: "#include <c>".into(),
            }
        );
        assert_eq!(err.to_string(), "anchor `#include <c>` not found in fragment shader");
    }

    #[test]
    fn uniforms_keep_declaration_order_and_pad() {
        let mut uniforms = Uniforms::new();
        uniforms.set("time", 0.0);
        uniforms.set("speed", 2.0);
        uniforms.set("time", 1.5);
        assert_eq!(uniforms.get("time"), Some(1.5));
        assert_eq!(uniforms.packed(), vec![1.5, 2.0, 0.0, 0.0]);
        assert_eq!(Uniforms::new().packed(), vec![0.0; 4]);
    }

    #[test]
    fn composed_stage_declares_uniform_block() {
        let mut uniforms = Uniforms::new();
        uniforms.set("time", 0.0);
        let module = compose_stage("// body", &uniforms).unwrap();
        assert!(module.contains("    time: f32,\n    _pad1: f32,"));
        assert!(module.contains("var<uniform> material: MaterialUniforms;"));
        assert!(module.ends_with("// body"));
    }

    #[test]
    fn rejects_non_identifier_uniforms() {
        let mut uniforms = Uniforms::new();
        uniforms.set("1time", 0.0);
        assert_eq!(
            compose_stage("", &uniforms),
            Err(ShaderPatchError::InvalidUniformName("1time".into()))
        );
    }
}
