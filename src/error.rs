use thiserror::Error;

use crate::shader::ShaderStage;

/// Failures raised while splicing snippets into material shader source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderPatchError {
    #[error("anchor `{anchor}` not found in {stage} shader")]
    MissingAnchor { stage: ShaderStage, anchor: String },
    #[error("`{0}` is not a valid uniform name")]
    InvalidUniformName(String),
}

/// Fatal start-up errors of the sketch.
#[derive(Debug, Error)]
pub enum SketchError {
    #[error("container element `{0}` not found")]
    MissingContainer(String),
    #[error("viewport has zero area ({width}x{height})")]
    ZeroViewport { width: u32, height: u32 },
    #[error("{0}")]
    Config(String),
}
