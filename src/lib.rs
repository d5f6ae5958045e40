//! A displaced, bloomed icosahedron rendered with wgpu.
//!
//! The crate keeps the scene description (camera, orbit controls, lights,
//! patched material, bloom composer and parameter panel) free of any GPU or
//! window types so that it can be driven headless from tests and the
//! `--summary-only` CLI mode. The [`render`] module turns that state into
//! frames on a native window or, on `wasm32`, on a canvas created inside a
//! page container.

pub mod app;
pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod geometry;
pub mod input;
pub mod material;
pub mod postprocess;
pub mod render;
pub mod render_loop;
pub mod resize;
pub mod scene;
pub mod settings;
pub mod shader;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{run_summary, CommandOutcome, Sketch};
pub use config::SketchConfig;
pub use error::{ShaderPatchError, SketchError};
pub use material::{CompiledShader, StandardMaterial};
pub use postprocess::{BloomPass, Composer, ToneMapping};
pub use render::Renderer;
pub use render_loop::{Clock, FrameRenderer, FrameScheduler, Playback, RenderLoop};
pub use scene::SceneState;
pub use settings::{ParameterPanel, SettingsOption};
pub use shader::{patch_shader, Insertion, ShaderSource, ShaderStage};
