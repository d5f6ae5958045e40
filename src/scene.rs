use anyhow::Result;
use glam::{Mat4, UVec2, Vec2, Vec3};
use log::info;

use crate::camera::PerspectiveCamera;
use crate::config::{check_detail, SketchConfig};
use crate::controls::OrbitControls;
use crate::error::SketchError;
use crate::geometry::{icosahedron, Geometry};
use crate::input::PointerButton;
use crate::material::{displacement_hook, StandardMaterial};
use crate::postprocess::{BloomPass, Composer, PassKind, ToneMappingMode};
use crate::settings::{ParameterPanel, SettingField, SettingsOption};

pub const CAMERA_FOV: f32 = 70.0;
pub const CAMERA_NEAR: f32 = 0.001;
pub const CAMERA_FAR: f32 = 1000.0;
pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 2.0);

pub const AMBIENT_COLOR: u32 = 0x4255ff;
pub const AMBIENT_INTENSITY: f32 = 0.5;
pub const DIRECTIONAL_COLOR: u32 = 0x526cff;
pub const DIRECTIONAL_INTENSITY: f32 = 0.6;
pub const DIRECTIONAL_POSITION: Vec3 = Vec3::new(2.0, 2.0, 2.0);

/// Converts a `0xRRGGBB` sRGB colour to linear RGB.
pub fn srgb_hex_to_linear(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(16), channel(8), channel(0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub hex: u32,
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn new(hex: u32, intensity: f32) -> Self {
        Self {
            hex,
            color: srgb_hex_to_linear(hex),
            intensity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub hex: u32,
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl DirectionalLight {
    pub fn new(hex: u32, intensity: f32) -> Self {
        Self {
            hex,
            color: srgb_hex_to_linear(hex),
            intensity,
            position: Vec3::Y,
            target: Vec3::ZERO,
        }
    }

    /// Unit vector from the lit surface towards the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).normalize_or_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub model: Mat4,
    pub detail: u32,
}

/// Logical container size plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Everything the render loop, the panel and the resize handler mutate.
#[derive(Debug)]
pub struct SceneState {
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub lights: Lights,
    pub material: StandardMaterial,
    pub mesh: Mesh,
    pub composer: Composer,
    pub panel: ParameterPanel,
    pub viewport: Viewport,
    pub clear_color: Vec3,
}

impl SceneState {
    /// Builds the scene for a container of `width` x `height` logical pixels.
    /// The material is left uncompiled; the renderer compiles it before
    /// building its pipeline.
    pub fn bootstrap(
        config: &SketchConfig,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SketchError::ZeroViewport { width, height }.into());
        }
        let viewport = Viewport {
            width,
            height,
            pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
        };

        let mut camera =
            PerspectiveCamera::new(CAMERA_FOV, viewport.aspect(), CAMERA_NEAR, CAMERA_FAR);
        camera.position = CAMERA_POSITION;
        camera.look_at(Vec3::ZERO);
        let mut controls = OrbitControls::new(&camera, Vec3::ZERO);
        controls.update(&mut camera);

        let mut directional = DirectionalLight::new(DIRECTIONAL_COLOR, DIRECTIONAL_INTENSITY);
        directional.position = DIRECTIONAL_POSITION;
        let lights = Lights {
            ambient: AmbientLight::new(AMBIENT_COLOR, AMBIENT_INTENSITY),
            directional,
        };

        check_detail(config.detail)?;
        let geometry = icosahedron(1.0, config.detail);
        info!(
            "icosahedron detail {} -> {} triangles",
            config.detail,
            geometry.triangle_count()
        );
        let mesh = Mesh {
            geometry,
            model: Mat4::IDENTITY,
            detail: config.detail,
        };
        let material =
            StandardMaterial::new().with_compile_hook(displacement_hook(config.strict_shaders));

        let defaults = SettingsOption::default();
        let size = UVec2::new(width, height);
        let bloom = BloomPass::new(size, defaults.strength, defaults.radius, defaults.threshold);
        let mut composer = Composer::new(size, bloom);
        let mut panel = ParameterPanel::new(defaults);
        let overrides = config.settings();
        for (field, value) in [
            (SettingField::Exposure, overrides.exposure),
            (SettingField::Strength, overrides.strength),
            (SettingField::Radius, overrides.radius),
        ] {
            if value != panel.value(field) {
                panel.set(field, value, &mut composer);
            }
        }
        panel.sync(&mut composer);

        Ok(Self {
            camera,
            controls,
            lights,
            material,
            mesh,
            composer,
            panel,
            viewport,
            clear_color: Vec3::ZERO,
        })
    }

    pub fn apply_setting(&mut self, field: SettingField, value: f32) -> f32 {
        self.panel.set(field, value, &mut self.composer)
    }

    /// Moves the selected slider by `steps`.
    pub fn nudge_selected(&mut self, steps: i32) -> f32 {
        let field = self.panel.selected();
        self.panel.nudge(field, steps, &mut self.composer)
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) {
        self.controls.pointer_down(button, position);
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        let height = self.viewport.height as f32;
        if self.controls.pointer_move(position, &self.camera, height) {
            self.controls.update(&mut self.camera);
        }
    }

    pub fn pointer_up(&mut self) {
        self.controls.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.controls.wheel(delta_y);
        self.controls.update(&mut self.camera);
    }

    /// Human-readable description printed by the summary run.
    pub fn summary_lines(&self) -> Vec<String> {
        let camera = &self.camera;
        let ambient = &self.lights.ambient;
        let directional = &self.lights.directional;
        let bloom = &self.composer.bloom;
        let tone_mapping = match self.composer.tone_mapping.mode {
            ToneMappingMode::None => "none",
            ToneMappingMode::Reinhard => "reinhard",
        };
        let passes = self
            .composer
            .passes
            .iter()
            .map(|pass| match pass {
                PassKind::Render => "render".to_string(),
                PassKind::Bloom => format!(
                    "bloom(strength {:.2}, radius {:.2}, threshold {:.2})",
                    bloom.strength, bloom.radius, bloom.threshold
                ),
                PassKind::Output => format!(
                    "output({tone_mapping}, exposure {:.2})",
                    self.composer.tone_mapping.exposure
                ),
            })
            .collect::<Vec<_>>()
            .join(" -> ");
        vec![
            format!(
                "Viewport: {}x{} @{:.2}x",
                self.viewport.width, self.viewport.height, self.viewport.pixel_ratio
            ),
            format!(
                "Camera: fov {:.0} near {} far {} at ({:.2}, {:.2}, {:.2})",
                camera.fov,
                camera.near,
                camera.far,
                camera.position.x,
                camera.position.y,
                camera.position.z
            ),
            format!(
                "Mesh: icosahedron detail {} ({} triangles, {} vertices)",
                self.mesh.detail,
                self.mesh.geometry.triangle_count(),
                self.mesh.geometry.vertices.len()
            ),
            format!(
                "Lights: ambient #{:06x} x{:.2}, directional #{:06x} x{:.2} at ({:.2}, {:.2}, {:.2})",
                ambient.hex,
                ambient.intensity,
                directional.hex,
                directional.intensity,
                directional.position.x,
                directional.position.y,
                directional.position.z
            ),
            format!("Composer: {passes}"),
            format!("Panel: {}", self.panel.describe()),
        ]
    }
}
