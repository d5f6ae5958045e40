use log::debug;

use crate::scene::SceneState;

/// Drawable whose backing buffers follow the container size.
pub trait RenderSurface {
    /// Reallocates the surface at a physical pixel size.
    fn resize_surface(&mut self, width: u32, height: u32);
}

/// Physical size of a logical viewport at `pixel_ratio`, at least 1x1.
pub fn physical_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |value: u32| ((value as f32 * pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// `measured` unless it has zero area, then `fallback` (at least 1x1).
pub fn usable_size(measured: (u32, u32), fallback: (u32, u32)) -> (u32, u32) {
    match measured {
        (width, height) if width > 0 && height > 0 => (width, height),
        _ => (fallback.0.max(1), fallback.1.max(1)),
    }
}

/// Follows a container resize: viewport, camera aspect and projection,
/// composer size, then the surface. Zero-area sizes are ignored. Returns
/// whether anything changed.
pub fn handle_resize(
    scene: &mut SceneState,
    surface: &mut impl RenderSurface,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 {
        debug!("ignoring resize to {width}x{height}");
        return false;
    }
    scene.viewport.width = width;
    scene.viewport.height = height;
    scene.camera.aspect = width as f32 / height as f32;
    scene.camera.update_projection_matrix();
    scene.composer.set_size(width, height);
    let (physical_width, physical_height) =
        physical_size(width, height, scene.viewport.pixel_ratio);
    surface.resize_surface(physical_width, physical_height);
    debug!("resized to {width}x{height} ({physical_width}x{physical_height} physical)");
    true
}

#[cfg(test)]
mod tests {
    use glam::UVec2;

    use super::*;
    use crate::config::SketchConfig;
    use crate::render_loop::HeadlessRenderer;

    fn scene(pixel_ratio: f32) -> SceneState {
        let config = SketchConfig {
            detail: 0,
            ..SketchConfig::default()
        };
        SceneState::bootstrap(&config, 800, 600, pixel_ratio).unwrap()
    }

    #[test]
    fn collapsed_container_uses_the_fallback() {
        assert_eq!(usable_size((800, 600), (1920, 1080)), (800, 600));
        assert_eq!(usable_size((800, 0), (1920, 1080)), (1920, 1080));
        assert_eq!(usable_size((0, 0), (0, 0)), (1, 1));
    }

    #[test]
    fn resize_updates_camera_composer_and_surface() {
        let mut scene = scene(2.0);
        let mut surface = HeadlessRenderer::new();
        assert!(handle_resize(&mut scene, &mut surface, 1024, 512));
        assert_eq!(scene.camera.aspect, 2.0);
        assert_eq!(scene.composer.size(), UVec2::new(1024, 512));
        assert_eq!(scene.composer.bloom.resolution, UVec2::new(1024, 512));
        assert_eq!(surface.surface_size, Some((2048, 1024)));
        assert_eq!((scene.viewport.width, scene.viewport.height), (1024, 512));
    }

    #[test]
    fn projection_follows_aspect() {
        let mut scene = scene(1.0);
        let before = scene.camera.projection();
        handle_resize(&mut scene, &mut HeadlessRenderer::new(), 1600, 600);
        assert_ne!(scene.camera.projection(), before);
    }

    #[test]
    fn zero_area_is_ignored() {
        let mut scene = scene(1.0);
        let mut surface = HeadlessRenderer::new();
        assert!(!handle_resize(&mut scene, &mut surface, 0, 600));
        assert_eq!(surface.surface_size, None);
        assert_eq!(scene.composer.size(), UVec2::new(800, 600));
    }

    #[test]
    fn physical_size_rounds_and_never_collapses() {
        assert_eq!(physical_size(101, 50, 1.5), (152, 75));
        assert_eq!(physical_size(1, 1, 0.25), (1, 1));
    }
}
