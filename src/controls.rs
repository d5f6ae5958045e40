//! Orbit camera controls: rotate around a target with the primary button,
//! pan with the secondary one, dolly with the wheel.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::input::PointerButton;

const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Distance from the target.
    radius: f32,
    /// Angle around the vertical axis, measured from +Z.
    azimuth: f32,
    /// Angle from the vertical axis.
    polar: f32,
    drag: Option<(DragMode, Vec2)>,
}

impl OrbitControls {
    /// Binds to the current camera placement around `target`.
    pub fn new(camera: &PerspectiveCamera, target: Vec3) -> Self {
        let mut controls = Self {
            target,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            radius: 1.0,
            azimuth: 0.0,
            polar: PI / 2.0,
            drag: None,
        };
        controls.sync_from(camera);
        controls
    }

    fn sync_from(&mut self, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        self.radius = offset.length();
        if self.radius > 0.0 {
            self.azimuth = offset.x.atan2(offset.z);
            self.polar = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
        }
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) {
        let mode = match button {
            PointerButton::Primary => DragMode::Rotate,
            PointerButton::Secondary | PointerButton::Auxiliary => DragMode::Pan,
            PointerButton::Other(_) => return,
        };
        self.drag = Some((mode, position));
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Applies a drag step. Returns whether the camera needs an update.
    pub fn pointer_move(&mut self, position: Vec2, camera: &PerspectiveCamera, viewport_height: f32) -> bool {
        let Some((mode, last)) = self.drag else {
            return false;
        };
        let delta = position - last;
        self.drag = Some((mode, position));
        let height = viewport_height.max(1.0);
        match mode {
            DragMode::Rotate => {
                self.azimuth -= TAU * delta.x / height * self.rotate_speed;
                self.polar -= TAU * delta.y / height * self.rotate_speed;
            }
            DragMode::Pan => self.pan(delta, camera, height),
        }
        true
    }

    fn pan(&mut self, delta: Vec2, camera: &PerspectiveCamera, height: f32) {
        let forward = (self.target - camera.position).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        let visible = 2.0 * self.radius * (camera.fov.to_radians() / 2.0).tan();
        let scale = visible / height * self.pan_speed;
        self.target += (-right * delta.x + up * delta.y) * scale;
    }

    /// Dollies in for negative `delta_y` (wheel up) and out for positive.
    pub fn wheel(&mut self, delta_y: f32) {
        let scale = 0.95_f32.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.radius *= scale;
        } else if delta_y > 0.0 {
            self.radius /= scale;
        }
    }

    /// Clamps the spherical state and places the camera accordingly.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        self.polar = self.polar.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);
        let sin_polar = self.polar.sin();
        let offset = Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        );
        camera.position = self.target + offset;
        camera.look_at(self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (PerspectiveCamera, OrbitControls) {
        let mut camera = PerspectiveCamera::new(70.0, 1.0, 0.001, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 2.0);
        let controls = OrbitControls::new(&camera, Vec3::ZERO);
        (camera, controls)
    }

    #[test]
    fn binding_preserves_camera_position() {
        let (mut camera, mut controls) = setup();
        controls.update(&mut camera);
        assert!((camera.position - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        assert_eq!(camera.target(), Vec3::ZERO);
    }

    #[test]
    fn horizontal_drag_orbits_at_constant_distance() {
        let (mut camera, mut controls) = setup();
        controls.pointer_down(PointerButton::Primary, Vec2::ZERO);
        assert!(controls.pointer_move(Vec2::new(100.0, 0.0), &camera, 400.0));
        controls.update(&mut camera);
        assert!((camera.position.length() - 2.0).abs() < 1e-5);
        assert!(camera.position.x.abs() > 0.1);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let (mut camera, mut controls) = setup();
        controls.pointer_down(PointerButton::Primary, Vec2::ZERO);
        controls.pointer_move(Vec2::new(0.0, 10_000.0), &camera, 100.0);
        controls.update(&mut camera);
        assert!(camera.position.y > 1.99);
        assert!(camera.position.y.is_finite());
    }

    #[test]
    fn wheel_dollies_and_respects_limits() {
        let (mut camera, mut controls) = setup();
        controls.wheel(-1.0);
        controls.update(&mut camera);
        assert!((controls.distance() - 1.9).abs() < 1e-5);
        controls.max_distance = 2.5;
        for _ in 0..20 {
            controls.wheel(1.0);
        }
        controls.update(&mut camera);
        assert_eq!(controls.distance(), 2.5);
    }

    #[test]
    fn moves_without_drag_are_ignored() {
        let (camera, mut controls) = setup();
        assert!(!controls.pointer_move(Vec2::new(5.0, 5.0), &camera, 100.0));
        controls.pointer_down(PointerButton::Secondary, Vec2::ZERO);
        controls.pointer_move(Vec2::new(10.0, 0.0), &camera, 100.0);
        assert!(controls.target.x < 0.0);
        controls.pointer_up();
        assert!(!controls.is_dragging());
    }
}
