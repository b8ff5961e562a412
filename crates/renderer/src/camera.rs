use glam::{Mat4, Vec3};

use crate::types::CameraSettings;

/// Perspective camera looking down -Z at the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    fovy_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    position: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        let mut camera = Self {
            fovy_degrees: settings.fovy_degrees,
            aspect: sanitize_aspect(aspect),
            near: settings.near,
            far: settings.far,
            position: Vec3::from_array(settings.position),
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy_degrees(&self) -> f32 {
        self.fovy_degrees
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Changes the aspect ratio; call [`Self::update_projection`] afterwards.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = sanitize_aspect(aspect);
    }

    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fovy_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// World-to-camera transform; the plane itself sits at the origin.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
