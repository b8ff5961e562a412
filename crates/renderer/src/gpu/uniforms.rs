use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::types::TEXTURE_SLOTS;

/// CPU mirror of the `SceneUniforms` block declared in the shader prelude.
///
/// The field order and padding follow std140; keep it in sync with
/// `compile::UNIFORM_BLOCK`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub tex_resolution: [f32; 2],
    pub texture_size: [f32; 2],
    pub progress: f32,
    pub time: f32,
    pub texture_sizes: [[f32; 4]; TEXTURE_SLOTS],
}

unsafe impl Zeroable for SceneUniforms {}
unsafe impl Pod for SceneUniforms {}

impl SceneUniforms {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            model_view: Mat4::IDENTITY.to_cols_array_2d(),
            resolution: [width, height],
            tex_resolution: [1.0, 1.0],
            texture_size: [1.0, 1.0],
            progress: 0.0,
            time: 0.0,
            texture_sizes: [[1.0, 1.0, 0.0, 0.0]; TEXTURE_SLOTS],
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution = [width, height];
    }

    pub fn set_matrices(&mut self, projection: Mat4, model_view: Mat4) {
        self.projection = projection.to_cols_array_2d();
        self.model_view = model_view.to_cols_array_2d();
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress;
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    /// Records an image size for `slot`.
    ///
    /// The shared `texResolution`/`uTextureSize` pair always reflects the most
    /// recently loaded image; `uTextureSizes[slot]` keeps each slot's own size
    /// and flags it as loaded in `z`.
    pub fn record_texture_size(&mut self, slot: usize, width: u32, height: u32) {
        let size = [width as f32, height as f32];
        self.tex_resolution = size;
        self.texture_size = size;
        if let Some(entry) = self.texture_sizes.get_mut(slot) {
            *entry = [size[0], size[1], 1.0, 0.0];
        }
    }
}
