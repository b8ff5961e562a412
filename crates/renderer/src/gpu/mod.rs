//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device, and swapchain and picks the
//!   present mode, alpha mode, and MSAA sample count.
//! - `canvas` is the offscreen drawing buffer (plus optional MSAA target) and
//!   the blit that scales it onto the swapchain.
//! - `textures` holds the three slot textures, starting as placeholders.
//! - `pipeline` builds the plane mesh and the shader-material pipeline.
//! - `uniforms` mirrors the std140 block injected into every shader.
//! - `state` glues everything together for `window`.

mod canvas;
mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub(crate) use state::{GpuOptions, GpuState};
pub use uniforms::SceneUniforms;
