//! Renderer crate for scrollshade.
//!
//! Draws one full-viewport plane with a three.js-style shader material whose
//! `uProgress` uniform follows the scroll position over a virtual page. The
//! overall flow is:
//!
//! ```text
//!   scrollshade CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!          │                │                                  │
//!          │                ├─ wheel/keys ─▶ SceneState ───────┤ advance()
//!          │                └─ Resized ──▶ ResizeDebouncer ────┘
//!          ▼
//!   spawn_texture_loads ──(EventLoopProxy)──▶ GpuState::install_texture
//! ```
//!
//! `SceneState` is pure CPU state (camera, viewport, scroll timeline, uniform
//! bag) and can be exercised without a GPU. `GpuState` renders the plane into
//! an offscreen canvas at the capped pixel ratio and blits it to the window.

mod camera;
mod compile;
mod gpu;
mod loader;
mod runtime;
mod scene;
mod types;
mod window;

use anyhow::Result;

pub use camera::PerspectiveCamera;
pub use compile::{
    check_program, load_sources, wrap_program, WrappedProgram, DEFAULT_FRAGMENT_SHADER,
    DEFAULT_VERTEX_SHADER,
};
pub use gpu::SceneUniforms;
pub use loader::{decode_image, spawn_texture_loads, DecodedImage, TextureEvent, TextureSink};
pub use runtime::{ResizeDebouncer, Viewport};
pub use scene::{ResizeOutcome, SceneState};
pub use types::{
    Antialiasing, CameraSettings, ClearColor, RendererConfig, ScrollSettings, ShaderSources,
    SurfaceAlpha, TextureSlots, TEXTURE_SLOTS,
};

/// Entry point that owns the configuration for one window.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and renders until it is closed.
    ///
    /// Shader compile errors, a missing GPU adapter, or window creation
    /// failures are returned before the first frame.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            title = %self.config.title,
            width = self.config.window_size.0,
            height = self.config.window_size.1,
            sections = self.config.scroll.sections.len(),
            textures = self.config.textures.len(),
            "starting renderer"
        );
        window::run_window(self.config)
    }
}
