use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use scrolltrigger::{Scrub, SectionExtent};

/// The plane samples up to three textures (`uTexture1-3`).
pub const TEXTURE_SLOTS: usize = 3;

/// Image files bound to the shader's texture slots.
#[derive(Clone, Debug, Default)]
pub struct TextureSlots {
    sources: [Option<PathBuf>; TEXTURE_SLOTS],
}

impl TextureSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates an image path with the given slot (zero-based).
    pub fn set(&mut self, slot: usize, path: PathBuf) -> Result<()> {
        if slot >= TEXTURE_SLOTS {
            anyhow::bail!(
                "texture slot {} exceeds supported slot count ({})",
                slot,
                TEXTURE_SLOTS
            );
        }
        self.sources[slot] = Some(path);
        Ok(())
    }

    /// Fills slots in order from an iterator of paths.
    pub fn from_paths<I>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut slots = Self::new();
        for (index, path) in paths.into_iter().enumerate() {
            slots.set(index, path)?;
        }
        Ok(slots)
    }

    pub fn get(&self, slot: usize) -> Option<&PathBuf> {
        self.sources.get(slot).and_then(|source| source.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &PathBuf)> {
        self.sources
            .iter()
            .enumerate()
            .filter_map(|(index, source)| source.as_ref().map(|path| (index, path)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the vertex and fragment programs come from.
#[derive(Clone, Debug, Default)]
pub struct ShaderSources {
    /// `None` selects the built-in full-screen plane shader.
    pub vertex: Option<PathBuf>,
    /// `None` selects the built-in three-way blend shader.
    pub fragment: Option<PathBuf>,
}

/// Anti-aliasing policy for the canvas pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the canvas format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the canvas.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Declares how the compositor should treat the swapchain alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceAlpha {
    #[default]
    Opaque,
    /// Frames may contain transparency and should be blended by the compositor.
    Transparent,
}

/// RGBA clear color in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor(pub [f64; 4]);

impl Default for ClearColor {
    fn default() -> Self {
        Self([0.0, 0.0, 0.0, 1.0])
    }
}

impl From<ClearColor> for wgpu::Color {
    fn from(value: ClearColor) -> Self {
        let [r, g, b, a] = value.0;
        wgpu::Color { r, g, b, a }
    }
}

/// Perspective camera parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub fovy_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fovy_degrees: 70.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 1.0],
        }
    }
}

/// Virtual page and scroll input behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollSettings {
    pub sections: Vec<SectionExtent>,
    pub trailing: SectionExtent,
    pub scrub: Scrub,
    /// Logical pixels scrolled per wheel line.
    pub line_height: f32,
    pub resize_debounce: Duration,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            sections: vec![SectionExtent::Viewport(1.0); 3],
            trailing: SectionExtent::Viewport(1.0),
            scrub: Scrub::Linked,
            line_height: 100.0,
            resize_debounce: Duration::from_millis(100),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Initial window size in logical pixels.
    pub window_size: (u32, u32),
    pub title: String,
    pub shaders: ShaderSources,
    pub textures: TextureSlots,
    pub camera: CameraSettings,
    pub clear_color: ClearColor,
    /// Upper bound applied to the device scale factor.
    pub max_pixel_ratio: f64,
    pub antialiasing: Antialiasing,
    pub surface_alpha: SurfaceAlpha,
    pub vsync: bool,
    pub scroll: ScrollSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            title: "scrollshade".into(),
            shaders: ShaderSources::default(),
            textures: TextureSlots::default(),
            camera: CameraSettings::default(),
            clear_color: ClearColor::default(),
            max_pixel_ratio: 2.0,
            antialiasing: Antialiasing::default(),
            surface_alpha: SurfaceAlpha::Transparent,
            vsync: true,
            scroll: ScrollSettings::default(),
        }
    }
}
