use std::path::Path;

use anyhow::{Context, Result};
use renderer::{
    Antialiasing, CameraSettings, ClearColor, Renderer, RendererConfig, ScrollSettings,
    ShaderSources, SurfaceAlpha, TextureSlots,
};
use sceneconfig::{AntialiasSetting, SceneConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::{AppPaths, ConfigSource};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// A validated scene configuration and where it was read from.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub source: ConfigSource,
    pub config: SceneConfig,
}

pub fn load_scene(paths: &AppPaths, explicit: Option<&Path>) -> Result<LoadedScene> {
    let source = paths.resolve_config(explicit);
    let config = match source.path() {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load scene config {}", path.display()))?,
        None => {
            let mut config = SceneConfig::default();
            config.resolve_paths(paths.config_dir());
            config
        }
    };
    tracing::debug!(source = %source.describe(), "scene configuration loaded");
    Ok(LoadedScene { source, config })
}

/// Applies command-line overrides and re-validates the result.
pub fn apply_overrides(config: &mut SceneConfig, args: &RunArgs) -> Result<()> {
    if let Some(size) = args.size {
        config.window.width = size.width;
        config.window.height = size.height;
    }
    if let Some(antialias) = args.antialias {
        config.renderer.antialias = antialias;
    }
    if let Some(ratio) = args.max_pixel_ratio {
        config.renderer.max_pixel_ratio = ratio;
    }
    if let Some(scrub) = args.scrub {
        config.scroll.scrub = scrub;
    }
    config
        .validate()
        .context("invalid command-line override")?;
    Ok(())
}

pub fn renderer_config(config: &SceneConfig) -> Result<RendererConfig> {
    let textures = TextureSlots::from_paths(config.textures.iter().cloned())?;
    let antialiasing = match config.renderer.antialias {
        AntialiasSetting::Auto => Antialiasing::Auto,
        setting => match setting.samples() {
            Some(samples) if samples > 1 => Antialiasing::Samples(samples),
            _ => Antialiasing::Off,
        },
    };

    Ok(RendererConfig {
        window_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        shaders: ShaderSources {
            vertex: config.vertex_shader().map(Path::to_path_buf),
            fragment: config.fragment_shader().map(Path::to_path_buf),
        },
        textures,
        camera: CameraSettings {
            fovy_degrees: config.camera.fovy,
            near: config.camera.near,
            far: config.camera.far,
            position: config.camera.position,
        },
        clear_color: ClearColor(config.clear_color()),
        max_pixel_ratio: config.renderer.max_pixel_ratio,
        antialiasing,
        surface_alpha: if config.renderer.transparent {
            SurfaceAlpha::Transparent
        } else {
            SurfaceAlpha::Opaque
        },
        vsync: config.renderer.vsync,
        scroll: ScrollSettings {
            sections: config.scroll.sections.clone(),
            trailing: config.scroll.trailing,
            scrub: config.scroll.scrub,
            line_height: config.scroll.line_height,
            resize_debounce: config.scroll.resize_debounce,
        },
    })
}

pub fn run(paths: &AppPaths, explicit: Option<&Path>, args: RunArgs) -> Result<()> {
    let LoadedScene { source, mut config } = load_scene(paths, explicit)?;
    apply_overrides(&mut config, &args)?;
    tracing::info!(config = %source.describe(), "launching scrollshade");

    for (slot, path) in config.textures.iter().enumerate() {
        if !path.is_file() {
            tracing::warn!(
                slot,
                path = %path.display(),
                "texture file not found; slot will keep its placeholder"
            );
        }
    }

    Renderer::new(renderer_config(&config)?).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::WindowSize;
    use scrolltrigger::{Scrub, SectionExtent};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn scene_config_maps_onto_renderer_config() {
        let config = SceneConfig::from_toml_str(
            r##"
version = 1
textures = ["/img/a.webp", "/img/b.webp"]

[shaders]
fragment = "/shaders/blend.frag"

[renderer]
clear_color = "#ff0000"
antialias = 8
transparent = false

[scroll]
sections = ["100vh", 480]
scrub = 1.5
"##,
        )
        .unwrap();

        let mapped = renderer_config(&config).unwrap();
        assert_eq!(mapped.textures.len(), 2);
        assert_eq!(mapped.textures.get(1), Some(&PathBuf::from("/img/b.webp")));
        assert!(mapped.shaders.vertex.is_none());
        assert_eq!(
            mapped.shaders.fragment,
            Some(PathBuf::from("/shaders/blend.frag"))
        );
        assert_eq!(mapped.clear_color, ClearColor([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(mapped.antialiasing, Antialiasing::Samples(8));
        assert_eq!(mapped.surface_alpha, SurfaceAlpha::Opaque);
        assert_eq!(
            mapped.scroll.sections,
            vec![SectionExtent::Viewport(1.0), SectionExtent::Pixels(480.0)]
        );
        assert_eq!(
            mapped.scroll.scrub,
            Scrub::Smoothed(Duration::from_millis(1500))
        );
    }

    #[test]
    fn antialias_off_maps_to_off() {
        let mut config = SceneConfig::default();
        config.renderer.antialias = AntialiasSetting::Off;
        assert_eq!(renderer_config(&config).unwrap().antialiasing, Antialiasing::Off);
        config.renderer.antialias = AntialiasSetting::Auto;
        assert_eq!(renderer_config(&config).unwrap().antialiasing, Antialiasing::Auto);
    }

    #[test]
    fn overrides_are_validated() {
        let mut config = SceneConfig::default();
        let args = RunArgs {
            size: Some(WindowSize {
                width: 640,
                height: 480,
            }),
            max_pixel_ratio: Some(3.0),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert_eq!(config.renderer.max_pixel_ratio, 3.0);

        let bad = RunArgs {
            max_pixel_ratio: Some(0.5),
            ..RunArgs::default()
        };
        assert!(apply_overrides(&mut config, &bad).is_err());
    }

    #[test]
    fn missing_default_config_uses_built_in_scene() {
        let root = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let loaded = load_scene(&paths, None).unwrap();
        assert_eq!(loaded.source, ConfigSource::BuiltIn);
        assert_eq!(loaded.config.scroll.sections.len(), 3);
        assert_eq!(
            loaded.config.textures,
            vec![
                root.path().join("images/11.webp"),
                root.path().join("images/12.webp"),
                root.path().join("images/17.webp"),
            ]
        );
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let missing = root.path().join("nope.toml");
        assert!(load_scene(&paths, Some(&missing)).is_err());
    }
}
