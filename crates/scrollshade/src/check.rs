use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use renderer::{check_program, load_sources, ShaderSources, TEXTURE_SLOTS};
use sceneconfig::SceneConfig;
use scrolltrigger::{Scrub, ScrollTimeline, SectionExtent};

use crate::cli::{CheckArgs, WindowSize};
use crate::paths::{AppPaths, ConfigSource};
use crate::run::{load_scene, LoadedScene};

/// Loads and validates the scene, prints the resolved scroll plan, and fails
/// when the configuration or shaders are unusable.
pub fn run_check(paths: &AppPaths, explicit: Option<&Path>, args: &CheckArgs) -> Result<()> {
    let LoadedScene { source, config } = load_scene(paths, explicit)?;
    let size = args.size.unwrap_or(WindowSize {
        width: config.window.width,
        height: config.window.height,
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let shaders_ok = write_plan(&mut out, &source, &config, size)?;
    out.flush()?;

    if !shaders_ok {
        bail!("shader check failed");
    }
    Ok(())
}

/// Writes the plan and returns whether the shader pair compiled.
pub fn write_plan<W: Write>(
    out: &mut W,
    source: &ConfigSource,
    config: &SceneConfig,
    size: WindowSize,
) -> Result<bool> {
    writeln!(out, "Config: {}", source.describe())?;
    writeln!(out, "Viewport: {}x{} (logical)", size.width, size.height)?;

    let mut layout = config.scroll.layout()?;
    layout.relayout(size.height as f32);
    let timeline = ScrollTimeline::from_layout(&layout);

    writeln!(out, "Sections:")?;
    for (trigger, extent) in timeline.triggers().iter().zip(&config.scroll.sections) {
        writeln!(
            out,
            "  #{:<2} {:<8} top={:<7.0} height={:<7.0} trigger={:.0}..{:.0}",
            trigger.index,
            describe_extent(*extent),
            trigger.start,
            trigger.end - trigger.start,
            trigger.start,
            trigger.end
        )?;
    }
    writeln!(
        out,
        "Trailing: {} (page height {:.0}, max scroll {:.0})",
        describe_extent(config.scroll.trailing),
        layout.page_height(),
        layout.max_scroll()
    )?;

    let max_progress = timeline.max_progress();
    let reachable = timeline.progress_at(layout.max_scroll());
    writeln!(out, "Max progress: {max_progress}")?;
    if reachable + 1e-3 < max_progress {
        writeln!(
            out,
            "warning: the page ends before the last section scrolls past; progress peaks at {reachable:.2}"
        )?;
    }
    writeln!(out, "Scrub: {}", describe_scrub(config.scroll.scrub))?;

    writeln!(out, "Textures:")?;
    for slot in 0..TEXTURE_SLOTS {
        let uniform = format!("uTexture{}", slot + 1);
        match config.textures.get(slot) {
            Some(path) => {
                let status = if path.is_file() { "present" } else { "missing" };
                writeln!(out, "  {uniform:<10} {status:<8} {}", path.display())?;
            }
            None => writeln!(out, "  {uniform:<10} unset    (transparent placeholder)")?,
        }
    }

    writeln!(out, "Shaders:")?;
    writeln!(out, "  vertex     {}", describe_shader(config.vertex_shader()))?;
    writeln!(out, "  fragment   {}", describe_shader(config.fragment_shader()))?;

    let sources = ShaderSources {
        vertex: config.vertex_shader().map(Path::to_path_buf),
        fragment: config.fragment_shader().map(Path::to_path_buf),
    };
    let result = load_sources(&sources)
        .and_then(|(vertex, fragment)| check_program(&vertex, &fragment));
    match result {
        Ok(program) => {
            writeln!(out, "  status     ok ({} varyings)", program.varyings.len())?;
            Ok(true)
        }
        Err(err) => {
            writeln!(out, "  status     error: {err:#}")?;
            Ok(false)
        }
    }
}

fn describe_extent(extent: SectionExtent) -> String {
    match extent {
        SectionExtent::Viewport(factor) => format!("{}vh", factor * 100.0),
        SectionExtent::Pixels(pixels) => format!("{pixels}px"),
    }
}

fn describe_scrub(scrub: Scrub) -> String {
    match scrub {
        Scrub::Linked => "linked".to_string(),
        Scrub::Smoothed(lag) => format!("smoothed over {}", humantime::format_duration(lag)),
    }
}

fn describe_shader(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "built-in".to_string(),
    }
}
