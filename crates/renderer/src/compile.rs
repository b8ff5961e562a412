use std::borrow::Cow;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use wgpu::naga::front::glsl;
use wgpu::naga::ShaderStage;

use crate::types::ShaderSources;

/// Built-in plane vertex shader (pass-through `vUv`).
pub const DEFAULT_VERTEX_SHADER: &str = include_str!("../shaders/plane.vert");
/// Built-in fragment shader blending the three texture slots by `uProgress`.
pub const DEFAULT_FRAGMENT_SHADER: &str = include_str!("../shaders/blend.frag");

/// Uniform names provided by the prelude. Declarations of these are stripped
/// from user code.
const INJECTED_UNIFORMS: &[&str] = &[
    "projectionMatrix",
    "modelViewMatrix",
    "modelMatrix",
    "viewMatrix",
    "uResolution",
    "texResolution",
    "uTextureSize",
    "uTextureSizes",
    "uProgress",
    "uTime",
    "uTexture",
    "uTexture1",
    "uTexture2",
    "uTexture3",
];

const INJECTED_ATTRIBUTES: &[&str] = &["position", "uv", "normal"];

const PRECISION_QUALIFIERS: &[&str] = &["lowp", "mediump", "highp"];

/// Must match [`crate::gpu::SceneUniforms`] field for field.
const UNIFORM_BLOCK: &str = r"layout(std140, set = 0, binding = 0) uniform SceneUniforms {
    mat4 projection;
    mat4 model_view;
    vec2 resolution;
    vec2 tex_resolution;
    vec2 texture_size;
    float progress;
    float time;
    vec4 texture_sizes[3];
} scrollshade_scene;

layout(set = 1, binding = 0) uniform texture2D scrollshade_texture1;
layout(set = 1, binding = 1) uniform sampler scrollshade_sampler1;
layout(set = 1, binding = 2) uniform texture2D scrollshade_texture2;
layout(set = 1, binding = 3) uniform sampler scrollshade_sampler2;
layout(set = 1, binding = 4) uniform texture2D scrollshade_texture3;
layout(set = 1, binding = 5) uniform sampler scrollshade_sampler3;
layout(set = 1, binding = 6) uniform texture2D scrollshade_texture0;
layout(set = 1, binding = 7) uniform sampler scrollshade_sampler0;

#define projectionMatrix scrollshade_scene.projection
#define modelViewMatrix scrollshade_scene.model_view
#define viewMatrix scrollshade_scene.model_view
#define modelMatrix mat4(1.0)
#define uResolution scrollshade_scene.resolution
#define texResolution scrollshade_scene.tex_resolution
#define uTextureSize scrollshade_scene.texture_size
#define uTextureSizes scrollshade_scene.texture_sizes
#define uProgress scrollshade_scene.progress
#define uTime scrollshade_scene.time

#define uTexture sampler2D(scrollshade_texture0, scrollshade_sampler0)
#define uTexture1 sampler2D(scrollshade_texture1, scrollshade_sampler1)
#define uTexture2 sampler2D(scrollshade_texture2, scrollshade_sampler2)
#define uTexture3 sampler2D(scrollshade_texture3, scrollshade_sampler3)
#define texture2D texture
";

const VERTEX_PRELUDE: &str = r"layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
#define normal vec3(0.0, 0.0, 1.0)
";

const FRAGMENT_PRELUDE: &str = r"layout(location = 0) out vec4 scrollshade_FragColor;
#define gl_FragColor scrollshade_FragColor
";

/// A vertex/fragment pair rewritten into Vulkan-flavoured GLSL 450.
#[derive(Debug, Clone)]
pub struct WrappedProgram {
    pub vertex: String,
    pub fragment: String,
    /// Varying names in location order.
    pub varyings: Vec<String>,
}

/// Reads the configured shader files, falling back to the built-in pair.
pub fn load_sources(sources: &ShaderSources) -> Result<(String, String)> {
    let vertex = match &sources.vertex {
        Some(path) => read_shader(path)?,
        None => DEFAULT_VERTEX_SHADER.to_owned(),
    };
    let fragment = match &sources.fragment {
        Some(path) => read_shader(path)?,
        None => DEFAULT_FRAGMENT_SHADER.to_owned(),
    };
    Ok((vertex, fragment))
}

fn read_shader(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read shader at {}", path.display()))
}

/// Wraps both stages and runs them through the naga GLSL frontend, without
/// touching a GPU.
pub fn check_program(vertex: &str, fragment: &str) -> Result<WrappedProgram> {
    let program = wrap_program(vertex, fragment)?;
    parse_glsl(&program.vertex, ShaderStage::Vertex).context("vertex shader")?;
    parse_glsl(&program.fragment, ShaderStage::Fragment).context("fragment shader")?;
    Ok(program)
}

/// Compiles a program into vertex and fragment modules.
///
/// naga parses the wrapped source first so that syntax errors surface as
/// regular errors instead of a device validation panic.
pub(crate) fn compile_program(
    device: &wgpu::Device,
    vertex: &str,
    fragment: &str,
) -> Result<(wgpu::ShaderModule, wgpu::ShaderModule)> {
    let program = check_program(vertex, fragment)?;
    tracing::debug!(varyings = ?program.varyings, "wrapped shader program");
    tracing::trace!(source = %program.fragment, "wrapped fragment shader");

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scrollshade vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(program.vertex),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scrollshade fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(program.fragment),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    Ok((vertex_module, fragment_module))
}

fn parse_glsl(source: &str, stage: ShaderStage) -> Result<wgpu::naga::Module> {
    let mut frontend = glsl::Frontend::default();
    frontend
        .parse(&glsl::Options::from(stage), source)
        .map_err(|err| anyhow!("GLSL parse failed: {err:?}"))
}

/// Rewrites a three.js `ShaderMaterial` style pair.
///
/// 1. `#version` and `precision` lines are blanked so line numbers survive.
/// 2. Declarations of prelude-provided uniforms and attributes are blanked;
///    any other loose uniform is an error since it has no binding.
/// 3. `varying` declarations become `out` (vertex) and `in` (fragment) with
///    locations taken from the vertex shader's declaration order.
pub fn wrap_program(vertex: &str, fragment: &str) -> Result<WrappedProgram> {
    let mut varyings = Varyings::default();
    let vertex_body = sanitize(vertex, ShaderStage::Vertex, &mut varyings)?;
    let fragment_body = sanitize(fragment, ShaderStage::Fragment, &mut varyings)?;

    Ok(WrappedProgram {
        vertex: format!("#version 450\n{UNIFORM_BLOCK}{VERTEX_PRELUDE}#line 1\n{vertex_body}"),
        fragment: format!(
            "#version 450\n{UNIFORM_BLOCK}{FRAGMENT_PRELUDE}#line 1\n{fragment_body}"
        ),
        varyings: varyings.names(),
    })
}

#[derive(Debug, Default)]
struct Varyings {
    /// (name, first location, location count)
    entries: Vec<(String, u32, u32)>,
    next_location: u32,
}

impl Varyings {
    fn declare(&mut self, name: &str, count: u32) -> u32 {
        let location = self.next_location;
        self.entries.push((name.to_owned(), location, count));
        self.next_location += count;
        location
    }

    fn location(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(existing, _, _)| existing == name)
            .map(|(_, location, _)| *location)
    }

    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _, _)| name.clone()).collect()
    }
}

/// A loose `uniform`/`attribute`/`varying` declaration.
struct Declaration<'a> {
    qualifier: &'a str,
    ty: &'a str,
    declarators: Vec<&'a str>,
}

impl<'a> Declaration<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim();
        let qualifier = ["uniform", "attribute", "varying"]
            .into_iter()
            .find(|keyword| {
                trimmed
                    .strip_prefix(keyword)
                    .is_some_and(|rest| rest.starts_with(char::is_whitespace))
            })?;
        let body = trimmed[qualifier.len()..].split(';').next()?;
        if body.contains('{') {
            return None;
        }
        let mut tokens = body
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .filter(|token| !PRECISION_QUALIFIERS.contains(token));
        let ty = tokens.next()?;
        let declarators: Vec<&str> = tokens.collect();
        if declarators.is_empty() {
            return None;
        }
        Some(Self {
            qualifier,
            ty,
            declarators,
        })
    }
}

fn declarator_name(declarator: &str) -> &str {
    declarator.split('[').next().unwrap_or(declarator).trim()
}

fn declarator_count(declarator: &str) -> u32 {
    declarator
        .split_once('[')
        .and_then(|(_, rest)| rest.split(']').next())
        .and_then(|size| size.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

fn sanitize(source: &str, stage: ShaderStage, varyings: &mut Varyings) -> Result<String> {
    let mut out = String::with_capacity(source.len() + 64);
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
            out.push('\n');
            continue;
        }

        let Some(declaration) = Declaration::parse(line) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };

        match declaration.qualifier {
            "uniform" => {
                for declarator in &declaration.declarators {
                    let name = declarator_name(declarator);
                    if !INJECTED_UNIFORMS.contains(&name) {
                        bail!(
                            "{stage:?} shader line {line_number}: uniform `{name}` is not provided by the renderer"
                        );
                    }
                }
            }
            "attribute" => {
                if stage != ShaderStage::Vertex {
                    bail!("{stage:?} shader line {line_number}: attributes are vertex-only");
                }
                for declarator in &declaration.declarators {
                    let name = declarator_name(declarator);
                    if !INJECTED_ATTRIBUTES.contains(&name) {
                        bail!(
                            "vertex shader line {line_number}: attribute `{name}` is not provided by the plane geometry"
                        );
                    }
                }
            }
            _ => {
                for declarator in &declaration.declarators {
                    let name = declarator_name(declarator);
                    let (direction, location) = match stage {
                        ShaderStage::Fragment => {
                            let location = varyings.location(name).ok_or_else(|| {
                                anyhow!(
                                    "fragment shader line {line_number}: varying `{name}` is not written by the vertex shader"
                                )
                            })?;
                            ("in", location)
                        }
                        _ => ("out", varyings.declare(name, declarator_count(declarator))),
                    };
                    out.push_str(&format!(
                        "layout(location = {location}) {direction} {ty} {declarator}; ",
                        ty = declaration.ty
                    ));
                }
            }
        }
        out.push('\n');
    }
    Ok(out)
}
