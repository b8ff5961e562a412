//! Offscreen canvas at drawing-buffer resolution and the pass that scales it
//! onto the swapchain.
//!
//! The scene never renders straight into the surface: the canvas is sized
//! `logical size * capped pixel ratio`, so on a 3x display with a cap of 2 the
//! canvas is smaller than the surface and the blit upsamples it.

use std::borrow::Cow;

use wgpu::naga::ShaderStage;
use winit::dpi::PhysicalSize;

/// Full-screen triangle; `v_uv` has (0, 0) at the top-left of the canvas.
const BLIT_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const BLIT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D canvas_texture;
layout(set = 0, binding = 1) uniform sampler canvas_sampler;

void main() {
    out_color = texture(sampler2D(canvas_texture, canvas_sampler), v_uv);
}
";

pub(crate) struct Canvas {
    pub size: PhysicalSize<u32>,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
}

impl Canvas {
    pub(crate) fn new(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        sample_count: u32,
        max_dimension: u32,
    ) -> Self {
        let size = clamp_size(size, max_dimension);
        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("canvas texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("canvas msaa target"),
                    size: extent,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        tracing::debug!(
            width = size.width,
            height = size.height,
            sample_count,
            "allocated canvas"
        );

        Self {
            size,
            format,
            sample_count,
            _texture: texture,
            view,
            msaa_view,
        }
    }

    /// Colour attachment for the scene pass: the MSAA target resolving into
    /// the canvas, or the canvas itself.
    pub(crate) fn color_attachment(
        &self,
        clear: wgpu::Color,
    ) -> wgpu::RenderPassColorAttachment<'_> {
        let ops = wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        };
        match &self.msaa_view {
            Some(msaa_view) => wgpu::RenderPassColorAttachment {
                view: msaa_view,
                depth_slice: None,
                resolve_target: Some(&self.view),
                ops: wgpu::Operations {
                    store: wgpu::StoreOp::Discard,
                    ..ops
                },
            },
            None => wgpu::RenderPassColorAttachment {
                view: &self.view,
                depth_slice: None,
                resolve_target: None,
                ops,
            },
        }
    }
}

fn clamp_size(size: PhysicalSize<u32>, max_dimension: u32) -> PhysicalSize<u32> {
    let max_dimension = max_dimension.max(1);
    let clamped = PhysicalSize::new(
        size.width.clamp(1, max_dimension),
        size.height.clamp(1, max_dimension),
    );
    if clamped != size {
        tracing::warn!(
            requested_width = size.width,
            requested_height = size.height,
            max_dimension,
            "canvas exceeds GPU limits; clamping"
        );
    }
    clamped
}

/// Presents the canvas on the surface with linear filtering.
pub(crate) struct BlitPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
}

impl BlitPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        canvas: &Canvas,
    ) -> Self {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("canvas blit vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(BLIT_VERTEX_GLSL),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("canvas blit fragment"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(BLIT_FRAGMENT_GLSL),
                stage: ShaderStage::Fragment,
                defines: &[],
            },
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("canvas blit layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("canvas blit pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("canvas blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("canvas blit sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = create_bind_group(device, &layout, &sampler, canvas);

        Self {
            pipeline,
            layout,
            sampler,
            bind_group,
        }
    }

    /// Re-points the blit at a reallocated canvas.
    pub(crate) fn rebind(&mut self, device: &wgpu::Device, canvas: &Canvas) {
        self.bind_group = create_bind_group(device, &self.layout, &self.sampler, canvas);
    }

    pub(crate) fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("canvas blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    canvas: &Canvas,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("canvas blit bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&canvas.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_canvases_are_clamped() {
        assert_eq!(
            clamp_size(PhysicalSize::new(9000, 0), 8192),
            PhysicalSize::new(8192, 1)
        );
        assert_eq!(
            clamp_size(PhysicalSize::new(1600, 1200), 8192),
            PhysicalSize::new(1600, 1200)
        );
    }

    #[test]
    fn blit_shaders_parse() {
        use wgpu::naga::front::glsl;
        let mut frontend = glsl::Frontend::default();
        frontend
            .parse(&glsl::Options::from(ShaderStage::Vertex), BLIT_VERTEX_GLSL)
            .unwrap();
        frontend
            .parse(&glsl::Options::from(ShaderStage::Fragment), BLIT_FRAGMENT_GLSL)
            .unwrap();
    }
}
