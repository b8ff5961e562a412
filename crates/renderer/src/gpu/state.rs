use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::loader::DecodedImage;
use crate::types::{Antialiasing, ClearColor, SurfaceAlpha};

use super::canvas::{BlitPass, Canvas};
use super::context::GpuContext;
use super::pipeline::{uniform_layout, PlaneMesh, ScenePipeline};
use super::textures::SlotTextures;
use super::uniforms::SceneUniforms;

/// Startup parameters for [`GpuState::new`].
pub(crate) struct GpuOptions<'a> {
    pub surface_size: PhysicalSize<u32>,
    pub canvas_size: PhysicalSize<u32>,
    pub antialiasing: Antialiasing,
    pub surface_alpha: SurfaceAlpha,
    pub vsync: bool,
    pub clear_color: ClearColor,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub uniforms: &'a SceneUniforms,
}

/// Everything needed to draw one frame: swapchain, canvas, plane, material.
pub(crate) struct GpuState {
    context: GpuContext,
    canvas: Canvas,
    blit: BlitPass,
    mesh: PlaneMesh,
    pipeline: ScenePipeline,
    textures: SlotTextures,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    clear_color: wgpu::Color,
}

impl GpuState {
    pub(crate) fn new<T>(target: &T, options: GpuOptions<'_>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(
            target,
            options.surface_size,
            options.antialiasing,
            options.surface_alpha,
            options.vsync,
        )?;
        let device = &context.device;

        let canvas = Canvas::new(
            device,
            options.canvas_size,
            context.surface_format,
            context.sample_count,
            context.max_texture_dimension,
        );
        let blit = BlitPass::new(device, context.surface_format, &canvas);
        let mesh = PlaneMesh::new(device);
        let textures = SlotTextures::new(device, &context.queue);

        let uniform_layout = uniform_layout(device);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene uniforms"),
            contents: bytemuck::bytes_of(options.uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline = ScenePipeline::new(
            device,
            &uniform_layout,
            textures.layout(),
            canvas.format,
            canvas.sample_count,
            options.vertex_source,
            options.fragment_source,
        )?;

        info!(
            surface_width = context.size.width,
            surface_height = context.size.height,
            canvas_width = canvas.size.width,
            canvas_height = canvas.size.height,
            sample_count = canvas.sample_count,
            "renderer ready"
        );

        Ok(Self {
            context,
            canvas,
            blit,
            mesh,
            pipeline,
            textures,
            uniform_buffer,
            uniform_bind_group,
            clear_color: options.clear_color.into(),
        })
    }

    pub(crate) fn canvas_size(&self) -> PhysicalSize<u32> {
        self.canvas.size
    }

    /// Follows the window immediately so presentation never stretches a stale swapchain.
    pub(crate) fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    pub(crate) fn reconfigure_surface(&mut self) {
        self.context.reconfigure();
    }

    /// Reallocates the drawing buffer; a no-op when the size is unchanged.
    pub(crate) fn resize_canvas(&mut self, size: PhysicalSize<u32>) {
        if size == self.canvas.size {
            return;
        }
        self.canvas = Canvas::new(
            &self.context.device,
            size,
            self.canvas.format,
            self.canvas.sample_count,
            self.context.max_texture_dimension,
        );
        self.blit.rebind(&self.context.device, &self.canvas);
        debug!(
            width = self.canvas.size.width,
            height = self.canvas.size.height,
            "canvas resized"
        );
    }

    pub(crate) fn install_texture(&mut self, slot: usize, image: &DecodedImage) -> Result<()> {
        let replacing = self.textures.is_loaded(slot);
        self.textures.install(
            &self.context.device,
            &self.context.queue,
            slot,
            image,
            self.context.max_texture_dimension,
        )?;
        debug!(
            slot,
            size = ?self.textures.size(slot),
            replacing,
            "texture uploaded"
        );
        Ok(())
    }

    pub(crate) fn render(&mut self, uniforms: &SceneUniforms) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(self.canvas.color_attachment(self.clear_color))],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, self.textures.bind_group(), &[]);
            pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..self.mesh.index_count, 0, 0..1);
        }

        self.blit.draw(&mut encoder, &view);

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
