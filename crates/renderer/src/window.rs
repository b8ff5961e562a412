use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::compile::load_sources;
use crate::gpu::{GpuOptions, GpuState};
use crate::loader::{spawn_texture_loads, TextureEvent, TextureSink};
use crate::runtime::ResizeDebouncer;
use crate::scene::SceneState;
use crate::types::{RendererConfig, SurfaceAlpha};

/// Logical pixels moved by the arrow keys.
const ARROW_SCROLL: f32 = 40.0;

#[derive(Debug)]
pub(crate) enum UserEvent {
    Texture(TextureEvent),
}

impl TextureSink for EventLoopProxy<UserEvent> {
    fn deliver(&self, event: TextureEvent) -> bool {
        self.send_event(UserEvent::Texture(event)).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingResize {
    logical: LogicalSize<f64>,
    scale_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScrollCommand {
    By(f32),
    Pages(f32),
    Home,
    End,
}

/// Maps a pressed key to a page scroll, mirroring browser defaults.
fn scroll_command(key: &Key, modifiers: ModifiersState) -> Option<ScrollCommand> {
    let command = match key {
        Key::Named(NamedKey::ArrowDown) => ScrollCommand::By(ARROW_SCROLL),
        Key::Named(NamedKey::ArrowUp) => ScrollCommand::By(-ARROW_SCROLL),
        Key::Named(NamedKey::PageDown) => ScrollCommand::Pages(1.0),
        Key::Named(NamedKey::PageUp) => ScrollCommand::Pages(-1.0),
        Key::Named(NamedKey::Space) if modifiers.shift_key() => ScrollCommand::Pages(-1.0),
        Key::Named(NamedKey::Space) => ScrollCommand::Pages(1.0),
        Key::Named(NamedKey::Home) => ScrollCommand::Home,
        Key::Named(NamedKey::End) => ScrollCommand::End,
        _ => return None,
    };
    Some(command)
}

/// Owns the window, its GPU resources, and the scene driven by input.
pub(crate) struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    scene: SceneState,
    resize: ResizeDebouncer<PendingResize>,
    modifiers: ModifiersState,
    section: Option<usize>,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let (vertex_source, fragment_source) = load_sources(&config.shaders)?;

        let size = window.inner_size();
        let scale_factor = window.scale_factor();
        let scene = SceneState::new(
            &config.camera,
            &config.scroll,
            size.to_logical(scale_factor),
            scale_factor,
            config.max_pixel_ratio,
            Instant::now(),
        )?;

        let gpu = GpuState::new(
            window.as_ref(),
            GpuOptions {
                surface_size: size,
                canvas_size: scene.viewport().drawing_buffer(),
                antialiasing: config.antialiasing,
                surface_alpha: config.surface_alpha,
                vsync: config.vsync,
                clear_color: config.clear_color,
                vertex_source: &vertex_source,
                fragment_source: &fragment_source,
                uniforms: scene.uniforms(),
            },
        )?;

        Ok(Self {
            window,
            gpu,
            section: scene.active_section(),
            scene,
            resize: ResizeDebouncer::new(config.scroll.resize_debounce),
            modifiers: ModifiersState::empty(),
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn schedule_resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        self.gpu.resize_surface(size);
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.resize.schedule(
            PendingResize {
                logical: size.to_logical(scale_factor),
                scale_factor,
            },
            Instant::now(),
        );
    }

    fn apply_pending_resize(&mut self, now: Instant) -> bool {
        let Some(pending) = self.resize.poll(now) else {
            return false;
        };
        let outcome = self.scene.resize(pending.logical, pending.scale_factor);
        self.gpu.resize_canvas(outcome.drawing_buffer);
        info!(
            width = pending.logical.width,
            height = pending.logical.height,
            pixel_ratio = self.scene.viewport().pixel_ratio(),
            canvas_width = self.gpu.canvas_size().width,
            canvas_height = self.gpu.canvas_size().height,
            aspect = outcome.aspect,
            "viewport resized"
        );
        true
    }

    fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        // winit reports positive y when scrolling up/away from the user
        match delta {
            MouseScrollDelta::LineDelta(_, lines) => {
                self.scene.scroll_lines(-lines);
            }
            MouseScrollDelta::PixelDelta(position) => {
                let logical = position.to_logical::<f64>(self.window.scale_factor());
                self.scene.scroll_by(-(logical.y as f32));
            }
        }
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(command) = scroll_command(&event.logical_key, self.modifiers) else {
            return;
        };
        match command {
            ScrollCommand::By(delta) => self.scene.scroll_by(delta),
            ScrollCommand::Pages(pages) => self.scene.scroll_pages(pages),
            ScrollCommand::Home => self.scene.scroll_home(),
            ScrollCommand::End => self.scene.scroll_end(),
        };
    }

    fn handle_texture(&mut self, event: TextureEvent) {
        match event {
            TextureEvent::Loaded { slot, path, image } => {
                match self.gpu.install_texture(slot, &image) {
                    Ok(()) => {
                        self.scene.texture_loaded(slot, image.width, image.height);
                        info!(
                            slot,
                            path = %path.display(),
                            width = image.width,
                            height = image.height,
                            "texture loaded"
                        );
                    }
                    Err(err) => {
                        error!(slot, path = %path.display(), error = %format!("{err:#}"), "failed to upload texture");
                    }
                }
            }
            TextureEvent::Failed { slot, path, error } => {
                error!(
                    slot,
                    path = %path.display(),
                    error = %format!("{error:#}"),
                    "failed to load texture; keeping placeholder"
                );
            }
        }
    }

    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let progress = self.scene.advance(Instant::now());
        let section = self.scene.active_section();
        if section != self.section {
            debug!(?section, progress, offset = self.scene.scroll_offset(), "section changed");
            self.section = section;
        }
        self.gpu.render(self.scene.uniforms())
    }
}

pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(width as f64, height as f64))
        .with_transparent(config.surface_alpha == SurfaceAlpha::Transparent)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window.clone(), &config)
        .context("failed to initialise window renderer")?;

    // workers are detached; a late result after exit is dropped by the proxy
    spawn_texture_loads(&config.textures, proxy)?;

    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(UserEvent::Texture(event)) => state.handle_texture(event),
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::ModifiersChanged(modifiers) => {
                    state.modifiers = modifiers.state();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed
                        && event.logical_key == Key::Named(NamedKey::Escape)
                    {
                        elwt.exit();
                    } else {
                        state.handle_key(&event);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => state.handle_wheel(delta),
                WindowEvent::Resized(size) => {
                    let scale_factor = state.window().scale_factor();
                    state.schedule_resize(size, scale_factor);
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    let size = state.window().inner_size();
                    state.schedule_resize(size, scale_factor);
                }
                WindowEvent::RedrawRequested => match state.render_frame() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        debug!("surface lost or outdated; reconfiguring");
                        state.gpu.reconfigure_surface();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; exiting");
                        elwt.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        warn!("surface timeout; retrying next frame");
                    }
                    Err(other) => {
                        warn!(error = ?other, "surface error; retrying next frame");
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.apply_pending_resize(Instant::now());
            state.window().request_redraw();
            match state.resize.deadline() {
                Some(deadline) => elwt.set_control_flow(ControlFlow::WaitUntil(deadline)),
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
