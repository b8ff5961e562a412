//! CPU-side scene state: camera, viewport, scroll timeline, and the uniform bag.
//!
//! Everything here is independent of the GPU so the window loop can mutate it
//! from input events and hand a finished [`SceneUniforms`] to the renderer
//! once per frame.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use scrolltrigger::{ScrollPosition, ScrollTimeline, ScrubState, SectionLayout};
use winit::dpi::{LogicalSize, PhysicalSize};

use crate::camera::PerspectiveCamera;
use crate::gpu::SceneUniforms;
use crate::runtime::Viewport;
use crate::types::{CameraSettings, ScrollSettings};

/// Fraction of the viewport moved by page-wise scrolling.
const PAGE_SCROLL_FRACTION: f32 = 0.875;

/// Result of applying a resize to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOutcome {
    pub drawing_buffer: PhysicalSize<u32>,
    pub aspect: f32,
}

pub struct SceneState {
    camera: PerspectiveCamera,
    viewport: Viewport,
    max_pixel_ratio: f64,
    layout: SectionLayout,
    timeline: ScrollTimeline,
    scroll: ScrollPosition,
    scrub: ScrubState,
    line_height: f32,
    uniforms: SceneUniforms,
    started: Instant,
    last_advance: Option<Instant>,
}

impl SceneState {
    pub fn new(
        camera: &CameraSettings,
        scroll: &ScrollSettings,
        logical: LogicalSize<f64>,
        scale_factor: f64,
        max_pixel_ratio: f64,
        now: Instant,
    ) -> Result<Self> {
        let layout = SectionLayout::new(scroll.sections.clone(), scroll.trailing)
            .context("invalid section layout")?;
        let viewport = Viewport::new(logical, scale_factor, max_pixel_ratio);
        let camera = PerspectiveCamera::new(camera, viewport.aspect());
        let logical = viewport.logical();
        let mut state = Self {
            camera,
            viewport,
            max_pixel_ratio,
            timeline: ScrollTimeline::from_layout(&layout),
            layout,
            scroll: ScrollPosition::default(),
            scrub: ScrubState::new(scroll.scrub, 0.0),
            line_height: scroll.line_height,
            uniforms: SceneUniforms::new(logical.width as f32, logical.height as f32),
            started: now,
            last_advance: None,
        };
        state.apply_viewport(viewport);
        Ok(state)
    }

    /// Applies a new window geometry to every resize-linked field at once:
    /// camera aspect and projection, drawing buffer, `uResolution`, and the
    /// section layout.
    pub fn resize(&mut self, logical: LogicalSize<f64>, scale_factor: f64) -> ResizeOutcome {
        let viewport = Viewport::new(logical, scale_factor, self.max_pixel_ratio);
        self.apply_viewport(viewport);
        ResizeOutcome {
            drawing_buffer: viewport.drawing_buffer(),
            aspect: viewport.aspect(),
        }
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        self.camera.update_projection();

        let logical = viewport.logical();
        self.uniforms
            .set_resolution(logical.width as f32, logical.height as f32);
        self.uniforms
            .set_matrices(self.camera.projection_matrix(), self.camera.view_matrix());

        self.layout.relayout(logical.height as f32);
        self.timeline = ScrollTimeline::from_layout(&self.layout);
        self.scroll.set_max(self.layout.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: f32) -> bool {
        self.scroll.scroll_by(delta)
    }

    /// Wheel lines; positive values scroll toward the end of the page.
    pub fn scroll_lines(&mut self, lines: f32) -> bool {
        self.scroll.scroll_by(lines * self.line_height)
    }

    /// Page-wise scrolling; positive values scroll toward the end of the page.
    pub fn scroll_pages(&mut self, pages: f32) -> bool {
        let page = self.viewport.logical().height as f32 * PAGE_SCROLL_FRACTION;
        self.scroll.scroll_by(pages * page)
    }

    pub fn scroll_home(&mut self) -> bool {
        self.scroll.scroll_to(0.0)
    }

    pub fn scroll_end(&mut self) -> bool {
        self.scroll.scroll_to_end()
    }

    /// Steps the scrub toward the scroll-derived target and refreshes the
    /// per-frame uniforms. Returns the new `uProgress`.
    pub fn advance(&mut self, now: Instant) -> f32 {
        let dt = self
            .last_advance
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_advance = Some(now);

        let target = self.timeline.progress_at(self.scroll.offset());
        let progress = self.scrub.advance(target, dt);
        self.uniforms.set_progress(progress);
        self.uniforms
            .set_time(now.saturating_duration_since(self.started).as_secs_f32());
        progress
    }

    pub fn texture_loaded(&mut self, slot: usize, width: u32, height: u32) {
        self.uniforms.record_texture_size(slot, width, height);
    }

    pub fn uniforms(&self) -> &SceneUniforms {
        &self.uniforms
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn timeline(&self) -> &ScrollTimeline {
        &self.timeline
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll.offset()
    }

    pub fn max_scroll(&self) -> f32 {
        self.scroll.max()
    }

    pub fn active_section(&self) -> Option<usize> {
        self.timeline.active_section(self.scroll.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrolltrigger::{Scrub, SectionExtent};

    fn scene(width: f64, height: f64, scale: f64) -> SceneState {
        SceneState::new(
            &CameraSettings::default(),
            &ScrollSettings::default(),
            LogicalSize::new(width, height),
            scale,
            2.0,
            Instant::now(),
        )
        .expect("scene")
    }

    #[test]
    fn uniforms_exist_before_first_frame() {
        let state = scene(1280.0, 720.0, 1.0);
        let uniforms = state.uniforms();
        assert_eq!(uniforms.resolution, [1280.0, 720.0]);
        assert_eq!(uniforms.progress, 0.0);
        assert_eq!(
            uniforms.projection,
            state.camera().projection_matrix().to_cols_array_2d()
        );
    }

    #[test]
    fn resize_updates_linked_fields_together() {
        let mut state = scene(1280.0, 720.0, 1.0);
        let before = state.uniforms().projection;
        let outcome = state.resize(LogicalSize::new(600.0, 800.0), 3.0);

        assert!((outcome.aspect - 600.0 / 800.0).abs() < 1e-6);
        assert!((state.camera().aspect() - 0.75).abs() < 1e-6);
        assert_eq!(outcome.drawing_buffer, PhysicalSize::new(1200, 1600));
        assert_eq!(state.uniforms().resolution, [600.0, 800.0]);
        assert_ne!(state.uniforms().projection, before);
        assert_eq!(
            state.uniforms().projection,
            state.camera().projection_matrix().to_cols_array_2d()
        );
        assert_eq!(state.max_scroll(), 800.0 * 3.0);
    }

    #[test]
    fn forward_scroll_drives_progress_to_section_count() {
        let mut state = scene(1000.0, 500.0, 1.0);
        let start = Instant::now();
        let mut last = state.advance(start);
        let mut frame = 0;
        while state.scroll_lines(0.5) {
            frame += 1;
            let progress = state.advance(start + Duration::from_millis(16 * frame));
            assert!(progress >= last);
            assert!((0.0..=3.0).contains(&progress));
            last = progress;
        }
        assert_eq!(last, 3.0);
        assert_eq!(state.uniforms().progress, 3.0);
    }

    #[test]
    fn keyboard_style_scrolling_moves_by_pages() {
        let mut state = scene(1000.0, 800.0, 1.0);
        assert!(state.scroll_pages(1.0));
        assert_eq!(state.scroll_offset(), 700.0);
        assert!(state.scroll_end());
        // the last trigger ends exactly at the bottom of the page
        assert_eq!(state.active_section(), None);
        assert!(state.scroll_home());
        assert_eq!(state.active_section(), Some(0));
    }

    #[test]
    fn shrinking_the_page_clamps_scroll() {
        let mut state = scene(1000.0, 800.0, 1.0);
        state.scroll_end();
        assert_eq!(state.scroll_offset(), 2400.0);
        state.resize(LogicalSize::new(1000.0, 400.0), 1.0);
        assert_eq!(state.scroll_offset(), 1200.0);
    }

    #[test]
    fn smoothed_scrub_lags_the_scroll() {
        let scroll = ScrollSettings {
            sections: vec![SectionExtent::Pixels(100.0)],
            trailing: SectionExtent::Pixels(100.0),
            scrub: Scrub::Smoothed(Duration::from_secs(1)),
            ..ScrollSettings::default()
        };
        let start = Instant::now();
        let mut state = SceneState::new(
            &CameraSettings::default(),
            &scroll,
            LogicalSize::new(100.0, 100.0),
            1.0,
            2.0,
            start,
        )
        .unwrap();
        state.advance(start);
        state.scroll_end();
        let progress = state.advance(start + Duration::from_millis(16));
        assert!(progress > 0.0 && progress < 1.0);
    }

    #[test]
    fn texture_sizes_are_tracked_per_slot() {
        let mut state = scene(800.0, 600.0, 1.0);
        state.texture_loaded(1, 512, 256);
        state.texture_loaded(0, 64, 64);
        assert_eq!(state.uniforms().texture_size, [64.0, 64.0]);
        assert_eq!(state.uniforms().texture_sizes[1][..2], [512.0, 256.0]);
    }
}
