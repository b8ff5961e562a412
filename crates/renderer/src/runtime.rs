use std::time::{Duration, Instant};

use winit::dpi::{LogicalSize, PhysicalSize};

/// Window geometry as seen by the scene: logical size plus the effective pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    logical: LogicalSize<f64>,
    pixel_ratio: f64,
}

impl Viewport {
    /// Builds a viewport whose pixel ratio is the device scale factor capped at `max_pixel_ratio`.
    pub fn new(logical: LogicalSize<f64>, scale_factor: f64, max_pixel_ratio: f64) -> Self {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        Self {
            logical: LogicalSize::new(logical.width.max(1.0), logical.height.max(1.0)),
            pixel_ratio: scale_factor.min(max_pixel_ratio.max(1.0)),
        }
    }

    pub fn from_physical(
        physical: PhysicalSize<u32>,
        scale_factor: f64,
        max_pixel_ratio: f64,
    ) -> Self {
        Self::new(physical.to_logical(scale_factor), scale_factor, max_pixel_ratio)
    }

    pub fn logical(&self) -> LogicalSize<f64> {
        self.logical
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn aspect(&self) -> f32 {
        (self.logical.width / self.logical.height) as f32
    }

    /// Size of the offscreen canvas in physical pixels.
    pub fn drawing_buffer(&self) -> PhysicalSize<u32> {
        let width = (self.logical.width * self.pixel_ratio).round().max(1.0) as u32;
        let height = (self.logical.height * self.pixel_ratio).round().max(1.0) as u32;
        PhysicalSize::new(width, height)
    }
}

/// Collapses bursts of resize notifications into a single update.
///
/// Every call to [`ResizeDebouncer::schedule`] replaces the pending size and
/// restarts the quiet period.
#[derive(Debug, Clone)]
pub struct ResizeDebouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> ResizeDebouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// A delay that overflows `Instant` makes the value due immediately.
    pub fn schedule(&mut self, value: T, now: Instant) {
        let deadline = now.checked_add(self.delay).unwrap_or(now);
        self.pending = Some((value, deadline));
    }

    /// Returns the latest scheduled value once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::new(LogicalSize::new(800.0, 600.0), 3.0, 2.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        assert_eq!(viewport.drawing_buffer(), PhysicalSize::new(1600, 1200));

        let low_dpi = Viewport::new(LogicalSize::new(800.0, 600.0), 1.25, 2.0);
        assert_eq!(low_dpi.drawing_buffer(), PhysicalSize::new(1000, 750));
    }

    #[test]
    fn aspect_is_width_over_height() {
        let viewport = Viewport::from_physical(PhysicalSize::new(2560, 1440), 2.0, 2.0);
        assert_eq!(viewport.logical(), LogicalSize::new(1280.0, 720.0));
        assert!((viewport.aspect() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_sizes_stay_renderable() {
        let viewport = Viewport::new(LogicalSize::new(0.0, 0.0), 0.0, 2.0);
        assert_eq!(viewport.pixel_ratio(), 1.0);
        assert_eq!(viewport.drawing_buffer(), PhysicalSize::new(1, 1));
    }

    #[test]
    fn debouncer_fires_once_with_latest_value() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(100));
        debouncer.schedule(1, start);
        debouncer.schedule(2, start + Duration::from_millis(60));
        assert_eq!(debouncer.poll(start + Duration::from_millis(120)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(160))
        );
        assert_eq!(debouncer.poll(start + Duration::from_millis(160)), Some(2));
        assert_eq!(debouncer.poll(start + Duration::from_millis(500)), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn overflowing_delay_fires_on_next_poll() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(Duration::MAX);
        debouncer.schedule("late", start);
        assert_eq!(debouncer.deadline(), Some(start));
        assert_eq!(debouncer.poll(start), Some("late"));
    }
}
