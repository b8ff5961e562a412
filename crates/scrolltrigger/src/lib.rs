//! Scroll-linked progress for a vertically stacked page of sections.
//!
//! Every section owns a trigger that starts when its top edge reaches the top
//! of the viewport and ends when its bottom edge does. The timeline adds the
//! clamped progress of each trigger, so scrolling through section `i` yields a
//! value of `i + local_progress` and the full page spans `[0, N]`.
//!
//! ```text
//!   page offset 0 ──┬── section 0 ──┬── section 1 ──┬── … ──┬── trailing ──┐
//!                   start0       end0/start1      end1                    page end
//!   progress        0 ───────────── 1 ───────────── 2 ───── N
//! ```

mod scrub;

pub use scrub::{Scrub, ScrubState};

/// Errors raised while building a section layout.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimelineError {
    #[error("a scroll timeline needs at least one section")]
    Empty,
    #[error("section {index} has an invalid extent ({value}); extents must be finite and positive")]
    InvalidExtent { index: usize, value: f32 },
    #[error("trailing space must be finite and non-negative (got {0})")]
    InvalidTrailing(f32),
}

/// Height of a page region, either relative to the viewport or absolute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionExtent {
    /// Multiple of the viewport height (`1.0` = `100vh`).
    Viewport(f32),
    /// Logical pixels.
    Pixels(f32),
}

impl SectionExtent {
    /// Resolves the extent against the current viewport height.
    pub fn resolve(self, viewport_height: f32) -> f32 {
        match self {
            SectionExtent::Viewport(factor) => factor * viewport_height,
            SectionExtent::Pixels(pixels) => pixels,
        }
    }

    fn raw(self) -> f32 {
        match self {
            SectionExtent::Viewport(value) | SectionExtent::Pixels(value) => value,
        }
    }

    /// Parses `100vh`, `640px`, or a bare number of pixels.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("section extent must not be empty".into());
        }
        let lower = trimmed.to_ascii_lowercase();
        let parse_number = |raw: &str| {
            raw.trim().parse::<f32>().map_err(|_| {
                format!("invalid section extent '{trimmed}'; expected e.g. 100vh or 640px")
            })
        };
        if let Some(rest) = lower.strip_suffix("vh") {
            Ok(SectionExtent::Viewport(parse_number(rest)? / 100.0))
        } else if let Some(rest) = lower.strip_suffix("px") {
            Ok(SectionExtent::Pixels(parse_number(rest)?))
        } else {
            Ok(SectionExtent::Pixels(parse_number(&lower)?))
        }
    }
}

/// Resolved position of a single section on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionBounds {
    pub top: f32,
    pub height: f32,
}

impl SectionBounds {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Ordered stack of sections followed by optional trailing space.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionLayout {
    extents: Vec<SectionExtent>,
    trailing: SectionExtent,
    viewport_height: f32,
    bounds: Vec<SectionBounds>,
    page_height: f32,
}

impl SectionLayout {
    pub fn new(extents: Vec<SectionExtent>, trailing: SectionExtent) -> Result<Self, TimelineError> {
        if extents.is_empty() {
            return Err(TimelineError::Empty);
        }
        for (index, extent) in extents.iter().enumerate() {
            let value = extent.raw();
            if !value.is_finite() || value <= 0.0 {
                return Err(TimelineError::InvalidExtent { index, value });
            }
        }
        let trailing_raw = trailing.raw();
        if !trailing_raw.is_finite() || trailing_raw < 0.0 {
            return Err(TimelineError::InvalidTrailing(trailing_raw));
        }

        let mut layout = Self {
            extents,
            trailing,
            viewport_height: 0.0,
            bounds: Vec::new(),
            page_height: 0.0,
        };
        layout.relayout(1.0);
        Ok(layout)
    }

    /// `count` sections of one viewport each, with one viewport of trailing space.
    pub fn uniform(count: usize) -> Result<Self, TimelineError> {
        Self::new(
            vec![SectionExtent::Viewport(1.0); count],
            SectionExtent::Viewport(1.0),
        )
    }

    /// Recomputes section offsets for a new viewport height.
    pub fn relayout(&mut self, viewport_height: f32) {
        let viewport_height = viewport_height.max(1.0);
        self.viewport_height = viewport_height;
        self.bounds.clear();
        let mut top = 0.0_f32;
        for extent in &self.extents {
            let height = extent.resolve(viewport_height);
            self.bounds.push(SectionBounds { top, height });
            top += height;
        }
        self.page_height = top + self.trailing.resolve(viewport_height);
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn bounds(&self) -> &[SectionBounds] {
        &self.bounds
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    /// Largest scroll offset reachable on this page.
    pub fn max_scroll(&self) -> f32 {
        (self.page_height - self.viewport_height).max(0.0)
    }
}

/// Scroll range bound to one section (`start: "top top"`, `end: "bottom top"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTrigger {
    pub index: usize,
    pub start: f32,
    pub end: f32,
}

impl ScrollTrigger {
    pub fn for_section(index: usize, bounds: SectionBounds) -> Self {
        Self {
            index,
            start: bounds.top,
            end: bounds.bottom(),
        }
    }

    /// Normalised progress of this trigger at the given scroll offset.
    pub fn progress(&self, scroll: f32) -> f32 {
        let span = self.end - self.start;
        if span <= f32::EPSILON {
            return if scroll < self.start { 0.0 } else { 1.0 };
        }
        ((scroll - self.start) / span).clamp(0.0, 1.0)
    }

    pub fn is_active(&self, scroll: f32) -> bool {
        scroll >= self.start && scroll < self.end
    }
}

/// Triggers for every section of a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTimeline {
    triggers: Vec<ScrollTrigger>,
}

impl ScrollTimeline {
    pub fn from_layout(layout: &SectionLayout) -> Self {
        let triggers = layout
            .bounds()
            .iter()
            .enumerate()
            .map(|(index, bounds)| ScrollTrigger::for_section(index, *bounds))
            .collect();
        Self { triggers }
    }

    pub fn triggers(&self) -> &[ScrollTrigger] {
        &self.triggers
    }

    /// Upper bound of [`ScrollTimeline::progress_at`].
    pub fn max_progress(&self) -> f32 {
        self.triggers.len() as f32
    }

    /// Combined progress: `index + local progress` of the section under the
    /// viewport top, holding the previous value across gaps.
    pub fn progress_at(&self, scroll: f32) -> f32 {
        self.triggers
            .iter()
            .map(|trigger| trigger.progress(scroll))
            .sum::<f32>()
            .clamp(0.0, self.max_progress())
    }

    /// Section whose trigger currently spans the viewport top, if any.
    pub fn active_section(&self, scroll: f32) -> Option<usize> {
        self.triggers
            .iter()
            .find(|trigger| trigger.is_active(scroll))
            .map(|trigger| trigger.index)
    }
}

/// Scroll offset clamped to the page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollPosition {
    offset: f32,
    max: f32,
}

impl ScrollPosition {
    pub fn new(max: f32) -> Self {
        Self {
            offset: 0.0,
            max: max.max(0.0),
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Moves by `delta` logical pixels; returns true when the offset changed.
    pub fn scroll_by(&mut self, delta: f32) -> bool {
        if !delta.is_finite() {
            return false;
        }
        self.scroll_to(self.offset + delta)
    }

    pub fn scroll_to(&mut self, offset: f32) -> bool {
        if !offset.is_finite() {
            return false;
        }
        let next = offset.clamp(0.0, self.max);
        let changed = (next - self.offset).abs() > f32::EPSILON;
        self.offset = next;
        changed
    }

    pub fn scroll_to_end(&mut self) -> bool {
        self.scroll_to(self.max)
    }

    /// Applies a new page bound, pulling the offset back inside if needed.
    pub fn set_max(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.offset = self.offset.clamp(0.0, self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_sections(viewport: f32) -> (SectionLayout, ScrollTimeline) {
        let mut layout = SectionLayout::uniform(3).unwrap();
        layout.relayout(viewport);
        let timeline = ScrollTimeline::from_layout(&layout);
        (layout, timeline)
    }

    #[test]
    fn layout_stacks_sections_by_viewport_height() {
        let (layout, _) = three_sections(800.0);
        let tops: Vec<f32> = layout.bounds().iter().map(|b| b.top).collect();
        assert_eq!(tops, vec![0.0, 800.0, 1600.0]);
        assert_eq!(layout.page_height(), 3200.0);
        assert_eq!(layout.max_scroll(), 2400.0);
    }

    #[test]
    fn mixed_extents_resolve_against_viewport() {
        let mut layout = SectionLayout::new(
            vec![SectionExtent::Pixels(300.0), SectionExtent::Viewport(0.5)],
            SectionExtent::Pixels(0.0),
        )
        .unwrap();
        layout.relayout(1000.0);
        assert_eq!(layout.bounds()[1], SectionBounds { top: 300.0, height: 500.0 });
        assert_eq!(layout.page_height(), 800.0);
        assert_eq!(layout.max_scroll(), 0.0);
    }

    #[test]
    fn rejects_invalid_layouts() {
        assert_eq!(
            SectionLayout::new(Vec::new(), SectionExtent::Pixels(0.0)),
            Err(TimelineError::Empty)
        );
        assert!(matches!(
            SectionLayout::new(vec![SectionExtent::Viewport(0.0)], SectionExtent::Pixels(0.0)),
            Err(TimelineError::InvalidExtent { index: 0, .. })
        ));
        assert!(matches!(
            SectionLayout::new(vec![SectionExtent::Pixels(10.0)], SectionExtent::Pixels(-1.0)),
            Err(TimelineError::InvalidTrailing(_))
        ));
    }

    #[test]
    fn parses_section_extents() {
        assert_eq!(SectionExtent::parse("100vh").unwrap(), SectionExtent::Viewport(1.0));
        assert_eq!(SectionExtent::parse(" 50VH ").unwrap(), SectionExtent::Viewport(0.5));
        assert_eq!(SectionExtent::parse("640px").unwrap(), SectionExtent::Pixels(640.0));
        assert_eq!(SectionExtent::parse("12").unwrap(), SectionExtent::Pixels(12.0));
        assert!(SectionExtent::parse("tall").is_err());
        assert!(SectionExtent::parse("").is_err());
    }

    #[test]
    fn trigger_progress_is_clamped() {
        let trigger = ScrollTrigger {
            index: 1,
            start: 100.0,
            end: 300.0,
        };
        assert_eq!(trigger.progress(0.0), 0.0);
        assert_eq!(trigger.progress(200.0), 0.5);
        assert_eq!(trigger.progress(1000.0), 1.0);
        assert!(trigger.is_active(100.0));
        assert!(!trigger.is_active(300.0));
    }

    #[test]
    fn progress_combines_index_and_local_progress() {
        let (_, timeline) = three_sections(1000.0);
        assert_eq!(timeline.progress_at(0.0), 0.0);
        assert!((timeline.progress_at(250.0) - 0.25).abs() < 1e-6);
        assert!((timeline.progress_at(1500.0) - 1.5).abs() < 1e-6);
        assert!((timeline.progress_at(2999.0) - 2.999).abs() < 1e-4);
        assert_eq!(timeline.progress_at(3000.0), 3.0);
        assert_eq!(timeline.active_section(1500.0), Some(1));
        assert_eq!(timeline.active_section(3000.0), None);
    }

    #[test]
    fn forward_scroll_is_monotonic_and_bounded() {
        let (layout, timeline) = three_sections(720.0);
        let mut position = ScrollPosition::new(layout.max_scroll());
        let mut last = timeline.progress_at(position.offset());
        while position.scroll_by(37.0) {
            let progress = timeline.progress_at(position.offset());
            assert!(progress >= last, "{progress} < {last}");
            assert!((0.0..=timeline.max_progress()).contains(&progress));
            last = progress;
        }
        assert_eq!(last, 3.0);
    }

    #[test]
    fn gaps_between_sections_hold_progress() {
        let layout = SectionLayout::new(
            vec![SectionExtent::Pixels(100.0), SectionExtent::Pixels(100.0)],
            SectionExtent::Pixels(0.0),
        )
        .unwrap();
        let mut timeline = ScrollTimeline::from_layout(&layout);
        timeline.triggers[1].start = 150.0;
        timeline.triggers[1].end = 250.0;
        assert_eq!(timeline.progress_at(120.0), 1.0);
        assert_eq!(timeline.progress_at(140.0), 1.0);
        assert!((timeline.progress_at(200.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn position_clamps_to_page() {
        let mut position = ScrollPosition::new(500.0);
        assert!(!position.scroll_by(-10.0));
        assert!(position.scroll_by(600.0));
        assert_eq!(position.offset(), 500.0);
        position.set_max(200.0);
        assert_eq!(position.offset(), 200.0);
        assert!(!position.scroll_by(f32::NAN));
        assert!(position.scroll_to(0.0));
        assert!(position.scroll_to_end());
        assert_eq!(position.offset(), 200.0);
    }
}
