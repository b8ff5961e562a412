use std::time::Duration;

/// How tightly the animated value follows the scroll-derived target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scrub {
    /// Value tracks the scroll position directly.
    #[default]
    Linked,
    /// Value eases toward the target, taking roughly this long to catch up.
    Smoothed(Duration),
}

/// Running value driven by a [`Scrub`] policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubState {
    scrub: Scrub,
    value: f32,
}

impl ScrubState {
    pub fn new(scrub: Scrub, initial: f32) -> Self {
        Self {
            scrub,
            value: initial,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn scrub(&self) -> Scrub {
        self.scrub
    }

    /// Steps the value toward `target` by `dt` and returns the new value.
    ///
    /// Smoothed scrubbing approaches the target exponentially with a time
    /// constant of one third of the catch-up duration, snapping once the gap
    /// is below a thousandth so the value settles exactly.
    pub fn advance(&mut self, target: f32, dt: Duration) -> f32 {
        match self.scrub {
            Scrub::Linked => self.value = target,
            Scrub::Smoothed(lag) => {
                let tau = lag.as_secs_f32() / 3.0;
                if tau <= f32::EPSILON {
                    self.value = target;
                } else {
                    let alpha = 1.0 - (-dt.as_secs_f32() / tau).exp();
                    self.value += (target - self.value) * alpha.clamp(0.0, 1.0);
                    if (target - self.value).abs() < 1e-3 {
                        self.value = target;
                    }
                }
            }
        }
        self.value
    }

    pub fn is_settled(&self, target: f32) -> bool {
        (target - self.value).abs() <= f32::EPSILON
    }
}
