/// Fixed-period accumulator for timers driven by variable frame deltas.
///
/// Fires at most once per [`tick`](Interval::tick): periods missed during a
/// long frame are dropped, never queued.
/// Shortest accepted period. Anything below it, including zero, negative
/// and NaN periods, is raised to it.
pub const MIN_PERIOD: f32 = 1.0 / 1000.0;

#[derive(Debug, Clone)]
pub struct Interval {
    /// Seconds between firings.
    period: f32,
    /// Time accumulated since the last firing.
    accumulator: f32,
}

impl Interval {
    pub fn new(period: f32) -> Self {
        let clamped = period.max(MIN_PERIOD);
        if clamped != period {
            log::warn!("Interval period {} raised to {}", period, MIN_PERIOD);
        }
        Self {
            period: clamped,
            accumulator: 0.0,
        }
    }

    /// Add frame time. Returns `true` when a period has elapsed.
    pub fn tick(&mut self, frame_dt: f32) -> bool {
        self.accumulator += frame_dt.max(0.0);
        if self.accumulator < self.period {
            return false;
        }
        self.accumulator = (self.accumulator - self.period) % self.period;
        true
    }

    /// Forget any partially accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Fraction of the current period already elapsed (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        self.accumulator / self.period
    }

    pub fn period(&self) -> f32 {
        self.period
    }
}
