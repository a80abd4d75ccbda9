/// Accumulator-based fixed timestep. Render/update loops feed it wall-clock
/// deltas; the simulation only ever advances in whole `dt` steps so server
/// and client tick at the same cadence.
#[derive(Debug)]
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    /// Caps how much backlog a hitch can enqueue (~8 ticks at 30 Hz).
    const MAX_ACCUMULATED: f32 = 0.25;

    pub fn new(tick_rate: u32) -> Self {
        Self {
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator = (self.accumulator + delta).min(Self::MAX_ACCUMULATED);
    }

    /// Takes one tick's worth of accumulated time, if available.
    pub fn consume(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    /// Fraction of the next tick already elapsed, for render interpolation
    /// between `previous_position` and `position`.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }
}
