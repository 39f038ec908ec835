/// Sum of frame deltas not yet consumed by a simulation step.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DeltaAccumulator {
    pending: f32,
    samples: u32,
}

impl DeltaAccumulator {
    pub const fn new() -> Self {
        Self {
            pending: 0.0,
            samples: 0,
        }
    }

    /// Adds `dt` seconds. Non-finite or negative deltas are ignored.
    pub fn add(&mut self, dt: f32) {
        if dt.is_finite() && dt >= 0.0 {
            self.pending += dt;
            self.samples = self.samples.saturating_add(1);
        }
    }

    /// Seconds accumulated since the last `take`.
    pub fn pending(&self) -> f32 {
        self.pending
    }

    /// Number of deltas folded in since the last `take`.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Returns the accumulated delta and resets to zero.
    pub fn take(&mut self) -> f32 {
        let dt = self.pending;
        *self = Self::new();
        dt
    }
}
