use std::time::{Duration, Instant};

/// Snapshot produced by one `FrameClock::tick`.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic tick counter.
    pub frame_index: u64,
}

/// Monotonic clock producing clamped per-tick deltas.
///
/// One clock per canvas, so multi-window applications do not share delta state.
/// The upper clamp keeps simulations stable after debugger pauses or a
/// minimized window; the lower clamp avoids zero deltas in tight loops.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline, e.g. after a context swap stalled the loop.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_respect_clamps() {
        let min = Duration::from_millis(5);
        let max = Duration::from_millis(10);
        let mut clock = FrameClock::with_clamps(min, max);

        let first = clock.tick();
        assert!(first.dt >= min.as_secs_f32());
        assert!(first.dt <= max.as_secs_f32());

        std::thread::sleep(Duration::from_millis(20));
        let second = clock.tick();
        assert_eq!(second.dt, max.as_secs_f32());
        assert_eq!(second.frame_index, first.frame_index + 1);
    }
}
