//! Frame timing.
//!
//! - `FrameClock` produces clamped deltas, one `tick()` per time poll
//! - `DeltaAccumulator` sums deltas until a simulation step consumes them, so
//!   polling and simulation may run at different rates

mod accumulator;
mod frame_clock;

pub use accumulator::DeltaAccumulator;
pub use frame_clock::{FrameClock, FrameTime};
