//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window and drives a [`Canvas`](crate::render::Canvas)
//! with context, viewport, time and redraw events.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
