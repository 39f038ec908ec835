//! Canvas and renderer orchestration.
//!
//! The windowing layer drives a [`Canvas`] with context changes, viewport
//! updates, time polls and render requests; the canvas forwards them to the
//! active [`Renderer`], which fans context changes out to its resources.

mod canvas;
mod renderer;

pub use canvas::{Canvas, CanvasState};
pub use renderer::{Renderer, RendererState};
