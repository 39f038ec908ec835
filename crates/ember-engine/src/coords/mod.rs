//! Coordinate and color types shared by the canvas, renderers and backends.
//!
//! Canvas space:
//! - Device (physical) pixels
//! - Origin top-left
//! - +X right, +Y down

mod color;
mod viewport;

pub use color::Color;
pub use viewport::Viewport;
