//! Ember engine crate.
//!
//! Context-bound GPU resource lifecycle: resources keep CPU-side data and
//! derive device handles from it lazily; containers fan context attach and
//! detach out to their members; a canvas binds a surface, a context and a
//! hot-swappable renderer.

pub mod container;
pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
pub mod resource;
pub mod resources;
pub mod time;
pub mod window;
