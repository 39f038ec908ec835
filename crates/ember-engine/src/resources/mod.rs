//! Concrete resources.
//!
//! Leaf resources (`Buffer`, `Texture`, `Shader`) own one device handle each.
//! `Program` and `Geometry` are containers over leaves they create.

mod buffer;
mod geometry;
mod program;
mod shader;
mod texture;

pub use buffer::Buffer;
pub use geometry::Geometry;
pub use program::Program;
pub use shader::Shader;
pub use texture::{Texture, TextureSource};

pub use crate::device::{
    BufferUsage, IndexFormat, ShaderStage, VertexAttribute, VertexFormat, VertexLayout,
};
