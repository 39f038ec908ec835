//! Context and device layer.
//!
//! A [`Context`] is one live binding to a graphics device. Resources record the
//! context they were initialized against and compare identities to detect a
//! context switch. Backends implement [`Device`]:
//! - [`headless`]: no GPU, records operations (tests, tooling)
//! - [`wgpu_backend`]: wgpu device with an optional window surface

mod context;
mod desc;
mod error;
mod format;
mod frame;
mod handle;

pub mod headless;
pub mod wgpu_backend;

pub use context::{Context, ContextFactory, ContextId, Device};
pub use desc::{
    BufferDesc, BufferUsage, DrawCall, IndexFormat, ProgramDesc, RenderTarget, ShaderDesc,
    ShaderStage, TextureDesc, VertexAttribute, VertexFormat, VertexLayout,
};
pub use error::DeviceError;
pub use format::{ContextFormat, Profile};
pub use frame::{Frame, FrameStats};
pub use handle::{DeviceHandle, HandleKind, RawHandle};
