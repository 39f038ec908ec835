//! wgpu backend.
//!
//! - creates the wgpu Instance/Adapter/Device/Queue
//! - creates and configures the window Surface (swapchain), if any
//! - keeps device objects in a handle table addressed by `RawHandle`
//! - records draws during a frame and replays them in one render pass

mod device;
mod init;
mod surface;

pub use device::WgpuDevice;
pub use init::{WgpuFactory, WgpuInit};
pub use surface::SurfaceErrorAction;
