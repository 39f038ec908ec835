//! Resource base unit.
//!
//! A resource holds CPU-side authoritative data plus a device handle derived
//! from it. The handle is rebuilt lazily on first use after attach or after the
//! CPU data changes; it never outlives the context it was built under.
//!
//! Invariants:
//! - `initialized()` implies `context().is_some()`
//! - `valid()` implies `context().is_some()`
//! - after `deinit_context`, `context()` is `None` and built handles are released

mod error;
mod slot;
mod state;

pub use error::ResourceError;
pub use slot::DeviceSlot;
pub use state::{GpuResource, ResourceCore, ResourceId};
