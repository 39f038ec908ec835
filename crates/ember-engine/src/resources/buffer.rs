use bytemuck::Pod;
use parking_lot::Mutex;

use crate::device::{BufferDesc, BufferUsage, Context, DeviceHandle};
use crate::resource::{DeviceSlot, GpuResource, ResourceCore, ResourceError};

/// Vertex, index or uniform data.
///
/// New contents of the same size are written into the existing device buffer;
/// a size change rebuilds it.
pub struct Buffer {
    core: ResourceCore,
    usage: BufferUsage,
    data: Mutex<Vec<u8>>,
    slot: DeviceSlot,
}

impl Buffer {
    pub fn new(label: impl Into<String>, usage: BufferUsage, data: Vec<u8>) -> Self {
        Self {
            core: ResourceCore::new(label),
            usage,
            data: Mutex::new(data),
            slot: DeviceSlot::new(),
        }
    }

    pub fn from_slice<T: Pod>(label: impl Into<String>, usage: BufferUsage, data: &[T]) -> Self {
        Self::new(label, usage, bytemuck::cast_slice(data).to_vec())
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn set_data(&self, data: Vec<u8>) {
        *self.data.lock() = data;
        self.core.invalidate();
    }

    pub fn set_typed<T: Pod>(&self, data: &[T]) {
        self.set_data(bytemuck::cast_slice(data).to_vec());
    }

    /// Device buffer for the attached context, uploading the current contents
    /// when they changed since the last call.
    pub fn handle(&self) -> Result<DeviceHandle, ResourceError> {
        self.slot.ensure(&self.core, |ctx, previous| {
            let data = self.data.lock();
            if let Some(previous) = previous {
                match ctx.update_buffer(previous, &data) {
                    Ok(()) => return Ok(previous),
                    Err(err) => log::trace!("`{}`: rebuilding buffer ({err})", self.label()),
                }
            }
            ctx.create_buffer(&BufferDesc {
                label: self.core.label(),
                usage: self.usage,
                contents: &data,
            })
        })
    }

    fn check_data(&self) -> Result<(), ResourceError> {
        if self.is_empty() {
            return Err(ResourceError::Empty {
                label: self.label().to_string(),
            });
        }
        Ok(())
    }

    /// Like [`handle`](Self::handle), but an empty buffer is reported as
    /// [`ResourceError::Empty`] instead of being passed to the device.
    pub fn non_empty_handle(&self) -> Result<DeviceHandle, ResourceError> {
        self.check_data()?;
        self.handle()
    }
}

impl GpuResource for Buffer {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn on_context_deinit(&self, _ctx: &Context) {
        self.slot.release();
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("core", &self.core)
            .field("usage", &self.usage)
            .field("len", &self.len())
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::headless::{DeviceOp, headless_context};
    use crate::device::HandleKind;

    #[test]
    fn handle_requires_context() {
        let buffer = Buffer::from_slice("quad", BufferUsage::Vertex, &[0.0f32; 6]);
        assert!(matches!(buffer.handle(), Err(ResourceError::Detached { .. })));
    }

    #[test]
    fn same_size_update_is_written_in_place() {
        let (ctx, device) = headless_context();
        let buffer = Arc::new(Buffer::from_slice("quad", BufferUsage::Vertex, &[0.0f32; 6]));
        buffer.init_context(&ctx);

        let first = buffer.handle().unwrap();
        buffer.set_typed(&[1.0f32; 6]);
        assert!(!buffer.valid());
        let second = buffer.handle().unwrap();

        assert_eq!(first, second);
        assert_eq!(device.count_ops(|op| matches!(op, DeviceOp::Update { .. })), 1);
        assert_eq!(device.live_count_of(HandleKind::Buffer), 1);
    }

    #[test]
    fn resize_rebuilds_and_releases_old_handle() {
        let (ctx, device) = headless_context();
        let buffer = Arc::new(Buffer::from_slice("quad", BufferUsage::Vertex, &[0.0f32; 6]));
        buffer.init_context(&ctx);

        let first = buffer.handle().unwrap();
        buffer.set_typed(&[0.0f32; 12]);
        let second = buffer.handle().unwrap();

        assert_ne!(first, second);
        assert!(!device.is_live(first.raw()));
        assert_eq!(device.live_count_of(HandleKind::Buffer), 1);

        buffer.deinit_context(&ctx);
        assert_eq!(device.live_count(), 0);
    }

    #[test]
    fn empty_buffer_reported_before_device() {
        let (ctx, device) = headless_context();
        let buffer = Arc::new(Buffer::new("empty", BufferUsage::Uniform, Vec::new()));
        buffer.init_context(&ctx);

        assert!(matches!(
            buffer.non_empty_handle(),
            Err(ResourceError::Empty { .. })
        ));
        assert_eq!(device.live_count(), 0);
    }
}
