use parking_lot::Mutex;

use crate::device::{Context, DeviceHandle, ShaderDesc, ShaderStage};
use crate::resource::{DeviceSlot, GpuResource, ResourceCore, ResourceError};

/// One WGSL shader stage. The entry point is fixed per stage
/// (see [`ShaderStage::entry_point`]).
pub struct Shader {
    core: ResourceCore,
    stage: ShaderStage,
    source: Mutex<String>,
    slot: DeviceSlot,
}

impl Shader {
    pub fn new(label: impl Into<String>, stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            core: ResourceCore::new(label),
            stage,
            source: Mutex::new(source.into()),
            slot: DeviceSlot::new(),
        }
    }

    pub fn vertex(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(label, ShaderStage::Vertex, source)
    }

    pub fn fragment(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(label, ShaderStage::Fragment, source)
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn code(&self) -> String {
        self.source.lock().clone()
    }

    pub fn set_code(&self, source: impl Into<String>) {
        *self.source.lock() = source.into();
        self.core.invalidate();
    }

    pub fn handle(&self) -> Result<DeviceHandle, ResourceError> {
        self.slot.ensure(&self.core, |ctx, _| {
            let source = self.source.lock();
            ctx.create_shader(&ShaderDesc {
                label: self.core.label(),
                stage: self.stage,
                source: &source,
            })
        })
    }
}

impl GpuResource for Shader {
    fn core(&self) -> &ResourceCore {
        &self.core
    }

    fn on_context_deinit(&self, _ctx: &Context) {
        self.slot.release();
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("core", &self.core)
            .field("stage", &self.stage)
            .field("slot", &self.slot)
            .finish()
    }
}
