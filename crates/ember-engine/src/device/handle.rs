use std::fmt;

use super::ContextId;

/// Kind of device object a handle refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HandleKind {
    Buffer,
    Texture,
    Shader,
    Program,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandleKind::Buffer => "buffer",
            HandleKind::Texture => "texture",
            HandleKind::Shader => "shader",
            HandleKind::Program => "program",
        };
        f.write_str(s)
    }
}

/// Backend-local object id, meaningful only to the device that issued it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawHandle(pub u64);

/// Context-scoped identifier of a device object.
///
/// A handle carries the id of the context it was created under; a context
/// refuses handles stamped with any other id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DeviceHandle {
    context: ContextId,
    kind: HandleKind,
    raw: RawHandle,
}

impl DeviceHandle {
    pub(crate) fn new(context: ContextId, kind: HandleKind, raw: RawHandle) -> Self {
        Self { context, kind, raw }
    }

    #[inline]
    pub fn context(&self) -> ContextId {
        self.context
    }

    #[inline]
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.raw
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.kind, self.raw.0, self.context)
    }
}
