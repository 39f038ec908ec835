use super::{ContextId, DeviceHandle, HandleKind};

/// Errors reported by a device or by the context wrapping it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The device refused a descriptor (bad shader source, empty data, ...).
    #[error("device rejected {kind} `{label}`: {reason}")]
    Rejected {
        kind: HandleKind,
        label: String,
        reason: String,
    },

    #[error("unknown device handle {0}")]
    UnknownHandle(DeviceHandle),

    /// A handle created under one context was passed to another.
    #[error("handle {handle} does not belong to context {context}")]
    ForeignHandle {
        handle: DeviceHandle,
        context: ContextId,
    },

    #[error("handle {handle} is a {actual}, expected a {expected}")]
    WrongKind {
        handle: DeviceHandle,
        expected: HandleKind,
        actual: HandleKind,
    },

    #[error("no frame in progress")]
    NoActiveFrame,

    #[error("a frame is already in progress")]
    FrameInProgress,

    /// The device reported a validation error while encoding or submitting
    /// the frame. The frame's draws are lost; later frames are unaffected.
    #[error("frame rejected by the device: {0}")]
    FrameRejected(String),

    /// Transient surface failure; the frame should be skipped.
    #[error("surface unavailable: {0}")]
    Surface(String),

    /// The device is gone; the context must be replaced.
    #[error("device lost")]
    Lost,
}
