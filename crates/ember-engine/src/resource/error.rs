use crate::device::DeviceError;

/// Why a resource could not provide a device handle.
///
/// Draw code treats any of these as "skip this draw".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// Accessed while not attached to a context.
    #[error("`{label}` is not attached to a context")]
    Detached { label: String },

    /// No CPU-side data has been provided yet.
    #[error("`{label}` has no data")]
    Empty { label: String },

    #[error("failed to build `{label}`")]
    Build {
        label: String,
        #[source]
        source: DeviceError,
    },

    #[error("`{label}` depends on `{dependency}`, which is unavailable")]
    Dependency {
        label: String,
        dependency: String,
        #[source]
        source: Box<ResourceError>,
    },
}

impl ResourceError {
    pub(crate) fn dependency(label: &str, source: ResourceError) -> Self {
        let dependency = source.label().to_string();
        Self::Dependency {
            label: label.to_string(),
            dependency,
            source: Box::new(source),
        }
    }

    /// Label of the resource the error is about.
    pub fn label(&self) -> &str {
        match self {
            Self::Detached { label }
            | Self::Empty { label }
            | Self::Build { label, .. }
            | Self::Dependency { label, .. } => label,
        }
    }
}
