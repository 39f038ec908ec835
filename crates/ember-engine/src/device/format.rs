/// Context profile requested from the platform factory.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Profile {
    #[default]
    Core,
    Compatibility,
}

/// Requested context format.
///
/// The lifecycle core passes this through untouched; only platform factories
/// and backends read it, and each backend documents which fields it honours.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ContextFormat {
    pub major: u8,
    pub minor: u8,
    pub profile: Profile,

    pub color_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,

    /// Multisample count; `0` or `1` disables multisampling.
    pub samples: u8,

    pub double_buffer: bool,

    /// Request validation layers / debug output from the driver.
    pub debug: bool,
}

impl Default for ContextFormat {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 3,
            profile: Profile::Core,
            color_bits: 8,
            depth_bits: 24,
            stencil_bits: 8,
            samples: 0,
            double_buffer: true,
            debug: false,
        }
    }
}

impl ContextFormat {
    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.major = major;
        self.minor = minor;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_samples(mut self, samples: u8) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_double_buffer(mut self, double_buffer: bool) -> Self {
        self.double_buffer = double_buffer;
        self
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }
}
