//! Logging setup.
//!
//! The engine reports protocol violations and build failures through the `log`
//! facade; this module only wires up `env_logger` for binaries and tests.

mod init;

pub use init::{init_logging, LoggingConfig};
