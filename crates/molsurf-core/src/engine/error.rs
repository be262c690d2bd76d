use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::traits::VolumeFileError;
use crate::core::jvxl::JvxlError;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Failed to read volume data: {source}")]
    VolumeFile {
        #[from]
        source: VolumeFileError,
    },

    #[error("JVXL error: {source}")]
    Jvxl {
        #[from]
        source: JvxlError,
    },

    #[error("Invalid surface configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Cannot {operation} while the generator is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),
}
