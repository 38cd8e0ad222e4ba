//! Error types for ChitraMosaic

use thiserror::Error;

/// ChitraMosaic error type
#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Stage read failed: {0}")]
    Stage(String),

    #[error("Camera capture failed: {0}")]
    Camera(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for MosaicError {
    fn from(e: toml::de::Error) -> Self {
        MosaicError::Config(e.to_string())
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(e: image::ImageError) -> Self {
        MosaicError::Export(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MosaicError>;
