//! Error types for the WGAN trainer

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, WganError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum WganError {
    /// Invalid or incompatible configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Requested accelerator is not usable
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Dataset could not be read
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Tensor shape does not match the configured geometry
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A loss became NaN or infinite
    #[error(
        "Non-finite loss at epoch {epoch}, batch {batch} (D loss: {critic_loss}, G loss: {generator_loss:?})"
    )]
    NonFiniteLoss {
        epoch: usize,
        batch: usize,
        critic_loss: f64,
        generator_loss: Option<f64>,
    },

    /// Config file could not be parsed or written
    #[error("Config format error: {0}")]
    ConfigFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// libtorch error
    #[error("Torch error: {0}")]
    Tch(#[from] tch::TchError),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<serde_json::Error> for WganError {
    fn from(err: serde_json::Error) -> Self {
        WganError::ConfigFormat(err.to_string())
    }
}

impl From<toml::de::Error> for WganError {
    fn from(err: toml::de::Error) -> Self {
        WganError::ConfigFormat(err.to_string())
    }
}

impl From<toml::ser::Error> for WganError {
    fn from(err: toml::ser::Error) -> Self {
        WganError::ConfigFormat(err.to_string())
    }
}
