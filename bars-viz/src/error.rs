//! Error types for the bars renderer
//!
//! Only construction and readback can fail. Setters coerce and per-tick work
//! is infallible once the GPU objects exist.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No GPU adapter available")]
    NoAdapter,

    #[error("Could not acquire GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Shader compilation failed: {0}")]
    Shader(String),

    #[error("Canvas readback failed: {0}")]
    Readback(String),

    #[error("Canvas has no area to read back")]
    NoCanvas,

    #[error("Invalid user properties: {0}")]
    Properties(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
