//! Error types for rendering.

use frame_common::FrameError;
use thiserror::Error;

/// Errors that can occur while drawing or encoding.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid font: {0}")]
    InvalidFont(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::Encode(err.to_string())
    }
}

impl From<RenderError> for FrameError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidPalette(message) => FrameError::Style(message),
            RenderError::InvalidGeometry(message) => FrameError::Dataset(message),
            RenderError::UnsupportedFormat(format) => FrameError::UnsupportedFormat(format),
            RenderError::Io(e) => FrameError::Io(e.to_string()),
            other => FrameError::Render(other.to_string()),
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
