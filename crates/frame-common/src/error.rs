//! Error types for frame generation.

use thiserror::Error;

/// Result type alias using FrameError.
pub type FrameResult<T> = Result<T, FrameError>;

/// Primary error type for frame generation.
///
/// Only [`FrameError::is_fatal`] errors abort a batch; everything else is
/// contained to the layer that raised it.
#[derive(Debug, Error)]
pub enum FrameError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid region id: {0}")]
    InvalidRegion(String),

    #[error("Invalid layer configuration for '{layer}': {message}")]
    LayerConfig { layer: String, message: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // === Data Errors ===
    #[error("Requested domain not available in dataset: {0}")]
    IncorrectDomain(String),

    #[error("Failed to read dataset: {0}")]
    Dataset(String),

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Invalid style: {0}")]
    Style(String),

    // === Input/Output Errors ===
    #[error("Download failed for {uri}: {message}")]
    Download { uri: String, message: String },

    #[error("Cannot create output directory {path}: {message}")]
    OutputDirectory { path: String, message: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("I/O error: {0}")]
    Io(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),
}

impl FrameError {
    pub fn layer_config(layer: impl Into<String>, message: impl Into<String>) -> Self {
        FrameError::LayerConfig {
            layer: layer.into(),
            message: message.into(),
        }
    }

    /// Errors that must stop the whole run rather than a single layer.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FrameError::Config(_)
                | FrameError::InvalidRegion(_)
                | FrameError::InvalidDate(_)
                | FrameError::OutputDirectory { .. }
        )
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FrameError {
    fn from(err: serde_json::Error) -> Self {
        FrameError::Config(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for FrameError {
    fn from(err: serde_yaml::Error) -> Self {
        FrameError::Config(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(FrameError::InvalidRegion("nowhere".into()).is_fatal());
        assert!(FrameError::OutputDirectory {
            path: "/x".into(),
            message: "denied".into()
        }
        .is_fatal());
        assert!(!FrameError::IncorrectDomain("time".into()).is_fatal());
        assert!(!FrameError::layer_config("temp", "missing variable").is_fatal());
    }

    #[test]
    fn test_io_conversion() {
        let err: FrameError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, FrameError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
