//! Error types for loading and transforming tables.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the registry, the loaders and the transformer bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // === Registry Errors ===
    /// A registration was rejected (duplicate or malformed extension token).
    #[error("invalid loader registration: {reason}")]
    Configuration { reason: String },

    /// No registered loader claims the extension token of a resource.
    #[error("unsupported format '{extension}' for {path}")]
    UnsupportedFormat { extension: String, path: PathBuf },

    // === Loader Errors ===
    /// The resource does not exist.
    #[error("resource not found: {path}")]
    ResourceNotFound { path: PathBuf },

    /// Any other I/O failure while reading or writing a resource.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resource exists but its content could not be decoded.
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// A binary payload is corrupt or was written by an incompatible encoder.
    #[error("failed to deserialize table: {message}")]
    Deserialization { message: String },

    /// A table could not be written out.
    #[error("failed to serialize table: {message}")]
    Serialization { message: String },

    // === Transformer Errors ===
    /// `transform` or `into_content` was called before `load_data`.
    #[error("no content loaded from {path}; call load_data first")]
    NotLoaded { path: PathBuf },

    /// The loader produced no rows and the fallback policy forbids that.
    #[error("loader returned no content for {path}")]
    EmptyContent { path: PathBuf },
}

impl BridgeError {
    /// Map an I/O failure on `path`, singling out a missing resource.
    pub(crate) fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::ResourceNotFound { path }
        } else {
            Self::Io { path, source: err }
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::UnsupportedFormat {
            extension: ".xlsx".to_string(),
            path: PathBuf::from("report.xlsx"),
        };
        assert_eq!(
            err.to_string(),
            "unsupported format '.xlsx' for report.xlsx"
        );
    }

    #[test]
    fn test_not_found_is_singled_out() {
        let err = BridgeError::from_io(
            "missing.csv",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, BridgeError::ResourceNotFound { .. }));

        let err = BridgeError::from_io(
            "locked.csv",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, BridgeError::Io { .. }));
    }
}
